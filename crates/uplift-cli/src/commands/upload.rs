//! Upload command implementation
//!
//! Drives an upload session over the files named on the command line and
//! reports each slot transition until every slot settles. Ctrl-C cancels
//! everything still in flight; cancelled slots show up in the summary and
//! turn the exit status non-zero.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tokio::sync::watch;

use uplift_core::file::{format_size, SourceFile};
use uplift_core::session::{SessionConfig, SlotIndex, SlotSnapshot, SlotStatus, UploadSession};
use uplift_core::transport::HttpTransport;

use super::UploadArgs;

/// Run the upload command
pub async fn run(args: UploadArgs) -> Result<()> {
    let config = super::load_config();

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| config.transport.endpoint.clone());
    let accept = if args.accept.is_empty() {
        config.upload.accept.clone()
    } else {
        args.accept.clone()
    };

    let sources = collect_sources(&args, &accept).await?;
    if sources.is_empty() {
        bail!("No files to upload");
    }

    if !args.quiet && !args.json {
        let total: u64 = sources.iter().map(|s| s.size).sum();
        println!();
        println!("  Uplift v{}", uplift_core::VERSION);
        println!(
            "  Uploading {} file(s), {} total, to {}",
            sources.len(),
            format_size(total),
            endpoint
        );
        println!();
    }

    let transport = HttpTransport::with_timeout(&endpoint, config.transport.timeout)
        .context("Failed to create upload transport")?;
    let session = UploadSession::new(
        Arc::new(transport),
        SessionConfig {
            auto_start: config.upload.auto_start,
        },
    );

    let mut slots_rx = session.subscribe();

    tokio::spawn({
        let session = session.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                session.cancel_all().await;
            }
        }
    });

    let indices = session.add_files(sources).await;
    if !config.upload.auto_start {
        for &index in &indices {
            session.start_upload(index).await;
        }
    }
    let final_slots = watch_until_settled(&mut slots_rx, &indices, args.quiet || args.json).await;

    print_summary(&final_slots, &args)?;

    let cancelled = final_slots
        .iter()
        .filter(|s| s.status == SlotStatus::Cancelled)
        .count();
    if cancelled > 0 {
        bail!("{cancelled} upload(s) did not complete");
    }

    Ok(())
}

/// Build source files from the given paths, dropping any that fail the
/// accept filter
async fn collect_sources(args: &UploadArgs, accept: &[String]) -> Result<Vec<SourceFile>> {
    let mut sources = Vec::with_capacity(args.paths.len());

    for path in &args.paths {
        let source = SourceFile::from_path(path)
            .await
            .with_context(|| format!("Cannot upload '{}'", path.display()))?;

        if source.matches_accept(accept) {
            sources.push(source);
        } else if !args.quiet && !args.json {
            println!("  Skipping '{}' (extension not accepted)", source.file_name());
        }
    }

    Ok(sources)
}

/// Follow snapshot updates until every tracked slot settles, printing
/// status transitions along the way
async fn watch_until_settled(
    rx: &mut watch::Receiver<Vec<SlotSnapshot>>,
    indices: &[SlotIndex],
    quiet: bool,
) -> Vec<SlotSnapshot> {
    let mut seen: HashMap<SlotIndex, SlotStatus> = HashMap::new();

    loop {
        let timeout = tokio::time::timeout(Duration::from_secs(1), rx.changed()).await;

        let slots = rx.borrow().clone();

        if !quiet {
            for slot in &slots {
                if !indices.contains(&slot.index) {
                    continue;
                }
                if seen.get(&slot.index) == Some(&slot.status) {
                    continue;
                }
                seen.insert(slot.index, slot.status);
                print_transition(slot);
            }
        }

        let settled = indices.iter().all(|index| {
            slots
                .iter()
                .find(|s| s.index == *index)
                .is_none_or(|s| s.status.is_settled())
        });
        if settled {
            break slots;
        }

        match timeout {
            // Timer tick; re-check and keep waiting
            Err(_) => {}
            // Session dropped, nothing more will arrive
            Ok(Err(_)) => break slots,
            Ok(Ok(())) => {}
        }
    }
}

fn print_transition(slot: &SlotSnapshot) {
    match slot.status {
        SlotStatus::Uploading => {
            println!("  > {} ({})", slot.file_name, format_size(slot.size));
        }
        SlotStatus::Uploaded => {
            println!(
                "  + {} -> {}",
                slot.file_name,
                slot.uploaded_name.as_deref().unwrap_or("?")
            );
        }
        SlotStatus::Cancelled => {
            println!("  - {} (cancelled)", slot.file_name);
        }
        SlotStatus::Pending | SlotStatus::Removed => {}
    }
}

/// Print the final outcome, either human readable or as JSON
fn print_summary(slots: &[SlotSnapshot], args: &UploadArgs) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(slots)?);
        return Ok(());
    }

    if args.quiet {
        return Ok(());
    }

    let uploaded = slots
        .iter()
        .filter(|s| s.status == SlotStatus::Uploaded)
        .count();

    println!();
    println!("  {uploaded}/{} uploaded", slots.len());
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn args_for(paths: Vec<PathBuf>) -> UploadArgs {
        UploadArgs {
            paths,
            endpoint: None,
            accept: Vec::new(),
            json: false,
            quiet: true,
        }
    }

    #[tokio::test]
    async fn test_collect_sources_applies_accept_filter() {
        let dir = TempDir::new().expect("temp dir");
        let pdf = dir.path().join("report.pdf");
        let png = dir.path().join("photo.png");
        tokio::fs::write(&pdf, b"pdf").await.expect("write");
        tokio::fs::write(&png, b"png").await.expect("write");

        let args = args_for(vec![pdf, png]);
        let sources = collect_sources(&args, &["pdf".to_string()])
            .await
            .expect("collect");

        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].file_name(), "report.pdf");
    }

    #[tokio::test]
    async fn test_collect_sources_rejects_missing_path() {
        let dir = TempDir::new().expect("temp dir");
        let args = args_for(vec![dir.path().join("absent.txt")]);

        let result = collect_sources(&args, &[]).await;

        assert!(result.is_err());
    }
}
