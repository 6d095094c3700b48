//! File handles for upload sessions.
//!
//! This module provides:
//! - `SourceFile`: the immutable description of a file selected for upload
//! - Extension-based acceptance filtering
//! - Size formatting for display
//!
//! A `SourceFile` is captured once when the file is selected and never
//! mutated afterwards; retries re-read the file from the same path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An immutable handle to a file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Absolute or caller-relative path to the file content
    pub path: PathBuf,
    /// File name (final path component)
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// MIME type guessed from the extension
    pub mime_type: Option<String>,
}

impl SourceFile {
    /// Create a source file handle from a path.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to an existing regular file
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be read or does not point to a
    /// regular file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;

        if !metadata.is_file() {
            return Err(Error::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(ToString::to_string)
            .ok_or_else(|| Error::NotAFile {
                path: path.to_path_buf(),
            })?;

        let mime_type = mime_guess::from_path(path).first().map(|m| m.to_string());

        Ok(Self {
            path: path.to_path_buf(),
            name,
            size: metadata.len(),
            mime_type,
        })
    }

    /// Get the file name.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.name
    }

    /// Check the file extension against an acceptance list.
    ///
    /// An empty list accepts every file. Entries are compared
    /// case-insensitively and may carry a leading dot (`.pdf` and `pdf`
    /// are equivalent).
    #[must_use]
    pub fn matches_accept(&self, accept: &[String]) -> bool {
        if accept.is_empty() {
            return true;
        }

        let Some(ext) = self.path.extension().and_then(|e| e.to_str()) else {
            return false;
        };

        accept
            .iter()
            .map(|a| a.trim_start_matches('.'))
            .any(|a| a.eq_ignore_ascii_case(ext))
    }
}

/// Format a file size for display.
#[must_use]
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write_temp_file(dir: &TempDir, name: &str, contents: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        tokio::fs::write(&path, contents)
            .await
            .expect("write temp file");
        path
    }

    #[tokio::test]
    async fn test_source_file_from_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_temp_file(&dir, "report.pdf", b"hello world").await;

        let source = SourceFile::from_path(&path).await.expect("source file");

        assert_eq!(source.file_name(), "report.pdf");
        assert_eq!(source.size, 11);
        assert_eq!(source.mime_type.as_deref(), Some("application/pdf"));
    }

    #[tokio::test]
    async fn test_source_file_rejects_directory() {
        let dir = TempDir::new().expect("temp dir");

        let result = SourceFile::from_path(dir.path()).await;

        assert!(matches!(result, Err(Error::NotAFile { .. })));
    }

    #[tokio::test]
    async fn test_source_file_missing_path() {
        let dir = TempDir::new().expect("temp dir");

        let result = SourceFile::from_path(dir.path().join("absent.txt")).await;

        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[tokio::test]
    async fn test_matches_accept() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_temp_file(&dir, "scan.PDF", b"x").await;
        let source = SourceFile::from_path(&path).await.expect("source file");

        assert!(source.matches_accept(&[]));
        assert!(source.matches_accept(&["pdf".to_string()]));
        assert!(source.matches_accept(&[".pdf".to_string()]));
        assert!(source.matches_accept(&["png".to_string(), "pdf".to_string()]));
        assert!(!source.matches_accept(&["png".to_string()]));
    }

    #[tokio::test]
    async fn test_matches_accept_no_extension() {
        let dir = TempDir::new().expect("temp dir");
        let path = write_temp_file(&dir, "Makefile", b"x").await;
        let source = SourceFile::from_path(&path).await.expect("source file");

        assert!(source.matches_accept(&[]));
        assert!(!source.matches_accept(&["pdf".to_string()]));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
