//! Upload transport contract.
//!
//! A transport moves the bytes of one file to persistent storage and
//! resolves with the server-assigned identifier. The session manager owns
//! all lifecycle state; a transport only sends bytes, reports progress,
//! and honors its cancel handle.

use std::future::Future;
use std::pin::Pin;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::file::SourceFile;
use crate::session::slot::{AttemptId, SlotIndex};

#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

/// Future returned by [`Transport::upload`].
pub type UploadFuture = Pin<Box<dyn Future<Output = Result<String>> + Send>>;

/// Contract for sending one file to a remote store.
///
/// Implementations must be cheap to share (`Arc<dyn Transport>`); one
/// `upload` call is issued per attempt and runs on its own task.
pub trait Transport: Send + Sync {
    /// Send one file.
    ///
    /// The returned future resolves with the server-assigned identifier on
    /// success. `progress` may be fed zero or more times before that. When
    /// `cancel` fires the implementation should abort the request and
    /// resolve with [`Error::Cancelled`]; a late success is tolerated and
    /// discarded by the caller.
    fn upload(
        &self,
        file: SourceFile,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> UploadFuture;

    /// Mint a cancel handle for one upload request.
    fn cancel_token(&self) -> CancellationToken {
        CancellationToken::new()
    }
}

/// Typed event delivered by an in-flight upload to its session.
///
/// Every event carries the slot and attempt identity it was issued under;
/// the session discards events whose attempt no longer matches the slot.
#[derive(Debug)]
pub(crate) enum TransportEvent {
    /// Bytes-on-the-wire progress report
    Progress {
        index: SlotIndex,
        attempt: AttemptId,
        loaded: u64,
        total: u64,
    },
    /// Server acknowledged the upload
    Completed {
        index: SlotIndex,
        attempt: AttemptId,
        uploaded_name: String,
    },
    /// The request failed or was aborted
    Failed {
        index: SlotIndex,
        attempt: AttemptId,
        error: Error,
    },
}

/// Progress reporting handle handed to a transport for one upload.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    index: SlotIndex,
    attempt: AttemptId,
    tx: mpsc::UnboundedSender<TransportEvent>,
}

impl ProgressSender {
    pub(crate) fn new(
        index: SlotIndex,
        attempt: AttemptId,
        tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> Self {
        Self { index, attempt, tx }
    }

    /// Report that `loaded` of `total` bytes have been sent.
    pub fn send(&self, loaded: u64, total: u64) {
        let _ = self.tx.send(TransportEvent::Progress {
            index: self.index,
            attempt: self.attempt,
            loaded,
            total,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_progress_sender_carries_identity() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sender = ProgressSender::new(2, 9, tx);

        sender.send(10, 100);

        match rx.recv().await.expect("event") {
            TransportEvent::Progress {
                index,
                attempt,
                loaded,
                total,
            } => {
                assert_eq!(index, 2);
                assert_eq!(attempt, 9);
                assert_eq!(loaded, 10);
                assert_eq!(total, 100);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
