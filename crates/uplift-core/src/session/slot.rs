//! Per-file slot state.
//!
//! A slot is allocated for every file added to a session and keyed by a
//! stable index. Indices are never reused: removed slots stay in the table
//! as tombstones so later slots keep their positions.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::file::SourceFile;

/// Stable identifier of a slot within its session.
pub type SlotIndex = usize;

/// Identity of one issued upload attempt.
///
/// Allocated monotonically per session. Every progress or completion event
/// carries the attempt it was issued under; events whose attempt no longer
/// matches the slot are stale and discarded.
pub(crate) type AttemptId = u64;

/// Lifecycle status of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    /// File is selected but its upload has not started
    Pending,
    /// Upload request is in flight
    Uploading,
    /// Server acknowledged the upload
    Uploaded,
    /// Upload was cancelled (by the user or by a transport failure)
    Cancelled,
    /// Slot was deleted; kept internally as a tombstone
    Removed,
}

impl SlotStatus {
    /// Short lowercase label for display.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Uploading => "uploading",
            Self::Uploaded => "uploaded",
            Self::Cancelled => "cancelled",
            Self::Removed => "removed",
        }
    }

    /// Whether no further upload activity can happen without a caller
    /// operation (retry or remove).
    #[must_use]
    pub const fn is_settled(self) -> bool {
        matches!(self, Self::Uploaded | Self::Cancelled | Self::Removed)
    }
}

/// Cancellation capability for one in-flight upload.
#[derive(Debug)]
pub(crate) struct UploadAttempt {
    /// Identity presented by callbacks issued under this attempt
    pub id: AttemptId,
    /// Signals the transport to abort the request
    pub cancel: CancellationToken,
}

/// Internal per-file state.
#[derive(Debug)]
pub(crate) struct FileSlot {
    /// The selected file; never mutated after allocation
    pub source: SourceFile,
    /// Current lifecycle status
    pub status: SlotStatus,
    /// Server-assigned identifier, present only when `Uploaded`
    pub uploaded_name: Option<String>,
    /// 0-100; capped below 100 while the upload is in flight
    pub progress_percent: u8,
    /// Present only while `Uploading`
    pub attempt: Option<UploadAttempt>,
}

impl FileSlot {
    pub fn new(source: SourceFile) -> Self {
        Self {
            source,
            status: SlotStatus::Pending,
            uploaded_name: None,
            progress_percent: 0,
            attempt: None,
        }
    }

    /// Whether an event issued under `attempt` still belongs to this slot.
    pub fn attempt_matches(&self, attempt: AttemptId) -> bool {
        self.attempt.as_ref().is_some_and(|a| a.id == attempt)
    }

    pub fn snapshot(&self, index: SlotIndex) -> SlotSnapshot {
        SlotSnapshot {
            index,
            file_name: self.source.name.clone(),
            size: self.source.size,
            status: self.status,
            progress_percent: self.progress_percent,
            uploaded_name: self.uploaded_name.clone(),
        }
    }
}

/// Externally visible view of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    /// Stable slot index
    pub index: SlotIndex,
    /// Name of the selected file
    pub file_name: String,
    /// Size of the selected file in bytes
    pub size: u64,
    /// Current lifecycle status
    pub status: SlotStatus,
    /// Upload progress, 0-100
    pub progress_percent: u8,
    /// Server-assigned identifier once uploaded
    pub uploaded_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_source() -> SourceFile {
        SourceFile {
            path: "/tmp/sample.txt".into(),
            name: "sample.txt".to_string(),
            size: 42,
            mime_type: Some("text/plain".to_string()),
        }
    }

    #[test]
    fn test_new_slot_is_pending() {
        let slot = FileSlot::new(sample_source());

        assert_eq!(slot.status, SlotStatus::Pending);
        assert_eq!(slot.progress_percent, 0);
        assert!(slot.uploaded_name.is_none());
        assert!(slot.attempt.is_none());
    }

    #[test]
    fn test_attempt_matching() {
        let mut slot = FileSlot::new(sample_source());
        assert!(!slot.attempt_matches(1));

        slot.attempt = Some(UploadAttempt {
            id: 7,
            cancel: CancellationToken::new(),
        });

        assert!(slot.attempt_matches(7));
        assert!(!slot.attempt_matches(8));
    }

    #[test]
    fn test_snapshot_view() {
        let slot = FileSlot::new(sample_source());
        let snap = slot.snapshot(3);

        assert_eq!(snap.index, 3);
        assert_eq!(snap.file_name, "sample.txt");
        assert_eq!(snap.size, 42);
        assert_eq!(snap.status, SlotStatus::Pending);
    }

    #[test]
    fn test_settled_statuses() {
        assert!(!SlotStatus::Pending.is_settled());
        assert!(!SlotStatus::Uploading.is_settled());
        assert!(SlotStatus::Uploaded.is_settled());
        assert!(SlotStatus::Cancelled.is_settled());
        assert!(SlotStatus::Removed.is_settled());
    }
}
