//! Upload session management.
//!
//! An [`UploadSession`] tracks a set of selected files through a per-file
//! lifecycle (pending, uploading, uploaded or cancelled, removed), runs
//! uploads concurrently and independently of each other, supports
//! mid-flight cancellation and retry, and reports the committed slot set
//! to the caller after every transition.
//!
//! ## Atomicity
//!
//! All slot state lives behind one async mutex. Every operation locks,
//! applies the full transition, captures the snapshot, and notifies before
//! releasing, so observers never see a half-applied transition.
//!
//! ## Stale callbacks
//!
//! Uploads run on their own tasks and report back through a typed event
//! channel. Each event carries the attempt identity it was issued under;
//! after a cancel or retry the slot's attempt changes, and events from the
//! superseded request are discarded instead of re-animating the slot.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use uplift_core::file::SourceFile;
//! use uplift_core::session::{SessionConfig, UploadSession};
//! use uplift_core::transport::HttpTransport;
//!
//! # async fn example() -> uplift_core::Result<()> {
//! let transport = HttpTransport::new("http://localhost:3030/api/file")?;
//! let session = UploadSession::new(Arc::new(transport), SessionConfig::default());
//!
//! let mut slots = session.subscribe();
//! let file = SourceFile::from_path("notes.pdf").await?;
//! session.add_files(vec![file]).await;
//!
//! while slots.changed().await.is_ok() {
//!     if slots.borrow().iter().all(|s| s.status.is_settled()) {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub(crate) mod slot;

use std::fmt;
use std::sync::{Arc, Weak};

use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::file::SourceFile;
use crate::transport::{ProgressSender, Transport, TransportEvent};
use crate::PROGRESS_CEILING;

pub use slot::{SlotIndex, SlotSnapshot, SlotStatus};

use slot::{AttemptId, FileSlot, UploadAttempt};

/// Callback invoked with the committed slot set after every transition.
pub type ChangeCallback = Box<dyn FnMut(&[SlotSnapshot]) + Send>;

/// Tunables for an upload session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Issue each file's upload immediately when it is added
    pub auto_start: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { auto_start: true }
    }
}

/// The slot table and everything needed to notify observers about it.
struct SessionState {
    slots: Vec<FileSlot>,
    next_attempt_id: AttemptId,
    snapshot_tx: watch::Sender<Vec<SlotSnapshot>>,
    on_change: Option<ChangeCallback>,
}

impl SessionState {
    /// Allocate a slot for a newly selected file.
    fn add_file(&mut self, source: SourceFile) -> SlotIndex {
        let index = self.slots.len();
        info!("Slot {index} selected '{}'", source.name);
        self.slots.push(FileSlot::new(source));
        index
    }

    /// Move a pending or cancelled slot to uploading under a fresh attempt.
    ///
    /// Returns the attempt identity and the file to send, or `None` when
    /// the slot does not exist or is in the wrong state.
    fn begin_attempt(
        &mut self,
        index: SlotIndex,
        token: CancellationToken,
    ) -> Option<(AttemptId, SourceFile)> {
        let Some(slot) = self.slots.get_mut(index) else {
            debug!("Slot {index} unknown, upload not issued");
            return None;
        };
        if !matches!(slot.status, SlotStatus::Pending | SlotStatus::Cancelled) {
            debug!(
                "Slot {index} upload not issued (status: {})",
                slot.status.as_str()
            );
            return None;
        }

        self.next_attempt_id += 1;
        let id = self.next_attempt_id;

        slot.status = SlotStatus::Uploading;
        slot.progress_percent = 0;
        slot.uploaded_name = None;
        slot.attempt = Some(UploadAttempt { id, cancel: token });

        info!("Slot {index} uploading '{}' (attempt {id})", slot.source.name);
        Some((id, slot.source.clone()))
    }

    /// Apply a progress report from an in-flight upload.
    ///
    /// Progress is scaled to at most [`PROGRESS_CEILING`] percent; the
    /// remaining headroom is reserved for the server acknowledgment, so no
    /// slot reports 100 before the server confirms receipt. Monotonicity is
    /// not enforced; the last report wins.
    fn report_progress(
        &mut self,
        index: SlotIndex,
        attempt: AttemptId,
        loaded: u64,
        total: u64,
    ) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.status != SlotStatus::Uploading || !slot.attempt_matches(attempt) {
            debug!("Slot {index} dropped stale progress report (attempt {attempt})");
            return false;
        }
        if total == 0 {
            debug!("Slot {index} dropped progress report with zero total");
            return false;
        }

        let scaled = loaded.saturating_mul(u64::from(PROGRESS_CEILING)) / total;
        slot.progress_percent =
            u8::try_from(scaled.min(u64::from(PROGRESS_CEILING))).unwrap_or(PROGRESS_CEILING);
        true
    }

    /// Apply a server acknowledgment from an in-flight upload.
    fn complete_upload(&mut self, index: SlotIndex, attempt: AttemptId, name: String) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.status != SlotStatus::Uploading || !slot.attempt_matches(attempt) {
            debug!("Slot {index} dropped stale completion '{name}' (attempt {attempt})");
            return false;
        }

        info!("Slot {index} uploaded as '{name}'");
        slot.status = SlotStatus::Uploaded;
        slot.uploaded_name = Some(name);
        slot.progress_percent = 100;
        slot.attempt = None;
        true
    }

    /// Apply a transport failure: the slot becomes cancelled, identically
    /// to user cancellation, so retry stays available.
    fn fail_upload(&mut self, index: SlotIndex, attempt: AttemptId, error: &Error) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            return false;
        };
        if slot.status != SlotStatus::Uploading || !slot.attempt_matches(attempt) {
            debug!("Slot {index} dropped stale failure (attempt {attempt}): {error}");
            return false;
        }

        warn!("Slot {index} upload failed, marking cancelled: {error}");
        slot.status = SlotStatus::Cancelled;
        slot.progress_percent = 0;
        slot.uploaded_name = None;
        slot.attempt = None;
        true
    }

    /// Cancel an in-flight upload. No-op unless the slot is uploading.
    fn cancel_upload(&mut self, index: SlotIndex) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            debug!("Slot {index} unknown, cancel ignored");
            return false;
        };
        if slot.status != SlotStatus::Uploading {
            debug!(
                "Slot {index} cancel ignored (status: {})",
                slot.status.as_str()
            );
            return false;
        }

        if let Some(attempt) = slot.attempt.take() {
            attempt.cancel.cancel();
        }
        slot.status = SlotStatus::Cancelled;
        slot.progress_percent = 0;
        slot.uploaded_name = None;

        info!("Slot {index} cancelled");
        true
    }

    /// Mark a slot removed. An in-flight upload is cancelled first so no
    /// request is left running with no way to abort it.
    fn remove_slot(&mut self, index: SlotIndex) -> bool {
        let Some(slot) = self.slots.get_mut(index) else {
            debug!("Slot {index} unknown, remove ignored");
            return false;
        };

        match slot.status {
            SlotStatus::Removed => {
                debug!("Slot {index} already removed");
                false
            }
            SlotStatus::Uploading => {
                if let Some(attempt) = slot.attempt.take() {
                    attempt.cancel.cancel();
                }
                slot.progress_percent = 0;
                slot.uploaded_name = None;
                slot.status = SlotStatus::Removed;
                info!("Slot {index} cancelled and removed");
                true
            }
            SlotStatus::Pending | SlotStatus::Uploaded | SlotStatus::Cancelled => {
                slot.status = SlotStatus::Removed;
                info!("Slot {index} removed");
                true
            }
        }
    }

    /// The committed slot set: every slot not removed, in index order.
    fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.status != SlotStatus::Removed)
            .map(|(index, slot)| slot.snapshot(index))
            .collect()
    }

    /// Publish the current snapshot to the watch channel and the callback.
    fn notify(&mut self) {
        let snapshot = self.snapshot();
        let _ = self.snapshot_tx.send(snapshot.clone());
        if let Some(callback) = self.on_change.as_mut() {
            callback(&snapshot);
        }
    }
}

struct SessionInner {
    state: Mutex<SessionState>,
    transport: Arc<dyn Transport>,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    snapshot_rx: watch::Receiver<Vec<SlotSnapshot>>,
    auto_start: bool,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        // Abort whatever is still in flight when the caller tears down.
        let state = self.state.get_mut();
        for slot in &mut state.slots {
            if let Some(attempt) = slot.attempt.take() {
                attempt.cancel.cancel();
            }
        }
    }
}

/// Tracks selected files through their upload lifecycle.
///
/// Cheap to clone; clones share the same slot table. Uploads for different
/// slots run concurrently with no ordering between their completions; at
/// most one request is active per slot at any time.
#[derive(Clone)]
pub struct UploadSession {
    inner: Arc<SessionInner>,
}

impl fmt::Debug for UploadSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadSession").finish_non_exhaustive()
    }
}

impl UploadSession {
    /// Create a session over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: SessionConfig) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(Vec::new());
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(SessionInner {
            state: Mutex::new(SessionState {
                slots: Vec::new(),
                next_attempt_id: 0,
                snapshot_tx,
                on_change: None,
            }),
            transport,
            events_tx,
            snapshot_rx,
            auto_start: config.auto_start,
        });

        tokio::spawn(pump_events(Arc::downgrade(&inner), events_rx));

        Self { inner }
    }

    /// Register a callback invoked with the committed slot set after every
    /// transition.
    ///
    /// The callback runs inline with the transition while the slot table is
    /// locked; it must not call back into the session.
    pub async fn set_on_change(&self, callback: impl FnMut(&[SlotSnapshot]) + Send + 'static) {
        self.inner.state.lock().await.on_change = Some(Box::new(callback));
    }

    /// Watch the committed slot set.
    ///
    /// The receiver holds a fresh snapshot after every transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Vec<SlotSnapshot>> {
        self.inner.snapshot_rx.clone()
    }

    /// Add files to the session, allocating one slot per file.
    ///
    /// Duplicates are appended as distinct slots, not deduplicated. With
    /// `auto_start` (the default) each new slot's upload is issued
    /// immediately. An empty list is a no-op.
    ///
    /// Returns the allocated slot indices, in input order.
    pub async fn add_files(&self, files: Vec<SourceFile>) -> Vec<SlotIndex> {
        if files.is_empty() {
            debug!("add_files called with an empty selection");
            return Vec::new();
        }

        let mut state = self.inner.state.lock().await;
        let mut indices = Vec::with_capacity(files.len());
        for source in files {
            indices.push(state.add_file(source));
        }
        state.notify();

        if self.inner.auto_start {
            for &index in &indices {
                self.issue_upload(&mut state, index);
            }
        }

        indices
    }

    /// Start a pending slot's upload.
    ///
    /// Intended for sessions created with `auto_start` disabled. Any other
    /// slot state is a no-op.
    pub async fn start_upload(&self, index: SlotIndex) {
        self.issue_from(index, SlotStatus::Pending, "start").await;
    }

    /// Re-issue a cancelled slot's upload for the same underlying file.
    ///
    /// The new request runs under a fresh cancel handle; anything the old
    /// request still reports is discarded. No-op unless the slot is
    /// cancelled.
    pub async fn retry_upload(&self, index: SlotIndex) {
        self.issue_from(index, SlotStatus::Cancelled, "retry").await;
    }

    /// Cancel a slot's in-flight upload.
    ///
    /// Invokes the slot's cancel handle and resets it to cancelled without
    /// waiting for the transport to confirm the abort. No-op unless the
    /// slot is uploading.
    pub async fn cancel_upload(&self, index: SlotIndex) {
        let mut state = self.inner.state.lock().await;
        if state.cancel_upload(index) {
            state.notify();
        }
    }

    /// Cancel every in-flight upload in the session.
    pub async fn cancel_all(&self) {
        let mut state = self.inner.state.lock().await;
        let uploading: Vec<SlotIndex> = state
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.status == SlotStatus::Uploading)
            .map(|(index, _)| index)
            .collect();

        let mut changed = false;
        for index in uploading {
            changed |= state.cancel_upload(index);
        }
        if changed {
            state.notify();
        }
    }

    /// Remove a slot from the committed set.
    ///
    /// Permitted from uploaded or cancelled. An uploading slot is cancelled
    /// first, then removed, as one atomic operation. The tombstone stays in
    /// the table so later indices remain stable.
    pub async fn remove_slot(&self, index: SlotIndex) {
        let mut state = self.inner.state.lock().await;
        if state.remove_slot(index) {
            state.notify();
        }
    }

    /// Current committed slot set: every slot not removed, in index order.
    pub async fn snapshot(&self) -> Vec<SlotSnapshot> {
        self.inner.state.lock().await.snapshot()
    }

    /// Issue an upload if `index` is currently in `from` state.
    async fn issue_from(&self, index: SlotIndex, from: SlotStatus, op: &str) {
        let mut state = self.inner.state.lock().await;
        let current = state.slots.get(index).map(|slot| slot.status);
        if current == Some(from) {
            self.issue_upload(&mut state, index);
        } else {
            debug!(
                "Slot {index} {op} ignored (status: {})",
                current.map_or("none", SlotStatus::as_str)
            );
        }
    }

    /// Begin an attempt for the slot and spawn its upload task.
    ///
    /// Notifies observers of the transition to uploading.
    fn issue_upload(&self, state: &mut SessionState, index: SlotIndex) {
        let token = self.inner.transport.cancel_token();
        let Some((attempt, source)) = state.begin_attempt(index, token.clone()) else {
            return;
        };

        let progress = ProgressSender::new(index, attempt, self.inner.events_tx.clone());
        let upload = self.inner.transport.upload(source, progress, token);
        let events_tx = self.inner.events_tx.clone();

        tokio::spawn(async move {
            let event = match upload.await {
                Ok(uploaded_name) => TransportEvent::Completed {
                    index,
                    attempt,
                    uploaded_name,
                },
                Err(error) => TransportEvent::Failed {
                    index,
                    attempt,
                    error,
                },
            };
            let _ = events_tx.send(event);
        });

        state.notify();
    }
}

/// Drain transport events and apply them to the session, one at a time.
///
/// Holds only a weak reference so a dropped session ends the pump instead
/// of being kept alive by it.
async fn pump_events(inner: Weak<SessionInner>, mut rx: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };

        let mut state = inner.state.lock().await;
        let changed = match event {
            TransportEvent::Progress {
                index,
                attempt,
                loaded,
                total,
            } => state.report_progress(index, attempt, loaded, total),
            TransportEvent::Completed {
                index,
                attempt,
                uploaded_name,
            } => state.complete_upload(index, attempt, uploaded_name),
            TransportEvent::Failed {
                index,
                attempt,
                error,
            } => state.fail_upload(index, attempt, &error),
        };

        if changed {
            state.notify();
        }
    }
}
