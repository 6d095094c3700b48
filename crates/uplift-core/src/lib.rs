//! # Uplift Core Library
//!
//! `uplift-core` provides upload session management: it tracks a set of
//! selected files through a per-file lifecycle, runs their uploads
//! concurrently, and supports mid-flight cancellation, retry, and removal.
//!
//! ## Features
//!
//! - **Per-file lifecycle**: pending, uploading, uploaded, cancelled, removed
//! - **Cooperative cancellation**: every in-flight request carries a cancel
//!   handle; stale callbacks from aborted requests are discarded
//! - **Progress with ack headroom**: in-flight progress is capped at 90%,
//!   the rest is granted only on server acknowledgment
//! - **Pluggable transport**: HTTP multipart out of the box, any
//!   [`transport::Transport`] implementation otherwise
//!
//! ## Modules
//!
//! - [`config`] - Configuration management
//! - [`mod@file`] - Source file handles and filters
//! - [`session`] - The upload session manager
//! - [`transport`] - Transport contract and HTTP implementation

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]

pub mod config;
pub mod error;
pub mod file;
pub mod session;
pub mod transport;

pub use error::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Highest progress percentage an in-flight upload may report.
///
/// The remaining headroom is reserved for the server acknowledgment, so no
/// slot shows 100% before the server confirms receipt.
pub const PROGRESS_CEILING: u8 = 90;

/// Default endpoint files are posted to.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:3030/api/file";
