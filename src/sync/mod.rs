//! One-way mirror of a local tree into an object-store prefix.
//!
//! The walker and diff run as a single producer feeding a bounded queue
//! of upload tasks consumed by a fixed pool of workers.

pub mod diff;
pub mod engine;
pub mod exclude;
pub mod upload;
pub mod walk;

pub use diff::should_upload;
pub use engine::{SyncConfig, SyncEngine, SyncStats};
pub use exclude::ExcludeRules;
pub use upload::UploadTask;
pub use walk::{EntryKind, LocalEntry, Walker};
