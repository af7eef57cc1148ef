//! Per-file upload logic: task construction and the PUT call.

use anyhow::Result;
use std::collections::HashMap;
use std::path::Path;

use crate::remote::store::{ObjectStore, PutBody};
use crate::sync::walk::{EntryKind, LocalEntry};

/// Fallback for extensions the MIME table does not know.
const DEFAULT_CONTENT_TYPE: &str = "binary/octet-stream";

/// One unit of work for the upload pool. Created exactly when the diff
/// decides an upload is required; consumed exactly once by a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Destination object key (prefix included).
    pub key: String,
    pub body: PutBody,
    pub content_type: String,
    /// String-valued object metadata; empty when unavailable.
    pub metadata: HashMap<String, String>,
}

/// Resolve a content type from the extension table.
pub fn content_type(key: &str) -> String {
    mime_guess::from_path(key)
        .first_raw()
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
}

/// Filesystem identity bits attached as object metadata where the
/// platform exposes them.
#[cfg(unix)]
fn file_metadata(path: &Path) -> HashMap<String, String> {
    use std::os::unix::fs::MetadataExt;

    match std::fs::symlink_metadata(path) {
        Ok(meta) => HashMap::from([
            ("mode".to_string(), meta.mode().to_string()),
            ("uid".to_string(), meta.uid().to_string()),
            ("gid".to_string(), meta.gid().to_string()),
        ]),
        Err(_) => HashMap::new(),
    }
}

#[cfg(not(unix))]
fn file_metadata(_path: &Path) -> HashMap<String, String> {
    HashMap::new()
}

impl UploadTask {
    /// Build the task for a walked entry under the given prefix.
    pub fn for_entry(entry: &LocalEntry, prefix: &str) -> Self {
        let key = format!("{}{}", prefix, entry.key);
        let body = match &entry.kind {
            EntryKind::Regular => PutBody::File(entry.path.clone()),
            EntryKind::Symlink { target } => PutBody::Inline(target.clone().into_bytes()),
        };

        Self {
            content_type: content_type(&key),
            metadata: file_metadata(&entry.path),
            key,
            body,
        }
    }

    /// Issue the PUT for this task through a worker's store client.
    pub async fn run<S: ObjectStore>(&self, store: &S) -> Result<()> {
        store
            .put(&self.key, &self.body, &self.content_type, &self.metadata)
            .await
    }
}
