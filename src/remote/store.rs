use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// One object as reported by the remote store's listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    /// Full object key (prefix included).
    pub key: String,
    /// Object size in bytes.
    pub size: u64,
    /// Content fingerprint as returned by the store, surrounding quotes
    /// trimmed. Empty when the store did not report one.
    pub etag: String,
}

impl RemoteObject {
    /// Build a record, normalizing the quoted ETag form stores hand back.
    pub fn new(key: impl Into<String>, size: u64, etag: &str) -> Self {
        Self {
            key: key.into(),
            size,
            etag: etag.trim_matches('"').to_string(),
        }
    }
}

/// A single page of a paginated listing.
#[derive(Debug, Clone, Default)]
pub struct ListPage {
    pub objects: Vec<RemoteObject>,
    /// Whether more objects may follow this page.
    pub truncated: bool,
}

/// Body of an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutBody {
    /// Stream the file from disk for the duration of the PUT.
    File(PathBuf),
    /// Small in-memory payload (symlink target text).
    Inline(Vec<u8>),
}

/// Minimal object-store surface consumed by the sync engine.
///
/// Implementations are bound to one bucket; keys are bucket-relative.
/// Workers clone the implementing handle so each owns its own client.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// List one page of objects under `prefix`, starting after `marker`
    /// when given. `truncated` signals that another page may follow.
    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage>;

    /// Upload one whole object.
    async fn put(
        &self,
        key: &str,
        body: &PutBody,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_object_trims_quoted_etag() {
        let object = RemoteObject::new("data/a", 3, "\"5d41402abc4b2a76b9719d911017c592\"");
        assert_eq!(object.etag, "5d41402abc4b2a76b9719d911017c592");

        let bare = RemoteObject::new("data/b", 3, "abc");
        assert_eq!(bare.etag, "abc");

        let missing = RemoteObject::new("data/c", 3, "");
        assert!(missing.etag.is_empty());
    }
}
