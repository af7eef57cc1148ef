//! Remote object snapshot.
//!
//! The index is built once per run by paging through the store's listing
//! and is read-only afterwards. Objects written by concurrent external
//! writers during the run stay invisible to this pass.

use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::remote::store::{ObjectStore, RemoteObject};

/// Retries allowed per listing call after its first failure. The budget
/// refills after every successful page.
const LIST_RETRIES: u32 = 5;

/// Listing retry budget exhausted. Fatal: the index is a precondition of
/// the sync, so no upload is attempted.
#[derive(Debug, Error)]
#[error("Listing objects under {prefix:?} failed after {attempts} attempts: {message}")]
pub struct ListError {
    pub prefix: String,
    pub attempts: u32,
    pub message: String,
}

/// Snapshot of the remote objects under a prefix, keyed by object key.
#[derive(Debug, Default)]
pub struct RemoteIndex {
    objects: HashMap<String, RemoteObject>,
}

impl RemoteIndex {
    pub fn new(objects: HashMap<String, RemoteObject>) -> Self {
        Self { objects }
    }

    pub fn get(&self, key: &str) -> Option<&RemoteObject> {
        self.objects.get(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether `key` exists remotely with exactly `size` bytes.
    pub fn matches_size(&self, key: &str, size: u64) -> bool {
        self.objects.get(key).map_or(false, |o| o.size == size)
    }

    /// Whether `key` exists remotely with the given content fingerprint.
    pub fn matches_etag(&self, key: &str, etag: &str) -> bool {
        self.objects
            .get(key)
            .map_or(false, |o| !o.etag.is_empty() && o.etag == etag)
    }
}

/// Page through every object under `prefix` into a [`RemoteIndex`].
///
/// Each page call gets [`LIST_RETRIES`] retries without delay; a success
/// refills the budget for the next page. The marker always advances to
/// the last key actually merged, and the listing ends on a non-truncated
/// response or a page that yields no objects.
pub async fn build_index<S: ObjectStore>(store: &S, prefix: &str) -> Result<RemoteIndex, ListError> {
    let mut objects = HashMap::new();
    let mut marker: Option<String> = None;
    let mut retries = LIST_RETRIES;

    loop {
        let page = match store.list_page(prefix, marker.as_deref()).await {
            Ok(page) => page,
            Err(err) => {
                warn!(prefix, error = %err, retries_left = retries, "Listing call failed");
                if retries == 0 {
                    return Err(ListError {
                        prefix: prefix.to_string(),
                        attempts: LIST_RETRIES + 1,
                        message: format!("{:#}", err),
                    });
                }
                retries -= 1;
                continue;
            }
        };
        retries = LIST_RETRIES;

        let last_key = page.objects.last().map(|o| o.key.clone());
        for object in page.objects {
            objects.insert(object.key.clone(), object);
        }

        // No objects means no marker can be derived; stop either way.
        match last_key {
            Some(key) => marker = Some(key),
            None => break,
        }
        if !page.truncated {
            break;
        }
    }

    debug!(prefix, objects = objects.len(), "Remote index built");
    Ok(RemoteIndex::new(objects))
}
