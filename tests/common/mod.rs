// Shared in-memory ObjectStore double for integration tests.
// Not every test crate uses every helper.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use md5::{Digest, Md5};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use updraft::remote::{ListPage, ObjectStore, PutBody, RemoteObject};

/// One object held by the double.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
    pub etag: String,
}

/// Cloneable in-memory store. Clones share state, like worker clients
/// talking to one bucket.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

struct Inner {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    page_size: usize,
    /// Number of upcoming list calls that fail.
    list_failures: AtomicU32,
    /// Zero-based list attempt indices that fail.
    failing_attempts: Mutex<HashSet<u32>>,
    /// Total list attempts so far.
    list_attempts: AtomicU32,
    /// Keys whose puts fail.
    failing_keys: Mutex<HashSet<String>>,
    /// Every key a put was issued for, in call order.
    put_log: Mutex<Vec<String>>,
    /// Marker carried by each successful list call, in call order.
    list_log: Mutex<Vec<Option<String>>>,
    put_delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                objects: Mutex::new(BTreeMap::new()),
                page_size,
                list_failures: AtomicU32::new(0),
                failing_attempts: Mutex::new(HashSet::new()),
                list_attempts: AtomicU32::new(0),
                failing_keys: Mutex::new(HashSet::new()),
                put_log: Mutex::new(Vec::new()),
                list_log: Mutex::new(Vec::new()),
                put_delay: None,
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Rebuild the store with a per-put delay (for concurrency tests).
    pub fn with_put_delay(self, delay: Duration) -> Self {
        let inner = Arc::try_unwrap(self.inner).ok().expect("store not yet cloned");
        Self {
            inner: Arc::new(Inner {
                put_delay: Some(delay),
                ..inner
            }),
        }
    }

    /// Place an object remotely without going through `put`.
    pub fn seed(&self, key: &str, size: usize) {
        self.seed_with_etag(key, vec![b'x'; size], "");
    }

    pub fn seed_with_etag(&self, key: &str, body: Vec<u8>, etag: &str) {
        self.inner.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                etag: etag.to_string(),
                content_type: String::new(),
                metadata: HashMap::new(),
                body,
            },
        );
    }

    /// Make the next `n` list calls fail.
    pub fn fail_next_lists(&self, n: u32) {
        self.inner.list_failures.store(n, Ordering::SeqCst);
    }

    /// Make the list attempts with these zero-based indices fail.
    pub fn fail_list_attempts(&self, indices: &[u32]) {
        self.inner
            .failing_attempts
            .lock()
            .unwrap()
            .extend(indices.iter().copied());
    }

    /// Make every put for `key` fail.
    pub fn fail_puts_for(&self, key: &str) {
        self.inner
            .failing_keys
            .lock()
            .unwrap()
            .insert(key.to_string());
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.inner.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Keys of every put issued, in call order (failures included).
    pub fn put_log(&self) -> Vec<String> {
        self.inner.put_log.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.inner.put_log.lock().unwrap().len()
    }

    /// Highest number of puts that were ever executing at once.
    pub fn max_concurrent_puts(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    /// Markers of the successful list calls, in call order.
    pub fn list_log(&self) -> Vec<Option<String>> {
        self.inner.list_log.lock().unwrap().clone()
    }
}

fn md5_hex(data: &[u8]) -> String {
    format!("{:x}", Md5::digest(data))
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage> {
        let attempt = self.inner.list_attempts.fetch_add(1, Ordering::SeqCst);
        if self.inner.failing_attempts.lock().unwrap().contains(&attempt) {
            return Err(anyhow!("injected listing failure"));
        }
        let failures = self.inner.list_failures.load(Ordering::SeqCst);
        if failures > 0 {
            self.inner.list_failures.store(failures - 1, Ordering::SeqCst);
            return Err(anyhow!("injected listing failure"));
        }
        self.inner
            .list_log
            .lock()
            .unwrap()
            .push(marker.map(str::to_string));

        let objects = self.inner.objects.lock().unwrap();
        let matching: Vec<RemoteObject> = objects
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .filter(|(key, _)| marker.map_or(true, |m| key.as_str() > m))
            .map(|(key, stored)| RemoteObject {
                key: key.clone(),
                size: stored.body.len() as u64,
                etag: stored.etag.clone(),
            })
            .collect();

        let truncated = matching.len() > self.inner.page_size;
        Ok(ListPage {
            objects: matching.into_iter().take(self.inner.page_size).collect(),
            truncated,
        })
    }

    async fn put(
        &self,
        key: &str,
        body: &PutBody,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        self.inner.put_log.lock().unwrap().push(key.to_string());

        let in_flight = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner
            .max_in_flight
            .fetch_max(in_flight, Ordering::SeqCst);
        if let Some(delay) = self.inner.put_delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.inner.failing_keys.lock().unwrap().contains(key) {
            return Err(anyhow!("injected put failure for {}", key));
        }

        let bytes = match body {
            PutBody::Inline(bytes) => bytes.clone(),
            PutBody::File(path) => tokio::fs::read(path).await?,
        };

        self.inner.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                etag: md5_hex(&bytes),
                content_type: content_type.to_string(),
                metadata: metadata.clone(),
                body: bytes,
            },
        );
        Ok(())
    }
}
