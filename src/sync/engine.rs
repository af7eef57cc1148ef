//! Sync engine: one walker/diff producer feeding a fixed pool of upload
//! workers over a bounded queue.
//!
//! The queue is the only synchronization surface between producer and
//! workers. The producer blocks when it is full, which bounds memory when
//! uploads run slower than traversal; workers exit once the walk is done
//! and the queue is closed and drained.

use std::path::Path;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::remote::dest::Destination;
use crate::remote::index::{build_index, ListError};
use crate::remote::store::ObjectStore;
use crate::sync::diff::should_upload;
use crate::sync::exclude::ExcludeRules;
use crate::sync::upload::UploadTask;
use crate::sync::walk::{WalkStats, Walker};

/// Queue capacity per worker.
const QUEUE_FACTOR: usize = 1000;

/// Sync configuration, surfaced by the CLI layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Number of parallel upload workers.
    pub workers: usize,
    /// Copy symlinks as their target text instead of skipping them.
    pub copy_symlinks: bool,
    /// Exclusion rules applied during the walk.
    pub exclude: ExcludeRules,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            workers: 16,
            copy_symlinks: false,
            exclude: ExcludeRules::default(),
        }
    }
}

/// Outcome counters for one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    /// Objects in the remote snapshot.
    pub remote_objects: usize,
    /// Files and symlinks considered by the walker.
    pub scanned: u64,
    /// Entries dropped by exclusion rules.
    pub excluded: u64,
    /// Entries skipped because the remote copy already matches.
    pub up_to_date: u64,
    /// Tasks handed to the worker pool.
    pub enqueued: u64,
    /// Uploads that completed.
    pub uploaded: u64,
    /// Uploads that failed (logged, file left unsynced).
    pub failed: u64,
    /// Entries skipped due to stat/read errors during the walk.
    pub walk_errors: u64,
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    List(#[from] ListError),
    #[error("Sync task panicked: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// One-way mirror of a local tree into an object-store prefix.
pub struct SyncEngine<S> {
    store: S,
    config: SyncConfig,
}

impl<S> SyncEngine<S>
where
    S: ObjectStore + Clone + Send + Sync + 'static,
{
    pub fn new(store: S, config: SyncConfig) -> Self {
        Self { store, config }
    }

    /// Run one sync pass of `source` into `dest`.
    ///
    /// Builds the remote index first (fatal on [`ListError`], before any
    /// upload), then streams walk+diff survivors to the worker pool and
    /// waits for every worker to drain and exit. Individual upload
    /// failures are logged and do not stop the run.
    pub async fn run(&self, source: &Path, dest: &Destination) -> Result<SyncStats, SyncError> {
        let index = build_index(&self.store, &dest.prefix).await?;
        let remote_objects = index.len();
        info!(
            prefix = %dest.prefix,
            objects = remote_objects,
            "Remote index ready"
        );

        let workers = self.config.workers.max(1);
        let (tx, rx) = async_channel::bounded::<UploadTask>(workers * QUEUE_FACTOR);

        // Workers start before the producer feeds the queue. Each owns
        // its own store client.
        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let rx = rx.clone();
            let store = self.store.clone();
            handles.push(tokio::spawn(async move {
                let mut uploaded = 0u64;
                let mut failed = 0u64;
                while let Ok(task) = rx.recv().await {
                    let start = Instant::now();
                    info!(worker, key = %task.key, "Upload start");
                    match task.run(&store).await {
                        Ok(()) => {
                            uploaded += 1;
                            info!(worker, key = %task.key, elapsed = ?start.elapsed(), "Upload done");
                        }
                        Err(err) => {
                            failed += 1;
                            error!(worker, key = %task.key, "Upload failed: {:#}", err);
                        }
                    }
                }
                (uploaded, failed)
            }));
        }
        drop(rx);

        // Single sequential producer: walk, filter, diff, enqueue. Runs
        // on a blocking task; send_blocking applies the backpressure.
        let root = source.to_path_buf();
        let prefix = dest.prefix.clone();
        let rules = self.config.exclude.clone();
        let copy_symlinks = self.config.copy_symlinks;
        let producer = tokio::task::spawn_blocking(move || {
            let mut walker = Walker::new(&root, rules, copy_symlinks);
            let mut up_to_date = 0u64;
            let mut enqueued = 0u64;
            for entry in walker.by_ref() {
                if !should_upload(&entry, &prefix, &index) {
                    debug!(key = %entry.key, "Exists, skipping");
                    up_to_date += 1;
                    continue;
                }
                let task = UploadTask::for_entry(&entry, &prefix);
                if tx.send_blocking(task).is_err() {
                    // Every worker is gone; nothing can consume more work.
                    break;
                }
                enqueued += 1;
            }
            // Dropping the sender here closes the queue.
            (walker.stats(), up_to_date, enqueued)
        });

        let (walk_stats, up_to_date, enqueued): (WalkStats, u64, u64) = producer.await?;

        let mut uploaded = 0u64;
        let mut failed = 0u64;
        for handle in handles {
            let (done, errs) = handle.await?;
            uploaded += done;
            failed += errs;
        }

        Ok(SyncStats {
            remote_objects,
            scanned: walk_stats.scanned,
            excluded: walk_stats.excluded,
            up_to_date,
            enqueued,
            uploaded,
            failed,
            walk_errors: walk_stats.errors,
        })
    }
}
