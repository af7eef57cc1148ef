//! Local tree traversal.
//!
//! Produces the candidate entries for one sync pass: regular files, plus
//! symlinks when copy-symlinks is enabled. Per-entry errors are logged
//! and skipped so one unreadable entry never aborts the walk.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::sync::exclude::ExcludeRules;

/// What a candidate entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// Ordinary file, uploaded from disk.
    Regular,
    /// Symbolic link; `target` is the link text, never the pointee.
    Symlink { target: String },
}

/// One candidate produced by the walker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Path relative to the sync root, `/`-joined regardless of host
    /// separator. The object key is the destination prefix plus this.
    pub key: String,
    /// Size in bytes (target text length for symlinks).
    pub size: u64,
    pub kind: EntryKind,
}

/// Counters accumulated over one walk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Files and symlinks considered.
    pub scanned: u64,
    /// Entries dropped by an exclude pattern.
    pub excluded: u64,
    /// Entries skipped because of stat/read errors.
    pub errors: u64,
}

/// Depth-first iterator over the candidate entries under a root.
///
/// Not restartable: one walker serves one sync pass. Directories whose
/// name is in the exclusion set are pruned before descent.
pub struct Walker {
    root: PathBuf,
    rules: ExcludeRules,
    copy_symlinks: bool,
    stack: Vec<fs::ReadDir>,
    stats: WalkStats,
}

impl Walker {
    pub fn new(root: &Path, rules: ExcludeRules, copy_symlinks: bool) -> Self {
        let mut stats = WalkStats::default();
        let stack = match fs::read_dir(root) {
            Ok(entries) => vec![entries],
            Err(err) => {
                warn!(root = %root.display(), error = %err, "Failed to read sync root");
                stats.errors += 1;
                Vec::new()
            }
        };

        Self {
            root: root.to_path_buf(),
            rules,
            copy_symlinks,
            stack,
            stats,
        }
    }

    pub fn stats(&self) -> WalkStats {
        self.stats
    }

    /// `/`-joined path of `path` relative to the walk root.
    fn relative_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(segments.join("/"))
    }
}

impl Iterator for Walker {
    type Item = LocalEntry;

    fn next(&mut self) -> Option<LocalEntry> {
        loop {
            let dir = self.stack.last_mut()?;
            let entry = match dir.next() {
                None => {
                    self.stack.pop();
                    continue;
                }
                Some(Err(err)) => {
                    warn!(error = %err, "Failed to read directory entry");
                    self.stats.errors += 1;
                    continue;
                }
                Some(Ok(entry)) => entry,
            };

            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Failed to stat entry");
                    self.stats.errors += 1;
                    continue;
                }
            };

            if file_type.is_dir() {
                let name = entry.file_name();
                if self.rules.prunes_dir(&name.to_string_lossy()) {
                    debug!(path = %path.display(), "Pruned excluded directory");
                    continue;
                }
                match fs::read_dir(&path) {
                    Ok(entries) => self.stack.push(entries),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "Failed to open directory");
                        self.stats.errors += 1;
                    }
                }
                continue;
            }

            if file_type.is_symlink() {
                // Never uploaded, never an error, unless copying is on.
                if !self.copy_symlinks {
                    continue;
                }
                let Some(key) = self.relative_key(&path) else {
                    self.stats.errors += 1;
                    continue;
                };
                self.stats.scanned += 1;
                if self.rules.is_excluded(&key) {
                    self.stats.excluded += 1;
                    continue;
                }
                let target = match fs::read_link(&path) {
                    Ok(target) => target.to_string_lossy().into_owned(),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "Failed to read link");
                        self.stats.errors += 1;
                        continue;
                    }
                };
                return Some(LocalEntry {
                    size: target.len() as u64,
                    kind: EntryKind::Symlink { target },
                    path,
                    key,
                });
            }

            if file_type.is_file() {
                let Some(key) = self.relative_key(&path) else {
                    self.stats.errors += 1;
                    continue;
                };
                self.stats.scanned += 1;
                if self.rules.is_excluded(&key) {
                    self.stats.excluded += 1;
                    continue;
                }
                let metadata = match entry.metadata() {
                    Ok(metadata) => metadata,
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "Failed to stat file");
                        self.stats.errors += 1;
                        continue;
                    }
                };
                return Some(LocalEntry {
                    path,
                    key,
                    size: metadata.len(),
                    kind: EntryKind::Regular,
                });
            }

            // Sockets, devices and other kinds are not synced.
        }
    }
}
