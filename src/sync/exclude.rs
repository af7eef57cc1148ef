//! Exclusion rules deciding whether a local path takes part in the sync.
//!
//! Two mechanisms: shell-style glob patterns matched against the path
//! relative to the sync root, and exact directory names whose whole
//! subtree is pruned during traversal.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use std::collections::HashSet;
use tracing::warn;

/// Compiled exclusion rules.
#[derive(Debug, Clone, Default)]
pub struct ExcludeRules {
    glob_set: GlobSet,
    patterns: Vec<String>,
    dir_names: HashSet<String>,
}

impl ExcludeRules {
    /// Compile rules from raw pattern strings and directory names.
    ///
    /// Patterns use shell wildcard semantics (`*`, `?`, `[...]`; `*` does
    /// not cross `/`). A malformed pattern is reported and treated as
    /// non-matching; the remaining patterns stay in force.
    pub fn new<P, D>(patterns: P, dir_names: D) -> Self
    where
        P: IntoIterator,
        P::Item: AsRef<str>,
        D: IntoIterator,
        D::Item: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            match GlobBuilder::new(pattern).literal_separator(true).build() {
                Ok(glob) => {
                    builder.add(glob);
                    kept.push(pattern.to_string());
                }
                Err(err) => {
                    warn!(pattern, error = %err, "Ignoring malformed exclude pattern");
                }
            }
        }

        let glob_set = match builder.build() {
            Ok(set) => set,
            Err(err) => {
                warn!(error = %err, "Exclude patterns disabled");
                GlobSet::empty()
            }
        };

        Self {
            glob_set,
            patterns: kept,
            dir_names: dir_names
                .into_iter()
                .map(|d| d.as_ref().to_string())
                .collect(),
        }
    }

    /// Whether a root-relative path matches any exclude pattern.
    pub fn is_excluded(&self, relative_path: &str) -> bool {
        self.glob_set.is_match(relative_path)
    }

    /// Whether a directory of this name must be pruned (not descended into).
    pub fn prunes_dir(&self, name: &str) -> bool {
        self.dir_names.contains(name)
    }

    /// The patterns that compiled successfully.
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
