use thiserror::Error;

/// Rejected destination spec. Fatal before any work starts.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Not a valid s3 path: {spec:?}. Example: s3://bucket/path")]
pub struct InvalidDestination {
    pub spec: String,
}

/// Parsed upload destination: a bucket plus a cleaned key prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    /// No leading `/`; trailing `/` when non-empty.
    pub prefix: String,
}

impl Destination {
    /// Parse an `s3://bucket/prefix` spec.
    ///
    /// The scheme, a host segment naming the bucket and a path segment are
    /// all required; `s3://bucket/` selects the bucket root.
    pub fn parse(spec: &str) -> Result<Self, InvalidDestination> {
        let invalid = || InvalidDestination {
            spec: spec.to_string(),
        };

        let rest = spec.strip_prefix("s3://").ok_or_else(invalid)?;
        let (bucket, path) = rest.split_once('/').ok_or_else(invalid)?;
        if bucket.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            bucket: bucket.to_string(),
            prefix: clean_prefix(path),
        })
    }
}

/// Normalize a prefix: no leading `/`, trailing `/` when non-empty.
fn clean_prefix(path: &str) -> String {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.ends_with('/') {
        path.to_string()
    } else {
        format!("{}/", path)
    }
}
