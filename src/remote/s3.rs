use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use opendal::{services::S3, Operator, Writer};
use std::collections::HashMap;
use std::path::Path;
use tokio::io::AsyncReadExt;
use tracing::warn;

use crate::remote::store::{ListPage, ObjectStore, PutBody, RemoteObject};

/// Objects per listing page. Mirrors the store-side default so one
/// `list_page` call maps to one backend listing call.
const PAGE_SIZE: usize = 1000;

/// Read buffer for streamed file uploads.
const CHUNK_SIZE: usize = 256 * 1024;

/// S3 and S3-compatible object store backed by OpenDAL.
///
/// Credentials come from the standard chain (environment, shared
/// credentials file, instance profile). The handle is a cheap clone;
/// every upload worker clones one so no client is shared across workers.
#[derive(Clone)]
pub struct S3Store {
    operator: Operator,
    bucket: String,
}

impl S3Store {
    /// Create a store bound to one bucket.
    ///
    /// `endpoint` selects an S3-compatible provider (MinIO, R2, ...);
    /// `None` means AWS.
    pub fn new(bucket: &str, region: &str, endpoint: Option<&str>) -> Result<Self> {
        let mut builder = S3::default().bucket(bucket).region(region);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .with_context(|| format!("Failed to configure store for bucket {}", bucket))?
            .finish();

        Ok(Self {
            operator,
            bucket: bucket.to_string(),
        })
    }

    /// Bucket this store is bound to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

/// One raw listing entry before directory markers are filtered out.
struct RawEntry {
    key: String,
    size: u64,
    etag: String,
    dir: bool,
}

/// Accumulate entries into one page of up to `page_size` objects.
///
/// Directory markers are dropped and do not count toward the page size,
/// so a run of them can never produce a short or empty page while real
/// objects remain in the stream. The derived marker (the last merged
/// key) therefore always sits at or past every entry consumed here.
async fn fill_page<S>(entries: &mut S, page_size: usize) -> Result<ListPage>
where
    S: Stream<Item = Result<RawEntry>> + Unpin,
{
    let mut objects = Vec::new();
    while objects.len() < page_size {
        let entry = match entries.next().await {
            Some(entry) => entry?,
            None => {
                return Ok(ListPage {
                    objects,
                    truncated: false,
                })
            }
        };

        // Directory markers carry no content and are never synced over.
        if entry.dir {
            continue;
        }

        objects.push(RemoteObject::new(entry.key, entry.size, &entry.etag));
    }

    Ok(ListPage {
        objects,
        truncated: true,
    })
}

/// Stream `path` into `writer` in [`CHUNK_SIZE`] chunks.
async fn stream_file(writer: &mut Writer, path: &Path, key: &str) -> Result<()> {
    // The file handle lives only for the duration of the PUT.
    let mut file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = file
            .read(&mut buf)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if n == 0 {
            return Ok(());
        }
        writer
            .write(buf[..n].to_vec())
            .await
            .with_context(|| format!("Failed to upload {}", key))?;
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(&self, prefix: &str, marker: Option<&str>) -> Result<ListPage> {
        let mut lister = self.operator.lister_with(prefix).recursive(true);
        if let Some(marker) = marker {
            lister = lister.start_after(marker);
        }
        let lister = lister
            .await
            .with_context(|| format!("Failed to list objects under {:?}", prefix))?;

        let mut entries = lister.map(|entry| {
            let entry = entry.context("Failed to read listing entry")?;
            Ok(RawEntry {
                dir: entry.metadata().mode().is_dir() || entry.path().ends_with('/'),
                key: entry.path().to_string(),
                size: entry.metadata().content_length(),
                etag: entry.metadata().etag().unwrap_or_default().to_string(),
            })
        });

        fill_page(&mut entries, PAGE_SIZE).await
    }

    async fn put(
        &self,
        key: &str,
        body: &PutBody,
        content_type: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<()> {
        match body {
            PutBody::Inline(bytes) => {
                let mut write = self
                    .operator
                    .write_with(key, bytes.clone())
                    .content_type(content_type);
                if !metadata.is_empty() {
                    write = write.user_metadata(metadata.clone());
                }
                write
                    .await
                    .with_context(|| format!("Failed to upload {}", key))?;
            }
            PutBody::File(path) => {
                let mut writer = self.operator.writer_with(key).content_type(content_type);
                if !metadata.is_empty() {
                    writer = writer.user_metadata(metadata.clone());
                }
                let mut writer = writer
                    .await
                    .with_context(|| format!("Failed to open upload for {}", key))?;

                if let Err(err) = stream_file(&mut writer, path, key).await {
                    // Abort tears down any multipart upload already
                    // started so failed PUTs leave no stored parts.
                    if let Err(abort_err) = writer.abort().await {
                        warn!(key, error = %abort_err, "Failed to abort upload");
                    }
                    return Err(err);
                }
                writer
                    .close()
                    .await
                    .with_context(|| format!("Failed to finish upload of {}", key))?;
            }
        }

        Ok(())
    }
}
