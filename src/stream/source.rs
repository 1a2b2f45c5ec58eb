//! Byte-stream sources for ingestion.
//!
//! A [`ChunkSource`] opens one read of the remote (or local) feed and yields raw chunks.
//! Each call to `open` starts from the beginning: retry is a full restart, never a resume.

use crate::error::{NdjviewError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::io::ReaderStream;

/// An opened source: an optional size hint and the chunk stream itself.
pub struct SourceResponse {
    /// Advertised total size (e.g. `Content-Length`), if known
    pub total_bytes: Option<u64>,
    /// Raw body chunks in arrival order
    pub body: BoxStream<'static, Result<Bytes>>,
}

impl std::fmt::Debug for SourceResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceResponse")
            .field("total_bytes", &self.total_bytes)
            .finish_non_exhaustive()
    }
}

/// Core trait for anything that can be streamed into the log store.
#[async_trait]
pub trait ChunkSource: Send + Sync {
    /// Open a fresh read of the source.
    ///
    /// Errors here are transport failures (bad status, missing file); errors yielded by
    /// the returned stream are IO failures.
    async fn open(&self) -> Result<SourceResponse>;

    /// Human-readable label for status display and logs
    fn describe(&self) -> String;
}

/// Streams an NDJSON body over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
    url: reqwest::Url,
}

impl HttpSource {
    pub fn new(url: &str) -> Result<Self> {
        let url = reqwest::Url::parse(url).map_err(|e| NdjviewError::InvalidArgument {
            message: format!("invalid URL '{}': {}", url, e),
        })?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| NdjviewError::network("Failed to build HTTP client", e))?;
        Ok(Self { client, url })
    }

    pub fn with_client(client: reqwest::Client, url: reqwest::Url) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ChunkSource for HttpSource {
    async fn open(&self) -> Result<SourceResponse> {
        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(NdjviewError::from)?;

        let status = response.status();
        if !status.is_success() {
            return Err(NdjviewError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let total_bytes = response.content_length();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(NdjviewError::from))
            .boxed();

        Ok(SourceResponse { total_bytes, body })
    }

    fn describe(&self) -> String {
        self.url.to_string()
    }
}

/// Streams a local NDJSON file.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ChunkSource for FileSource {
    async fn open(&self) -> Result<SourceResponse> {
        let file = match tokio::fs::File::open(&self.path).await {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(NdjviewError::SourceNotFound {
                    path: self.path.clone(),
                });
            }
            Err(err) => {
                return Err(NdjviewError::file_error(
                    format!("Failed to open {}", self.path.display()),
                    err,
                ));
            }
        };

        let metadata = file.metadata().await?;
        if !metadata.is_file() {
            return Err(NdjviewError::InvalidArgument {
                message: format!("Path is not a regular file: {}", self.path.display()),
            });
        }

        let body = ReaderStream::new(file)
            .map(|chunk| chunk.map_err(NdjviewError::from))
            .boxed();

        Ok(SourceResponse {
            total_bytes: Some(metadata.len()),
            body,
        })
    }

    fn describe(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("<unnamed>")
            .to_string()
    }
}

/// Replays a fixed list of chunks. Used by tests, benches and demos.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    chunks: Vec<Bytes>,
    advertise_length: bool,
}

impl MemorySource {
    pub fn new<I, B>(chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
            advertise_length: true,
        }
    }

    /// Split `data` into chunks of at most `chunk_size` bytes.
    pub fn chunked(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        let data: Bytes = data.into();
        let chunk_size = chunk_size.max(1);
        let chunks = (0..data.len())
            .step_by(chunk_size)
            .map(|start| data.slice(start..(start + chunk_size).min(data.len())))
            .collect();
        Self {
            chunks,
            advertise_length: true,
        }
    }

    /// Do not report a total size, like a chunked HTTP response.
    pub fn without_length(mut self) -> Self {
        self.advertise_length = false;
        self
    }
}

#[async_trait]
impl ChunkSource for MemorySource {
    async fn open(&self) -> Result<SourceResponse> {
        let total_bytes = self
            .advertise_length
            .then(|| self.chunks.iter().map(|c| c.len() as u64).sum());
        let body = stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed();
        Ok(SourceResponse { total_bytes, body })
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Pick a source implementation from a command-line argument.
pub fn open_source(spec: &str) -> Result<Arc<dyn ChunkSource>> {
    if spec.starts_with("http://") || spec.starts_with("https://") {
        Ok(Arc::new(HttpSource::new(spec)?))
    } else {
        Ok(Arc::new(FileSource::new(spec)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    async fn collect(source: &dyn ChunkSource) -> (Option<u64>, Vec<u8>) {
        let response = source.open().await.unwrap();
        let mut data = Vec::new();
        let mut body = response.body;
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        (response.total_bytes, data)
    }

    #[tokio::test]
    async fn memory_source_replays_chunks() {
        let source = MemorySource::chunked("abcdefg", 3);
        let (total, data) = collect(&source).await;
        assert_eq!(total, Some(7));
        assert_eq!(data, b"abcdefg");

        let (total, _) = collect(&source.without_length()).await;
        assert_eq!(total, None);
    }

    #[tokio::test]
    async fn file_source_reports_size_and_content() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"_time\":1}\n").unwrap();
        file.flush().unwrap();

        let source = FileSource::new(file.path());
        let (total, data) = collect(&source).await;
        assert_eq!(total, Some(12));
        assert_eq!(data, b"{\"_time\":1}\n");
    }

    #[tokio::test]
    async fn missing_file_is_a_transport_failure() {
        let source = FileSource::new("/definitely/not/here.ndjson");
        match source.open().await {
            Err(NdjviewError::SourceNotFound { path }) => {
                assert_eq!(path, PathBuf::from("/definitely/not/here.ndjson"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn open_source_dispatches_on_scheme() {
        let http = open_source("https://example.com/logs.ndjson").unwrap();
        assert_eq!(http.describe(), "https://example.com/logs.ndjson");

        let file = open_source("/var/log/app.ndjson").unwrap();
        assert_eq!(file.describe(), "app.ndjson");
    }

    #[test]
    fn invalid_url_is_rejected() {
        assert!(matches!(
            HttpSource::new("http://"),
            Err(NdjviewError::InvalidArgument { .. })
        ));
    }
}
