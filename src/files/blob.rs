use crate::error::{Result, UploaderError};
use crate::files::RawBody;
use bytes::Bytes;
use futures::{stream, Stream};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;

const URL_PREFIX: &str = "blob:uploader/";

/// Content delivered chunk by chunk.
pub type ContentStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send + Sync>>;

/// Splits in-memory content into zero-copy slices of at most `chunk_size` bytes.
pub fn chunked(bytes: Bytes, chunk_size: usize) -> ContentStream {
    let len = bytes.len();
    let chunk_size = chunk_size.max(1);
    let chunks = (0..len)
        .step_by(chunk_size)
        .map(move |start| Ok(bytes.slice(start..(start + chunk_size).min(len))));
    Box::pin(stream::iter(chunks))
}

#[derive(Debug, Clone)]
pub enum BlobSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl From<RawBody> for BlobSource {
    fn from(body: RawBody) -> Self {
        match body {
            RawBody::Path(path) => BlobSource::Path(path),
            RawBody::Bytes(bytes) => BlobSource::Bytes(bytes),
        }
    }
}

/// Content references for selected files. Each reference lives until revoked.
#[derive(Debug, Clone, Default)]
pub struct BlobStore {
    entries: Arc<Mutex<HashMap<String, BlobSource>>>,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, BlobSource>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(&self, source: BlobSource) -> String {
        let url = format!("{}{}", URL_PREFIX, uuid::Uuid::new_v4());
        self.entries().insert(url.clone(), source);
        url
    }

    pub fn resolve(&self, url: &str) -> Option<BlobSource> {
        self.entries().get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries().contains_key(url)
    }

    /// Releases a reference. Returns `false` if it was already gone.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.entries().remove(url).is_some();
        if removed {
            tracing::debug!(url, "revoked content reference");
        }
        removed
    }

    pub fn revoke_all(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn read(&self, url: &str) -> Result<Arc<[u8]>> {
        match self.resolve(url) {
            Some(BlobSource::Bytes(bytes)) => Ok(bytes),
            Some(BlobSource::Path(path)) => Ok(tokio::fs::read(path).await?.into()),
            None => Err(UploaderError::UnknownContent(url.to_string())),
        }
    }

    /// Opens the content for streaming. Files are read from disk as the stream is polled.
    /// Returns the content length with the stream.
    pub async fn stream(&self, url: &str, chunk_size: usize) -> Result<(u64, ContentStream)> {
        match self.resolve(url) {
            Some(BlobSource::Bytes(bytes)) => {
                let len = bytes.len() as u64;
                Ok((len, chunked(Bytes::from_owner(bytes), chunk_size)))
            }
            Some(BlobSource::Path(path)) => {
                let file = tokio::fs::File::open(&path).await?;
                let len = file.metadata().await?.len();
                Ok((len, Box::pin(ReaderStream::with_capacity(file, chunk_size))))
            }
            None => Err(UploaderError::UnknownContent(url.to_string())),
        }
    }

    /// Reads at most `limit` bytes from the start of the content.
    pub async fn read_prefix(&self, url: &str, limit: usize) -> Result<Vec<u8>> {
        match self.resolve(url) {
            Some(BlobSource::Bytes(bytes)) => Ok(bytes[..bytes.len().min(limit)].to_vec()),
            Some(BlobSource::Path(path)) => {
                let file = tokio::fs::File::open(path).await?;
                let mut buffer = Vec::with_capacity(limit.min(64 * 1024));
                file.take(limit as u64).read_to_end(&mut buffer).await?;
                Ok(buffer)
            }
            None => Err(UploaderError::UnknownContent(url.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_registered_bytes_until_revoked() {
        let store = BlobStore::new();
        let url = store.register(BlobSource::Bytes(Arc::from(&b"hello world"[..])));

        assert!(url.starts_with(URL_PREFIX));
        assert_eq!(&*store.read(&url).await.unwrap(), b"hello world");
        assert_eq!(store.read_prefix(&url, 5).await.unwrap(), b"hello");

        assert!(store.revoke(&url));
        assert!(!store.revoke(&url));
        assert!(matches!(
            store.read(&url).await,
            Err(UploaderError::UnknownContent(_))
        ));
    }

    #[tokio::test]
    async fn reads_path_backed_content_lazily() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "line one\nline two").unwrap();

        let store = BlobStore::new();
        let url = store.register(BlobSource::Path(path));
        assert_eq!(store.read_prefix(&url, 8).await.unwrap(), b"line one");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn streams_files_in_bounded_chunks() {
        use futures::TryStreamExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, vec![7u8; 10]).unwrap();

        let store = BlobStore::new();
        let url = store.register(BlobSource::Path(path));
        let (len, stream) = store.stream(&url, 4).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();

        assert_eq!(len, 10);
        assert!(chunks.iter().all(|c| c.len() <= 4));
        assert_eq!(chunks.iter().map(Bytes::len).sum::<usize>(), 10);
    }

    #[tokio::test]
    async fn in_memory_content_is_sliced_in_order() {
        use futures::TryStreamExt;

        let store = BlobStore::new();
        let url = store.register(BlobSource::Bytes(Arc::from(&b"abcdefg"[..])));
        let (len, stream) = store.stream(&url, 3).await.unwrap();
        let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();

        assert_eq!(len, 7);
        assert_eq!(chunks, vec![Bytes::from("abc"), Bytes::from("def"), Bytes::from("g")]);
    }
}
