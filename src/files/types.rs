use crate::adapters::AdapterId;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The widget's single representation of a file, whatever source it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagedFile {
    pub id: String,
    pub name: String,
    pub mime: String,
    pub size: u64,
    /// `blob:` reference into the owning [`BlobStore`](super::BlobStore).
    pub content_url: String,
    pub thumbnail_url: Option<String>,
    pub source: Option<AdapterId>,
    pub previewable: bool,
    /// Storage key, set once the file has been uploaded.
    pub key: Option<String>,
    /// Public URL, set once the file has been uploaded.
    pub public_url: Option<String>,
}

impl ManagedFile {
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
    }

    pub fn is_uploaded(&self) -> bool {
        self.public_url.is_some()
    }
}

#[derive(Debug, Clone)]
pub enum RawBody {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

/// A file as handed over by an adapter, before validation.
#[derive(Debug, Clone)]
pub struct RawItem {
    pub name: String,
    pub mime: Option<String>,
    pub size: u64,
    pub body: RawBody,
    pub thumbnail_url: Option<String>,
    pub source: AdapterId,
}

impl RawItem {
    pub fn from_path(path: &Path, source: AdapterId) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(Self {
            name,
            mime: None,
            size: metadata.len(),
            body: RawBody::Path(path.to_path_buf()),
            thumbnail_url: None,
            source,
        })
    }

    pub fn from_bytes(
        name: impl Into<String>,
        mime: Option<String>,
        bytes: impl Into<Arc<[u8]>>,
        source: AdapterId,
    ) -> Self {
        let bytes = bytes.into();
        Self {
            name: name.into(),
            mime,
            size: bytes.len() as u64,
            body: RawBody::Bytes(bytes),
            thumbnail_url: None,
            source,
        }
    }

    pub fn with_thumbnail(mut self, thumbnail_url: Option<String>) -> Self {
        self.thumbnail_url = thumbnail_url;
        self
    }
}
