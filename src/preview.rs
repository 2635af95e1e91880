//! Picks how a selected file is previewed and loads the preview on demand.

use crate::error::{Result, UploaderError};
use crate::files::{BlobSource, BlobStore, ManagedFile};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TEXT_EXTENSIONS: [&str; 9] = ["txt", "md", "json", "csv", "log", "js", "ts", "css", "html"];

const TEXT_MIME_TYPES: [&str; 5] = [
    "application/json",
    "application/javascript",
    "application/xml",
    "application/x-yaml",
    "application/typescript",
];

const DOCUMENT_EXTENSIONS: [&str; 9] = ["pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "rtf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStrategy {
    Image,
    Text,
    Viewer,
}

impl PreviewStrategy {
    pub fn for_file(name: &str, mime: &str) -> Self {
        let mime = mime.to_lowercase();
        if mime.starts_with("image/") {
            return PreviewStrategy::Image;
        }

        let extension = extension_of(name);
        if mime.starts_with("text/")
            || TEXT_MIME_TYPES.contains(&mime.as_str())
            || extension
                .as_deref()
                .is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext))
        {
            return PreviewStrategy::Text;
        }

        PreviewStrategy::Viewer
    }

    /// Rendered inside the widget rather than handed to another application.
    pub fn is_inline(self) -> bool {
        matches!(self, PreviewStrategy::Image | PreviewStrategy::Text)
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}

/// Whether a file can be previewed at all. Computed eagerly, never set by the user.
pub fn can_preview(file: &ManagedFile) -> bool {
    match PreviewStrategy::for_file(&file.name, &file.mime) {
        PreviewStrategy::Image | PreviewStrategy::Text => true,
        PreviewStrategy::Viewer => file
            .extension()
            .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.as_str())),
    }
}

#[derive(Debug, Clone)]
pub enum PreviewContent {
    Image { uri: String, bytes: Arc<[u8]> },
    Text { body: String, truncated: bool },
    /// Handed to the system viewer. In-memory content is written to `temp_file` first.
    External { temp_file: Option<PathBuf> },
    /// Viewer failed; show a generic icon labelled with the file type.
    Icon { label: String },
}

/// Per-file preview toggle plus whatever has been loaded so far.
#[derive(Debug, Clone, Default)]
pub struct PreviewState {
    can_preview: bool,
    pub show_preview_portal: bool,
    pub content: Option<PreviewContent>,
}

impl PreviewState {
    pub fn for_file(file: &ManagedFile) -> Self {
        Self {
            can_preview: can_preview(file),
            show_preview_portal: false,
            content: None,
        }
    }

    pub fn can_preview(&self) -> bool {
        self.can_preview
    }

    /// Deletes the viewer copy written for this preview, if any.
    pub fn release(&mut self) {
        if let Some(PreviewContent::External {
            temp_file: Some(path),
        }) = self.content.take()
        {
            remove_temp_file(&path);
        }
    }

    /// Flips the portal; returns `true` when content still has to be loaded.
    pub fn toggle(&mut self) -> bool {
        if !self.can_preview {
            return false;
        }
        self.show_preview_portal = !self.show_preview_portal;
        self.show_preview_portal && self.content.is_none()
    }
}

/// Opens files the widget cannot render itself.
pub trait DocumentViewer: Send + Sync {
    fn open(&self, target: &str) -> std::io::Result<()>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemViewer;

impl DocumentViewer for SystemViewer {
    fn open(&self, target: &str) -> std::io::Result<()> {
        open::that(target)
    }
}

pub struct PreviewLoader {
    blobs: BlobStore,
    client: reqwest::Client,
    text_limit: usize,
    viewer: Box<dyn DocumentViewer>,
}

impl PreviewLoader {
    pub fn new(blobs: BlobStore, text_limit: usize) -> Self {
        Self::with_viewer(blobs, text_limit, Box::new(SystemViewer))
    }

    pub fn with_viewer(blobs: BlobStore, text_limit: usize, viewer: Box<dyn DocumentViewer>) -> Self {
        Self {
            blobs,
            client: reqwest::Client::new(),
            text_limit,
            viewer,
        }
    }

    pub async fn load(&self, file: &ManagedFile) -> Result<PreviewContent> {
        match PreviewStrategy::for_file(&file.name, &file.mime) {
            PreviewStrategy::Image => {
                let bytes = self.blobs.read(&file.content_url).await?;
                Ok(PreviewContent::Image {
                    uri: format!("bytes://{}/{}", file.id, file.name),
                    bytes,
                })
            }
            PreviewStrategy::Text => self.load_text(file).await,
            PreviewStrategy::Viewer => Ok(self.open_in_viewer(file)),
        }
    }

    async fn load_text(&self, file: &ManagedFile) -> Result<PreviewContent> {
        let mut body = if self.blobs.contains(&file.content_url) {
            self.blobs
                .read_prefix(&file.content_url, self.text_limit + 1)
                .await?
        } else if let Some(url) = &file.public_url {
            self.fetch_remote(url).await?
        } else {
            return Err(UploaderError::UnknownContent(file.content_url.clone()));
        };

        let truncated = body.len() > self.text_limit;
        body.truncate(self.text_limit);

        Ok(PreviewContent::Text {
            body: String::from_utf8_lossy(&body).into_owned(),
            truncated,
        })
    }

    async fn fetch_remote(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        let bytes = response.bytes().await?;
        Ok(bytes[..bytes.len().min(self.text_limit + 1)].to_vec())
    }

    fn open_in_viewer(&self, file: &ManagedFile) -> PreviewContent {
        let opened = self.viewer_target(file).and_then(|(target, temp_file)| {
            match self.viewer.open(&target) {
                Ok(()) => Ok(temp_file),
                Err(e) => {
                    if let Some(path) = &temp_file {
                        remove_temp_file(path);
                    }
                    Err(e)
                }
            }
        });

        match opened {
            Ok(temp_file) => PreviewContent::External { temp_file },
            Err(e) => {
                tracing::warn!(file = %file.name, "viewer failed, falling back to icon: {}", e);
                PreviewContent::Icon {
                    label: file
                        .extension()
                        .map(|ext| ext.to_uppercase())
                        .unwrap_or_else(|| "FILE".to_string()),
                }
            }
        }
    }

    /// What the viewer opens, plus the temporary copy made for in-memory content.
    fn viewer_target(&self, file: &ManagedFile) -> std::io::Result<(String, Option<PathBuf>)> {
        if let Some(url) = &file.public_url {
            return Ok((url.clone(), None));
        }

        match self.blobs.resolve(&file.content_url) {
            Some(BlobSource::Path(path)) => Ok((path.display().to_string(), None)),
            Some(BlobSource::Bytes(bytes)) => {
                let path: PathBuf = std::env::temp_dir().join(format!("{}-{}", file.id, file.name));
                std::fs::write(&path, &bytes[..])?;
                Ok((path.display().to_string(), Some(path)))
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "content reference was released",
            )),
        }
    }
}

fn remove_temp_file(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!(path = %path.display(), "removed viewer copy"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), "failed to remove viewer copy: {}", e),
    }
}
