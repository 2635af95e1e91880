use crate::config::WidgetConfig;
use crate::error::ValidationError;
use crate::events::{EventSink, UploaderEvent};
use crate::files::{AcceptPattern, BlobStore, ManagedFile, RawItem};
use crate::preview::PreviewStrategy;

const FALLBACK_MIME: &str = "application/octet-stream";

/// Turns adapter output into [`ManagedFile`]s, enforcing the accept pattern and size limits.
#[derive(Debug, Clone)]
pub struct Normalizer {
    accept: AcceptPattern,
    config: WidgetConfig,
    blobs: BlobStore,
}

impl Normalizer {
    pub fn new(config: &WidgetConfig, blobs: BlobStore) -> Self {
        Self {
            accept: AcceptPattern::from_config(config.accept.as_deref()),
            config: config.clone(),
            blobs,
        }
    }

    pub fn accept(&self) -> &AcceptPattern {
        &self.accept
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }

    /// Resolves the MIME type, preferring what the source reported.
    pub fn resolve_mime(name: &str, reported: Option<&str>) -> String {
        reported
            .map(str::trim)
            .filter(|m| !m.is_empty() && *m != FALLBACK_MIME)
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(name).first_raw().map(str::to_string))
            .or_else(|| reported.map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MIME.to_string())
    }

    pub fn validate(&self, item: &RawItem, mime: &str) -> Result<(), ValidationError> {
        if !self.accept.matches(&item.name, mime) {
            return Err(ValidationError::TypeMismatch {
                name: item.name.clone(),
                mime: mime.to_string(),
                accept: self.accept.as_str().to_string(),
            });
        }

        if let Some(max) = self.config.max_bytes_for(item.source) {
            if item.size > max {
                return Err(ValidationError::SizeExceeded {
                    name: item.name.clone(),
                    size: item.size,
                    max,
                });
            }
        }

        Ok(())
    }

    /// Validates and registers one item. Allocates a content reference on success.
    pub fn normalize(&self, item: RawItem) -> Result<ManagedFile, ValidationError> {
        let mime = Self::resolve_mime(&item.name, item.mime.as_deref());
        self.validate(&item, &mime)?;

        let previewable = PreviewStrategy::for_file(&item.name, &mime).is_inline();
        let content_url = self.blobs.register(item.body.into());

        Ok(ManagedFile {
            id: uuid::Uuid::new_v4().to_string(),
            name: item.name,
            mime,
            size: item.size,
            content_url,
            thumbnail_url: item.thumbnail_url,
            source: Some(item.source),
            previewable,
            key: None,
            public_url: None,
        })
    }

    /// Normalizes a batch, reporting each rejected item to the host and keeping encounter order.
    pub fn normalize_all(&self, items: Vec<RawItem>, events: &EventSink) -> Vec<ManagedFile> {
        let mut files = Vec::with_capacity(items.len());

        for item in items {
            match self.normalize(item) {
                Ok(file) => files.push(file),
                Err(e) => report_rejection(&e, events),
            }
        }

        files
    }
}

pub(crate) fn report_rejection(error: &ValidationError, events: &EventSink) {
    tracing::info!(file = error.file_name(), "rejected file: {}", error);
    match error {
        ValidationError::TypeMismatch { name, mime, .. } => {
            events.emit(UploaderEvent::FileTypeMismatch {
                name: name.clone(),
                mime: mime.clone(),
            })
        }
        ValidationError::SizeExceeded { name, size, max } => {
            events.emit(UploaderEvent::FileSizeExceeded {
                name: name.clone(),
                size: *size,
                max: *max,
            })
        }
    }
}
