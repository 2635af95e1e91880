use crate::files::ManagedFile;
use std::sync::mpsc::{channel, Receiver, Sender};

/// Lifecycle notifications delivered to the host application.
#[derive(Debug, Clone)]
pub enum UploaderEvent {
    FileDragOver,
    FileDragLeave,
    FileDrop { count: usize },
    FileTypeMismatch { name: String, mime: String },
    FileSizeExceeded { name: String, size: u64, max: u64 },
    FileRemoved { file_id: String },
    FileUploadStart { file_id: String, name: String },
    FileUploadProgress { file_id: String, loaded: u64, total: u64, percentage: u8 },
    FileUploadComplete { file: ManagedFile },
    FileUploadError { file_id: String, name: String, reason: String },
    TotalUploadProgress { percentage: u8 },
    FilesUploadComplete { files: Vec<ManagedFile> },
    Error(String),
    Warning(String),
}

/// Cloneable sending half handed to everything that reports to the host.
#[derive(Debug, Clone)]
pub struct EventSink {
    sender: Sender<UploaderEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, Receiver<UploaderEvent>) {
        let (sender, receiver) = channel();
        (Self { sender }, receiver)
    }

    /// Drops the event when the host has gone away.
    pub fn emit(&self, event: UploaderEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("event receiver dropped");
        }
    }

    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.emit(UploaderEvent::Warning(message));
    }

    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.emit(UploaderEvent::Error(message));
    }
}
