mod dropzone;

pub use dropzone::{DragController, DropRegion};

use crate::adapters::AdapterId;
use crate::config::WidgetConfig;
use crate::events::{EventSink, UploaderEvent};
use crate::files::{BlobStore, ManagedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Nothing chosen yet; the adapter selector is shown.
    Browsing,
    AdapterActive(AdapterId),
    Previewing,
    /// Files are staged but the selector is shown again.
    AddingMore,
}

/// Result of appending files to the selection.
#[derive(Debug, Default)]
pub struct AppendOutcome {
    pub accepted: Vec<String>,
    pub dropped: Vec<String>,
}

/// The staged files plus which part of the widget has focus.
#[derive(Debug)]
pub struct SelectionState {
    files: Vec<ManagedFile>,
    active_adapter: Option<AdapterId>,
    adding_more: bool,
    limit: Option<usize>,
    mini: bool,
    blobs: BlobStore,
    events: EventSink,
}

impl SelectionState {
    pub fn new(config: &WidgetConfig, blobs: BlobStore, events: EventSink) -> Self {
        Self {
            files: Vec::new(),
            active_adapter: None,
            adding_more: false,
            limit: config.limit,
            mini: config.mini,
            blobs,
            events,
        }
    }

    pub fn view(&self) -> View {
        match self.active_adapter {
            Some(id) => View::AdapterActive(id),
            None if self.files.is_empty() => View::Browsing,
            None if self.adding_more => View::AddingMore,
            None => View::Previewing,
        }
    }

    pub fn files(&self) -> &[ManagedFile] {
        &self.files
    }

    pub fn get(&self, file_id: &str) -> Option<&ManagedFile> {
        self.files.iter().find(|f| f.id == file_id)
    }

    pub fn get_mut(&mut self, file_id: &str) -> Option<&mut ManagedFile> {
        self.files.iter_mut().find(|f| f.id == file_id)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn active_adapter(&self) -> Option<AdapterId> {
        self.active_adapter
    }

    /// Room left before the file-count cap, `None` when uncapped.
    pub fn remaining_quota(&self) -> Option<usize> {
        if self.mini {
            return Some(1usize.saturating_sub(self.files.len()));
        }
        self.limit.map(|limit| limit.saturating_sub(self.files.len()))
    }

    /// Opens an adapter's browser. The device picker has no browser of its own.
    pub fn choose(&mut self, adapter: AdapterId) {
        if adapter != AdapterId::Internal {
            tracing::debug!(adapter = adapter.as_str(), "adapter opened");
            self.active_adapter = Some(adapter);
        }
    }

    pub fn cancel(&mut self) {
        if self.active_adapter.take().is_none() {
            self.adding_more = false;
        }
    }

    pub fn add_more(&mut self) {
        if !self.files.is_empty() {
            self.adding_more = true;
        }
    }

    /// Appends files in encounter order up to the remaining quota; the rest are released
    /// and reported with a single warning. In mini mode the new file replaces the old one.
    pub fn confirm(&mut self, files: Vec<ManagedFile>) -> AppendOutcome {
        let mut outcome = AppendOutcome::default();
        self.active_adapter = None;
        self.adding_more = false;

        if files.is_empty() {
            return outcome;
        }

        if self.mini {
            let previous: Vec<String> = self.files.iter().map(|f| f.id.clone()).collect();
            for id in previous {
                self.remove(&id);
            }
        }

        let quota = self.remaining_quota().unwrap_or(usize::MAX);
        for (index, file) in files.into_iter().enumerate() {
            if index < quota {
                outcome.accepted.push(file.id.clone());
                self.files.push(file);
            } else {
                self.blobs.revoke(&file.content_url);
                outcome.dropped.push(file.name);
            }
        }

        if !outcome.dropped.is_empty() {
            self.events.warn(format!(
                "{} file(s) were not added because the limit of {} file(s) was reached: {}",
                outcome.dropped.len(),
                self.limit.filter(|_| !self.mini).unwrap_or(1),
                outcome.dropped.join(", ")
            ));
        }

        tracing::info!(
            accepted = outcome.accepted.len(),
            dropped = outcome.dropped.len(),
            total = self.files.len(),
            "selection updated"
        );
        outcome
    }

    /// Removes a file and releases its content. Removing an unknown id does nothing.
    pub fn remove(&mut self, file_id: &str) -> Option<ManagedFile> {
        let index = self.files.iter().position(|f| f.id == file_id)?;
        let file = self.files.remove(index);
        self.blobs.revoke(&file.content_url);
        self.events.emit(UploaderEvent::FileRemoved {
            file_id: file.id.clone(),
        });

        if self.files.is_empty() {
            self.adding_more = false;
        }
        Some(file)
    }

    pub fn reset(&mut self) {
        tracing::info!("Resetting selection");
        for file in self.files.drain(..) {
            self.blobs.revoke(&file.content_url);
        }
        self.active_adapter = None;
        self.adding_more = false;
    }
}
