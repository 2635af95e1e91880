use crate::adapters::{Adapter, AdapterId, DriveEntry, DriveListing, FetchBatch};
use crate::error::Result;
use crate::events::UploaderEvent;
use crate::files::ManagedFile;
use crate::preview::PreviewContent;
use crate::upload::{FileStatus, UploadStatus};
use derivative::Derivative;
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ActionProgress {
    #[default]
    NotStarted,
    Uploading {
        total: usize,
        current: usize,
        successful: usize,
        failed: usize,
        skipped: usize,
    },
    Completed {
        total: usize,
        successful: usize,
        failed: usize,
        skipped: usize,
    },
}

/// Results handed back by background jobs.
pub enum JobResult {
    Listing {
        adapter: AdapterId,
        result: Result<DriveListing>,
    },
    Fetched {
        adapter: AdapterId,
        batch: FetchBatch,
    },
    Preview {
        file_id: String,
        result: Result<PreviewContent>,
    },
    Uploaded(Vec<ManagedFile>),
}

/// Everything shown about the current or last upload batch.
#[derive(Debug, Default)]
pub struct UploadState {
    pub progress: ActionProgress,
    pub current_file: Option<String>,
    pub file_statuses: Vec<FileStatus>,
    pub file_progress: HashMap<String, u8>,
    pub total_percentage: u8,
    pub uploaded_files: Vec<ManagedFile>,
    pub error_message: Option<String>,
    pub warning_message: Option<String>,
    pub show_details: bool,
    pub is_uploading: bool,
}

impl UploadState {
    pub fn clear(&mut self) {
        *self = UploadState::default();
    }

    pub fn begin(&mut self, total: usize) {
        self.clear();
        self.is_uploading = true;
        self.progress = ActionProgress::Uploading {
            total,
            current: 0,
            successful: 0,
            failed: 0,
            skipped: 0,
        };
    }

    fn set_status(&mut self, file_id: &str, name: &str, status: UploadStatus) {
        match self.file_statuses.iter_mut().find(|s| s.file_id == file_id) {
            Some(existing) => existing.status = status,
            None => self.file_statuses.push(FileStatus {
                file_id: file_id.to_string(),
                name: name.to_string(),
                status,
            }),
        }
    }

    fn count(&mut self, status: &UploadStatus) {
        if let ActionProgress::Uploading {
            current,
            successful,
            failed,
            skipped,
            ..
        } = &mut self.progress
        {
            match status {
                UploadStatus::Pending => {}
                UploadStatus::Uploading => *current += 1,
                UploadStatus::Success => *successful += 1,
                UploadStatus::Error(_) => *failed += 1,
                UploadStatus::Skipped(_) => {
                    *current += 1;
                    *skipped += 1;
                }
            }
        }
    }

    /// Folds one lifecycle event into the displayed state.
    pub fn apply(&mut self, event: &UploaderEvent) {
        match event {
            UploaderEvent::FileUploadStart { file_id, name } => {
                self.current_file = Some(name.clone());
                self.file_progress.insert(file_id.clone(), 0);
                self.count(&UploadStatus::Uploading);
                self.set_status(file_id, name, UploadStatus::Uploading);
            }
            UploaderEvent::FileUploadProgress {
                file_id, percentage, ..
            } => {
                self.file_progress.insert(file_id.clone(), *percentage);
            }
            UploaderEvent::FileUploadComplete { file } => {
                self.file_progress.insert(file.id.clone(), 100);
                self.count(&UploadStatus::Success);
                self.set_status(&file.id, &file.name, UploadStatus::Success);
            }
            UploaderEvent::FileUploadError {
                file_id,
                name,
                reason,
            } => {
                self.file_progress.remove(file_id);
                let status = UploadStatus::Error(reason.clone());
                self.count(&status);
                self.set_status(file_id, name, status);
            }
            UploaderEvent::TotalUploadProgress { percentage } => {
                self.total_percentage = self.total_percentage.max(*percentage);
            }
            UploaderEvent::FilesUploadComplete { files } => self.finish(files.clone()),
            UploaderEvent::FileTypeMismatch { name, mime } => {
                let reason = format!("type {} is not accepted", mime);
                self.reject(name, reason);
            }
            UploaderEvent::FileSizeExceeded { name, size, max } => {
                let reason = format!(
                    "{} exceeds the {} limit",
                    crate::utils::FileSizeUtils::format_size(*size),
                    crate::utils::FileSizeUtils::format_size(*max)
                );
                self.reject(name, reason);
            }
            UploaderEvent::FileRemoved { file_id } => {
                self.file_progress.remove(file_id);
            }
            UploaderEvent::Warning(message) => self.warning_message = Some(message.clone()),
            UploaderEvent::Error(message) => self.error_message = Some(message.clone()),
            UploaderEvent::FileDragOver
            | UploaderEvent::FileDragLeave
            | UploaderEvent::FileDrop { .. } => {}
        }
    }

    /// During an upload a rejection skips the file; otherwise it only warns.
    fn reject(&mut self, name: &str, reason: String) {
        if self.is_uploading {
            let status = UploadStatus::Skipped(reason);
            self.count(&status);
            self.file_statuses.push(FileStatus {
                file_id: String::new(),
                name: name.to_string(),
                status,
            });
        } else {
            self.warning_message = Some(format!("{} was not added: {}", name, reason));
        }
    }

    fn finish(&mut self, files: Vec<ManagedFile>) {
        if let ActionProgress::Uploading {
            total,
            successful,
            failed,
            skipped,
            ..
        } = self.progress
        {
            self.progress = ActionProgress::Completed {
                total,
                successful,
                failed,
                skipped,
            };
            if failed > 0 {
                self.error_message = Some(
                    "Upload completed with failures. Check details for more information."
                        .to_string(),
                );
            }
        }
        self.uploaded_files = files;
        self.is_uploading = false;
    }

    pub fn file_percentage(&self, file_id: &str) -> Option<u8> {
        self.file_progress.get(file_id).copied()
    }

    pub fn get_progress_percentage(&self) -> f32 {
        match &self.progress {
            ActionProgress::NotStarted => 0.0,
            ActionProgress::Uploading { .. } => self.total_percentage as f32 / 100.0,
            ActionProgress::Completed { total, .. } => {
                if *total == 0 {
                    0.0
                } else {
                    1.0
                }
            }
        }
    }

    pub fn get_status_text(&self) -> String {
        match &self.progress {
            ActionProgress::NotStarted => String::new(),
            ActionProgress::Uploading {
                total,
                current,
                successful,
                failed,
                skipped,
            } => {
                format!(
                    "Progress: {}/{} files | ✅ Success: {} | ⏩ Skipped: {} | ❌ Failed: {}",
                    current, total, successful, skipped, failed
                )
            }
            ActionProgress::Completed {
                total,
                successful,
                failed,
                skipped,
            } => {
                format!(
                    "Final Status: {}/{} files | ✅ Success: {} | ⏩ Skipped: {} | ❌ Failed: {}",
                    total, total, successful, skipped, failed
                )
            }
        }
    }
}

/// State of the adapter browser while one is open.
#[derive(Derivative, Default)]
#[derivative(Debug)]
pub struct BrowserState {
    #[derivative(Debug = "ignore")]
    pub adapter: Option<Adapter>,
    pub listing: Option<DriveListing>,
    /// Folders entered so far as `(id, name)`; empty at the root.
    pub trail: Vec<(String, String)>,
    pub selected: Vec<DriveEntry>,
    pub token_input: String,
    pub link_input: String,
    pub loading: bool,
    pub needs_sign_in: bool,
    pub error: Option<String>,
}

impl BrowserState {
    pub fn reset(&mut self) {
        *self = BrowserState::default();
    }

    pub fn current_folder(&self) -> Option<&str> {
        self.trail.last().map(|(id, _)| id.as_str())
    }

    pub fn is_selected(&self, entry: &DriveEntry) -> bool {
        self.selected.iter().any(|e| e.id == entry.id)
    }

    /// Toggles an entry. In single mode the selection holds at most one entry.
    pub fn toggle(&mut self, entry: &DriveEntry, multiple: bool) {
        if let Some(index) = self.selected.iter().position(|e| e.id == entry.id) {
            self.selected.remove(index);
        } else {
            if !multiple {
                self.selected.clear();
            }
            self.selected.push(entry.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: &str, name: &str) -> ManagedFile {
        ManagedFile {
            id: id.to_string(),
            name: name.to_string(),
            mime: "text/plain".to_string(),
            size: 3,
            content_url: format!("blob:uploader/{}", id),
            thumbnail_url: None,
            source: Some(AdapterId::Internal),
            previewable: true,
            key: Some(name.to_string()),
            public_url: Some(format!("https://cdn.example.com/{}", name)),
        }
    }

    #[test]
    fn batch_events_drive_counts_and_completion() {
        let mut state = UploadState::default();
        state.begin(3);

        state.apply(&UploaderEvent::FileUploadStart {
            file_id: "a".into(),
            name: "a.txt".into(),
        });
        state.apply(&UploaderEvent::FileUploadProgress {
            file_id: "a".into(),
            loaded: 1,
            total: 3,
            percentage: 33,
        });
        assert_eq!(state.file_percentage("a"), Some(33));

        state.apply(&UploaderEvent::FileUploadComplete { file: file("a", "a.txt") });
        state.apply(&UploaderEvent::TotalUploadProgress { percentage: 33 });
        state.apply(&UploaderEvent::FileUploadStart {
            file_id: "b".into(),
            name: "b.txt".into(),
        });
        state.apply(&UploaderEvent::FileUploadError {
            file_id: "b".into(),
            name: "b.txt".into(),
            reason: "boom".into(),
        });
        state.apply(&UploaderEvent::FileTypeMismatch {
            name: "c.exe".into(),
            mime: "application/x-msdownload".into(),
        });
        assert!((state.get_progress_percentage() - 0.33).abs() < f32::EPSILON);

        state.apply(&UploaderEvent::FilesUploadComplete {
            files: vec![file("a", "a.txt")],
        });

        assert_eq!(
            state.progress,
            ActionProgress::Completed {
                total: 3,
                successful: 1,
                failed: 1,
                skipped: 1
            }
        );
        assert!(!state.is_uploading);
        assert!(state.error_message.is_some());
        assert_eq!(state.file_statuses.len(), 3);
        assert_eq!(state.file_statuses[1].status, UploadStatus::Error("boom".into()));
        assert_eq!(state.uploaded_files.len(), 1);
    }

    #[test]
    fn rejection_outside_upload_is_a_warning() {
        let mut state = UploadState::default();
        state.apply(&UploaderEvent::FileSizeExceeded {
            name: "big.bin".into(),
            size: 2048,
            max: 1024,
        });
        assert!(state.file_statuses.is_empty());
        assert_eq!(
            state.warning_message.as_deref(),
            Some("big.bin was not added: 2.00 KB exceeds the 1.00 KB limit")
        );
    }

    #[test]
    fn single_mode_browser_keeps_one_entry() {
        let mut browser = BrowserState::default();
        let a = DriveEntry::file("1", "a.png");
        let b = DriveEntry::file("2", "b.png");

        browser.toggle(&a, false);
        browser.toggle(&b, false);
        assert_eq!(browser.selected, vec![b.clone()]);

        browser.toggle(&a, true);
        assert!(browser.is_selected(&a) && browser.is_selected(&b));
        browser.toggle(&a, true);
        assert!(!browser.is_selected(&a));
    }
}
