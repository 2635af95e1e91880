use crate::upload::UploadProgressEntry;
use std::collections::HashMap;

/// Per-file entries plus the batch-level percentage.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    entries: HashMap<String, UploadProgressEntry>,
    total_files: usize,
    completed: usize,
    total_percentage: u8,
}

impl ProgressTracker {
    pub fn new(total_files: usize) -> Self {
        Self {
            total_files,
            ..Default::default()
        }
    }

    pub fn start(&mut self, file_id: &str, total: u64) {
        self.entries
            .insert(file_id.to_string(), UploadProgressEntry::new(file_id, total));
    }

    /// Returns the updated entry when `loaded` actually moved forward.
    pub fn advance(&mut self, file_id: &str, loaded: u64) -> Option<&UploadProgressEntry> {
        let entry = self.entries.get_mut(file_id)?;
        if entry.advance(loaded) {
            Some(&*entry)
        } else {
            None
        }
    }

    /// Marks a file done and returns the new batch percentage.
    pub fn complete(&mut self, file_id: &str) -> u8 {
        if let Some(entry) = self.entries.get_mut(file_id) {
            if !entry.is_complete() {
                entry.finish();
                self.completed += 1;
            }
        }

        if self.total_files > 0 {
            let percentage = (self.completed.min(self.total_files) * 100 / self.total_files) as u8;
            self.total_percentage = self.total_percentage.max(percentage);
        }
        self.total_percentage
    }

    pub fn remove(&mut self, file_id: &str) -> Option<UploadProgressEntry> {
        self.entries.remove(file_id)
    }

    pub fn get(&self, file_id: &str) -> Option<&UploadProgressEntry> {
        self.entries.get(file_id)
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn total_percentage(&self) -> u8 {
        self.total_percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_progress_counts_completed_files() {
        let mut tracker = ProgressTracker::new(3);
        tracker.start("a", 10);
        tracker.start("b", 10);

        assert_eq!(tracker.advance("a", 5).map(|e| e.percentage()), Some(50));
        assert!(tracker.advance("a", 5).is_none());
        assert!(tracker.advance("missing", 5).is_none());

        assert_eq!(tracker.complete("a"), 33);
        assert_eq!(tracker.complete("a"), 33);
        assert_eq!(tracker.complete("b"), 66);
        assert_eq!(tracker.completed(), 2);
        assert_eq!(tracker.get("b").map(|e| e.loaded), Some(10));
    }

    #[test]
    fn removing_entry_keeps_batch_progress() {
        let mut tracker = ProgressTracker::new(2);
        tracker.start("a", 1);
        tracker.complete("a");
        assert!(tracker.remove("a").is_some());
        assert_eq!(tracker.total_percentage(), 50);
    }
}
