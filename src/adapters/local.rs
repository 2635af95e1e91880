use crate::adapters::{AdapterId, DriveEntry, DriveListing};
use crate::error::{Result, UploaderError};
use crate::files::{AcceptPattern, RawItem};
use ignore::{Walk, WalkBuilder};
use rfd::FileDialog;
use std::path::{Path, PathBuf};

/// Files from the local machine: native dialog, dropped paths and folder expansion.
#[derive(Clone, Default)]
pub struct LocalAdapter {
    accept: AcceptPattern,
    multiple: bool,
    root: Option<PathBuf>,
}

impl LocalAdapter {
    pub fn new(accept: AcceptPattern, multiple: bool) -> Self {
        Self {
            accept,
            multiple,
            root: None,
        }
    }

    /// Sets the folder listed when browsing starts.
    pub fn with_root(mut self, root: Option<PathBuf>) -> Self {
        self.root = root;
        self
    }

    /// Blocks on the native file dialog. An empty result means the user cancelled.
    pub fn pick(&self) -> Vec<PathBuf> {
        let mut dialog = FileDialog::new();
        if !self.accept.extensions().is_empty() {
            dialog = dialog.add_filter("Accepted files", self.accept.extensions());
        }

        if self.multiple {
            dialog.pick_files().unwrap_or_default()
        } else {
            dialog.pick_file().into_iter().collect()
        }
    }

    pub fn pick_folder(&self) -> Vec<PathBuf> {
        FileDialog::new().pick_folder().into_iter().collect()
    }

    /// Replaces directories by the files under them, honouring `.gitignore`. Order is kept.
    pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for path in paths {
            if path.is_dir() {
                for entry in Walk::new(path) {
                    match entry {
                        Ok(entry) if entry.path().is_file() => files.push(entry.path().to_path_buf()),
                        Ok(_) => {}
                        Err(e) => tracing::warn!("Error walking directory: {}", e),
                    }
                }
            } else {
                files.push(path.clone());
            }
        }
        files
    }

    /// Reads metadata for each path. Unreadable paths are logged and left out.
    pub fn to_raw_items(paths: &[PathBuf]) -> Vec<RawItem> {
        Self::expand_paths(paths)
            .iter()
            .filter_map(|path| match RawItem::from_path(path, AdapterId::Internal) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(path = %path.display(), "skipping unreadable file: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Lists one directory level; `None` is the configured root.
    pub fn browse(&self, folder: Option<&str>) -> Result<DriveListing> {
        let root = match folder {
            Some(folder) => PathBuf::from(folder),
            None => self.root.clone().ok_or_else(|| {
                UploaderError::adapter(AdapterId::Internal, "no root folder configured")
            })?,
        };

        let mut entries = Vec::new();
        for entry in WalkBuilder::new(&root).max_depth(Some(1)).build() {
            let entry = match entry {
                Ok(entry) if entry.depth() > 0 => entry,
                Ok(_) => continue,
                Err(e) => {
                    tracing::warn!("Error walking directory: {}", e);
                    continue;
                }
            };
            entries.push(entry_for(entry.path()));
        }

        Ok(DriveListing {
            folder: Some(root.display().to_string()),
            entries,
        }
        .sorted())
    }

    pub fn fetch(&self, entry: &DriveEntry) -> Result<RawItem> {
        let path = entry.path.as_deref().unwrap_or(&entry.id);
        Ok(RawItem::from_path(Path::new(path), AdapterId::Internal)?)
    }
}

fn entry_for(path: &Path) -> DriveEntry {
    let display = path.display().to_string();
    let mut entry = DriveEntry::file(
        display.clone(),
        path.file_name().unwrap_or_default().to_string_lossy(),
    );
    entry.is_folder = path.is_dir();
    entry.size = path.metadata().ok().filter(|m| m.is_file()).map(|m| m.len());
    entry.path = Some(display);
    entry
}
