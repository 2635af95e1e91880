mod camera;
mod drive;
mod dropbox;
mod google_drive;
mod link;
mod local;
mod one_drive;
mod registry;

pub use camera::{CameraAdapter, CaptureDevice, CapturedFrame, CommandCaptureDevice};
pub use drive::{DriveEntry, DriveListing};
pub use dropbox::DropboxAdapter;
pub use google_drive::GoogleDriveAdapter;
pub use link::LinkAdapter;
pub use local::LocalAdapter;
pub use one_drive::OneDriveAdapter;
pub use registry::{AdapterDescriptor, AdapterRegistry};

use crate::error::{Result, UploaderError};
use crate::files::RawItem;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdapterId {
    Internal,
    GoogleDrive,
    OneDrive,
    Dropbox,
    Link,
    Camera,
}

impl AdapterId {
    pub const ALL: [AdapterId; 6] = [
        AdapterId::Internal,
        AdapterId::GoogleDrive,
        AdapterId::OneDrive,
        AdapterId::Dropbox,
        AdapterId::Link,
        AdapterId::Camera,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AdapterId::Internal => "INTERNAL",
            AdapterId::GoogleDrive => "GOOGLE_DRIVE",
            AdapterId::OneDrive => "ONE_DRIVE",
            AdapterId::Dropbox => "DROPBOX",
            AdapterId::Link => "LINK",
            AdapterId::Camera => "CAMERA",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            AdapterId::Internal => "My Device",
            AdapterId::GoogleDrive => "Google Drive",
            AdapterId::OneDrive => "OneDrive",
            AdapterId::Dropbox => "Dropbox",
            AdapterId::Link => "Link",
            AdapterId::Camera => "Camera",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            AdapterId::Internal => "💻",
            AdapterId::GoogleDrive => "🟢",
            AdapterId::OneDrive => "☁",
            AdapterId::Dropbox => "📦",
            AdapterId::Link => "🔗",
            AdapterId::Camera => "📷",
        }
    }

    /// Sources with a hierarchical browser that needs a signed-in account.
    pub fn is_cloud_drive(self) -> bool {
        matches!(
            self,
            AdapterId::GoogleDrive | AdapterId::OneDrive | AdapterId::Dropbox
        )
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// An entry that could not be downloaded.
#[derive(Debug)]
pub struct FetchFailure {
    pub name: String,
    pub error: UploaderError,
}

/// Outcome of downloading several entries: what arrived and what did not.
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub items: Vec<RawItem>,
    pub failures: Vec<FetchFailure>,
}

impl FetchBatch {
    pub fn needs_sign_in(&self) -> bool {
        self.failures
            .iter()
            .any(|f| matches!(f.error, UploaderError::AdapterAuth { .. }))
    }
}

/// One file source. Every variant can list what it offers and fetch a listed entry.
#[derive(Clone)]
pub enum Adapter {
    Internal(LocalAdapter),
    GoogleDrive(GoogleDriveAdapter),
    OneDrive(OneDriveAdapter),
    Dropbox(DropboxAdapter),
    Link(LinkAdapter),
    Camera(CameraAdapter),
}

impl Adapter {
    pub fn id(&self) -> AdapterId {
        match self {
            Adapter::Internal(_) => AdapterId::Internal,
            Adapter::GoogleDrive(_) => AdapterId::GoogleDrive,
            Adapter::OneDrive(_) => AdapterId::OneDrive,
            Adapter::Dropbox(_) => AdapterId::Dropbox,
            Adapter::Link(_) => AdapterId::Link,
            Adapter::Camera(_) => AdapterId::Camera,
        }
    }

    /// Lists a folder (`None` is the root). For a link the "folder" is the URL itself.
    pub async fn browse(&self, folder: Option<&str>) -> Result<DriveListing> {
        match self {
            Adapter::Internal(adapter) => adapter.browse(folder),
            Adapter::GoogleDrive(adapter) => adapter.browse(folder).await,
            Adapter::OneDrive(adapter) => adapter.browse(folder).await,
            Adapter::Dropbox(adapter) => adapter.browse(folder).await,
            Adapter::Link(adapter) => adapter.browse(folder),
            Adapter::Camera(adapter) => Ok(adapter.browse()),
        }
    }

    pub async fn fetch(&self, entry: &DriveEntry) -> Result<RawItem> {
        match self {
            Adapter::Internal(adapter) => adapter.fetch(entry),
            Adapter::GoogleDrive(adapter) => adapter.fetch(entry).await,
            Adapter::OneDrive(adapter) => adapter.fetch(entry).await,
            Adapter::Dropbox(adapter) => adapter.fetch(entry).await,
            Adapter::Link(adapter) => adapter.fetch(entry).await,
            Adapter::Camera(adapter) => adapter.fetch(),
        }
    }

    /// Fetches entries one after another. A failed download is recorded and the rest still run.
    pub async fn fetch_all(&self, entries: &[DriveEntry]) -> FetchBatch {
        let mut batch = FetchBatch::default();
        for entry in entries.iter().filter(|e| !e.is_folder) {
            match self.fetch(entry).await {
                Ok(item) => batch.items.push(item),
                Err(error) => {
                    tracing::warn!(adapter = self.id().as_str(), name = %entry.name, "download failed: {}", error);
                    batch.failures.push(FetchFailure {
                        name: entry.name.clone(),
                        error,
                    });
                }
            }
        }
        batch
    }

    /// Stores a token obtained from the provider's sign-in flow.
    pub fn set_access_token(&mut self, token: String) {
        match self {
            Adapter::GoogleDrive(adapter) => adapter.set_access_token(token),
            Adapter::OneDrive(adapter) => adapter.set_access_token(token),
            Adapter::Dropbox(adapter) => adapter.set_access_token(token),
            _ => {}
        }
    }
}
