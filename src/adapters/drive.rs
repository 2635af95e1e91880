use crate::adapters::AdapterId;
use crate::error::{Result, UploaderError};
use reqwest::Response;

/// A provider record reduced to the fields the widget cares about.
#[derive(Debug, Clone, PartialEq)]
pub struct DriveEntry {
    pub id: String,
    pub name: String,
    pub mime: Option<String>,
    pub size: Option<u64>,
    pub is_folder: bool,
    pub thumbnail_url: Option<String>,
    /// Provider path or URL used to fetch the entry, when the id alone is not enough.
    pub path: Option<String>,
}

impl DriveEntry {
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime: None,
            size: None,
            is_folder: false,
            thumbnail_url: None,
            path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveListing {
    pub folder: Option<String>,
    pub entries: Vec<DriveEntry>,
}

impl DriveListing {
    /// Folders first, then files, each group by name.
    pub fn sorted(mut self) -> Self {
        self.entries.sort_by(|a, b| {
            b.is_folder
                .cmp(&a.is_folder)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });
        self
    }
}

pub(crate) fn require_token(adapter: AdapterId, token: &Option<String>) -> Result<String> {
    token
        .as_ref()
        .filter(|t| !t.trim().is_empty())
        .cloned()
        .ok_or_else(|| UploaderError::auth(adapter, "sign in required"))
}

pub(crate) async fn check_status(adapter: AdapterId, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    tracing::warn!(%adapter, %status, "drive request failed");
    Err(UploaderError::from_status(adapter, status, &body))
}

pub(crate) fn trim_base(base: &str) -> String {
    base.trim_end_matches('/').to_string()
}
