use crate::adapters::drive::{check_status, require_token, trim_base};
use crate::adapters::{AdapterId, DriveEntry, DriveListing};
use crate::config::DriveCredentials;
use crate::error::Result;
use crate::files::RawItem;
use serde::Deserialize;

const DEFAULT_API_BASE: &str = "https://graph.microsoft.com/v1.0";

#[derive(Deserialize)]
struct ItemPage {
    #[serde(default)]
    value: Vec<DriveItem>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Deserialize)]
struct DriveItem {
    id: String,
    name: String,
    size: Option<u64>,
    file: Option<FileFacet>,
    folder: Option<serde_json::Value>,
    #[serde(default)]
    thumbnails: Vec<ThumbnailSet>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileFacet {
    mime_type: Option<String>,
}

#[derive(Deserialize)]
struct ThumbnailSet {
    medium: Option<Thumbnail>,
}

#[derive(Deserialize)]
struct Thumbnail {
    url: String,
}

impl From<DriveItem> for DriveEntry {
    fn from(item: DriveItem) -> Self {
        DriveEntry {
            id: item.id,
            name: item.name,
            size: item.size,
            mime: item.file.and_then(|f| f.mime_type),
            is_folder: item.folder.is_some(),
            thumbnail_url: item
                .thumbnails
                .into_iter()
                .find_map(|set| set.medium.map(|t| t.url)),
            path: None,
        }
    }
}

#[derive(Clone)]
pub struct OneDriveAdapter {
    client: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
}

impl OneDriveAdapter {
    pub fn new(credentials: &DriveCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base: trim_base(credentials.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)),
            access_token: credentials.access_token.clone(),
        }
    }

    pub fn set_access_token(&mut self, token: String) {
        self.access_token = Some(token);
    }

    pub async fn browse(&self, folder: Option<&str>) -> Result<DriveListing> {
        let token = require_token(AdapterId::OneDrive, &self.access_token)?;
        let mut next = Some(match folder {
            Some(id) => format!("{}/me/drive/items/{}/children?$expand=thumbnails", self.api_base, id),
            None => format!("{}/me/drive/root/children?$expand=thumbnails", self.api_base),
        });

        let mut entries = Vec::new();
        while let Some(url) = next.take() {
            let response = self.client.get(&url).bearer_auth(&token).send().await?;
            let page: ItemPage = check_status(AdapterId::OneDrive, response)
                .await?
                .json()
                .await?;

            entries.extend(page.value.into_iter().map(DriveEntry::from));
            next = page.next_link;
        }

        tracing::debug!(folder = ?folder, count = entries.len(), "listed onedrive folder");
        Ok(DriveListing {
            folder: folder.map(str::to_string),
            entries,
        }
        .sorted())
    }

    pub async fn fetch(&self, entry: &DriveEntry) -> Result<RawItem> {
        let token = require_token(AdapterId::OneDrive, &self.access_token)?;
        let url = format!("{}/me/drive/items/{}/content", self.api_base, entry.id);

        let response = self.client.get(&url).bearer_auth(&token).send().await?;
        let bytes = check_status(AdapterId::OneDrive, response)
            .await?
            .bytes()
            .await?;

        tracing::info!(file = %entry.name, size = bytes.len(), "downloaded from onedrive");
        Ok(
            RawItem::from_bytes(entry.name.clone(), entry.mime.clone(), bytes.to_vec(), AdapterId::OneDrive)
                .with_thumbnail(entry.thumbnail_url.clone()),
        )
    }
}
