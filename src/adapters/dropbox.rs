use crate::adapters::drive::{check_status, require_token, trim_base};
use crate::adapters::{AdapterId, DriveEntry, DriveListing};
use crate::config::DriveCredentials;
use crate::error::{Result, UploaderError};
use crate::files::RawItem;
use serde::Deserialize;
use serde_json::json;

const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";

#[derive(Deserialize)]
struct ListFolderResult {
    entries: Vec<Metadata>,
    cursor: String,
    has_more: bool,
}

#[derive(Deserialize)]
struct Metadata {
    #[serde(rename = ".tag")]
    tag: String,
    #[serde(default)]
    id: String,
    name: String,
    path_lower: Option<String>,
    size: Option<u64>,
}

#[derive(Deserialize)]
struct TemporaryLink {
    link: String,
}

impl From<Metadata> for DriveEntry {
    fn from(meta: Metadata) -> Self {
        DriveEntry {
            id: meta.id,
            mime: None,
            size: meta.size,
            is_folder: meta.tag == "folder",
            thumbnail_url: None,
            path: meta.path_lower,
            name: meta.name,
        }
    }
}

#[derive(Clone)]
pub struct DropboxAdapter {
    client: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
}

impl DropboxAdapter {
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

    async fn rpc<T: for<'de> Deserialize<'de>>(
        &self,
        token: &str,
        endpoint: &str,
        body: serde_json::Value,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}/2/{}", self.api_base, endpoint))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;

        Ok(check_status(AdapterId::Dropbox, response).await?.json().await?)
    }

    /// `folder` is a Dropbox path; the root is the empty string.
    pub async fn browse(&self, folder: Option<&str>) -> Result<DriveListing> {
        let token = require_token(AdapterId::Dropbox, &self.access_token)?;

        let mut page: ListFolderResult = self
            .rpc(
                &token,
                "files/list_folder",
                json!({ "path": folder.unwrap_or(""), "include_media_info": false }),
            )
            .await?;
        let mut entries: Vec<DriveEntry> = page.entries.drain(..).map(DriveEntry::from).collect();

        while page.has_more {
            page = self
                .rpc(
                    &token,
                    "files/list_folder/continue",
                    json!({ "cursor": page.cursor }),
                )
                .await?;
            entries.extend(page.entries.drain(..).map(DriveEntry::from));
        }

        // Folders are addressed by path, not id.
        for entry in entries.iter_mut().filter(|e| e.is_folder) {
            if let Some(path) = &entry.path {
                entry.id = path.clone();
            }
        }

        tracing::debug!(folder = ?folder, count = entries.len(), "listed dropbox folder");
        Ok(DriveListing {
            folder: folder.map(str::to_string),
            entries,
        }
        .sorted())
    }

    /// Downloads through a short-lived link issued by Dropbox.
    pub async fn fetch(&self, entry: &DriveEntry) -> Result<RawItem> {
        let token = require_token(AdapterId::Dropbox, &self.access_token)?;
        let path = entry.path.clone().unwrap_or_else(|| entry.id.clone());

        let link: TemporaryLink = self
            .rpc(&token, "files/get_temporary_link", json!({ "path": path }))
            .await
            .map_err(|e| match e {
                UploaderError::AdapterAuth { .. } => e,
                other => UploaderError::TemporaryCredentials(other.to_string()),
            })?;

        let response = self.client.get(&link.link).send().await?;
        let bytes = check_status(AdapterId::Dropbox, response)
            .await?
            .bytes()
            .await?;

        tracing::info!(file = %entry.name, size = bytes.len(), "downloaded from dropbox");
        Ok(RawItem::from_bytes(
            entry.name.clone(),
            entry.mime.clone(),
            bytes.to_vec(),
            AdapterId::Dropbox,
        ))
    }
}
