use crate::adapters::drive::{check_status, require_token, trim_base};
use crate::adapters::{AdapterId, DriveEntry, DriveListing};
use crate::config::DriveCredentials;
use crate::error::Result;
use crate::files::RawItem;
use serde::Deserialize;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
const NATIVE_PREFIX: &str = "application/vnd.google-apps.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DriveFile {
    id: String,
    name: String,
    mime_type: String,
    /// Drive reports sizes as decimal strings.
    size: Option<String>,
    thumbnail_link: Option<String>,
}

impl From<DriveFile> for DriveEntry {
    fn from(file: DriveFile) -> Self {
        let is_folder = file.mime_type == FOLDER_MIME;
        DriveEntry {
            id: file.id,
            name: file.name,
            size: file.size.and_then(|s| s.parse().ok()),
            mime: (!is_folder).then_some(file.mime_type),
            is_folder,
            thumbnail_url: file.thumbnail_link,
            path: None,
        }
    }
}

#[derive(Clone)]
pub struct GoogleDriveAdapter {
    client: reqwest::Client,
    api_base: String,
    access_token: Option<String>,
}

impl GoogleDriveAdapter {
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
        let token = require_token(AdapterId::GoogleDrive, &self.access_token)?;
        let parent = folder.unwrap_or("root");
        let query = format!("'{}' in parents and trashed = false", parent.replace('\'', "\\'"));
        let url = format!("{}/drive/v3/files", self.api_base);

        let mut entries = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.clone()),
                (
                    "fields",
                    "nextPageToken,files(id,name,mimeType,size,thumbnailLink)".to_string(),
                ),
                ("pageSize", "100".to_string()),
            ];
            if let Some(page) = &page_token {
                params.push(("pageToken", page.clone()));
            }

            let response = self
                .client
                .get(&url)
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await?;
            let list: FileList = check_status(AdapterId::GoogleDrive, response)
                .await?
                .json()
                .await?;

            entries.extend(list.files.into_iter().map(DriveEntry::from));
            match list.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        tracing::debug!(folder = parent, count = entries.len(), "listed google drive folder");
        Ok(DriveListing {
            folder: folder.map(str::to_string),
            entries,
        }
        .sorted())
    }

    pub async fn fetch(&self, entry: &DriveEntry) -> Result<RawItem> {
        let token = require_token(AdapterId::GoogleDrive, &self.access_token)?;
        let native = entry
            .mime
            .as_deref()
            .is_some_and(|m| m.starts_with(NATIVE_PREFIX));

        // Docs, Sheets and Slides have no binary body; export them as PDF.
        let (request, name, mime) = if native {
            (
                self.client
                    .get(format!("{}/drive/v3/files/{}/export", self.api_base, entry.id))
                    .query(&[("mimeType", "application/pdf")]),
                format!("{}.pdf", entry.name),
                Some("application/pdf".to_string()),
            )
        } else {
            (
                self.client
                    .get(format!("{}/drive/v3/files/{}", self.api_base, entry.id))
                    .query(&[("alt", "media")]),
                entry.name.clone(),
                entry.mime.clone(),
            )
        };

        let response = request.bearer_auth(&token).send().await?;
        let bytes = check_status(AdapterId::GoogleDrive, response)
            .await?
            .bytes()
            .await?;

        tracing::info!(file = %name, size = bytes.len(), "downloaded from google drive");
        Ok(RawItem::from_bytes(name, mime, bytes.to_vec(), AdapterId::GoogleDrive)
            .with_thumbnail(entry.thumbnail_url.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UploaderError;
    use mockito::Matcher;

    fn adapter(server: &mockito::Server, token: Option<&str>) -> GoogleDriveAdapter {
        GoogleDriveAdapter::new(&DriveCredentials {
            client_id: "client".into(),
            access_token: token.map(str::to_string),
            api_base: Some(server.url()),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn lists_folders_before_files() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/drive/v3/files")
            .match_query(Matcher::UrlEncoded(
                "q".into(),
                "'root' in parents and trashed = false".into(),
            ))
            .match_header("authorization", "Bearer token")
            .with_body(
                r#"{"files":[
                    {"id":"2","name":"b.png","mimeType":"image/png","size":"42"},
                    {"id":"1","name":"Photos","mimeType":"application/vnd.google-apps.folder"}
                ]}"#,
            )
            .create_async()
            .await;

        let listing = adapter(&server, Some("token")).browse(None).await.unwrap();
        mock.assert_async().await;

        assert_eq!(listing.entries.len(), 2);
        assert!(listing.entries[0].is_folder);
        assert_eq!(listing.entries[1].size, Some(42));
        assert_eq!(listing.entries[1].mime.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn missing_token_is_an_auth_error() {
        let server = mockito::Server::new_async().await;
        let err = adapter(&server, None).browse(None).await.unwrap_err();
        assert!(matches!(
            err,
            UploaderError::AdapterAuth {
                adapter: AdapterId::GoogleDrive,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn exports_native_documents_as_pdf() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/drive/v3/files/doc1/export")
            .match_query(Matcher::UrlEncoded("mimeType".into(), "application/pdf".into()))
            .with_body("%PDF-1.4")
            .create_async()
            .await;

        let mut entry = DriveEntry::file("doc1", "Plan");
        entry.mime = Some("application/vnd.google-apps.document".into());

        let item = adapter(&server, Some("token")).fetch(&entry).await.unwrap();
        mock.assert_async().await;
        assert_eq!(item.name, "Plan.pdf");
        assert_eq!(item.mime.as_deref(), Some("application/pdf"));
        assert_eq!(item.size, 8);
    }
}
