use crate::adapters::drive::check_status;
use crate::adapters::{AdapterId, DriveEntry, DriveListing};
use crate::error::{Result, UploaderError};
use crate::files::RawItem;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

/// Fetches a single file from a user-supplied URL.
#[derive(Clone, Default)]
pub struct LinkAdapter {
    client: reqwest::Client,
}

impl LinkAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns the entered URL into a one-entry listing. No request is made.
    pub fn browse(&self, url: Option<&str>) -> Result<DriveListing> {
        let url = url.map(str::trim).filter(|u| !u.is_empty()).ok_or_else(|| {
            UploaderError::adapter(AdapterId::Link, "enter a URL to import")
        })?;
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| UploaderError::adapter(AdapterId::Link, format!("invalid URL: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(UploaderError::adapter(
                AdapterId::Link,
                "only http and https links are supported",
            ));
        }

        let mut entry = DriveEntry::file(url, name_from_url(&parsed));
        entry.path = Some(url.to_string());

        Ok(DriveListing {
            folder: None,
            entries: vec![entry],
        })
    }

    pub async fn fetch(&self, entry: &DriveEntry) -> Result<RawItem> {
        let url = entry.path.as_deref().unwrap_or(&entry.id);
        let response = self.client.get(url).send().await?;
        let response = check_status(AdapterId::Link, response).await?;

        let headers = response.headers();
        let mime = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());
        let name = headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition)
            .unwrap_or_else(|| entry.name.clone());

        let bytes = response.bytes().await?;
        tracing::info!(url, file = %name, size = bytes.len(), "fetched file from link");
        Ok(RawItem::from_bytes(name, mime, bytes.to_vec(), AdapterId::Link))
    }
}

fn name_from_url(url: &reqwest::Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string)
        .unwrap_or_else(|| "download".to_string())
}

fn filename_from_disposition(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let (key, name) = part.split_once('=')?;
        if !key.trim().eq_ignore_ascii_case("filename") {
            return None;
        }
        let name = name.trim().trim_matches('"');
        (!name.is_empty()).then(|| name.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browse_derives_name_from_last_segment() {
        let listing = LinkAdapter::new()
            .browse(Some("https://example.com/files/report.pdf?dl=1"))
            .unwrap();
        assert_eq!(listing.entries[0].name, "report.pdf");

        let bare = LinkAdapter::new().browse(Some("https://example.com/")).unwrap();
        assert_eq!(bare.entries[0].name, "download");
    }

    #[test]
    fn browse_rejects_non_http_links() {
        assert!(LinkAdapter::new().browse(Some("ftp://example.com/a")).is_err());
        assert!(LinkAdapter::new().browse(Some("  ")).is_err());
    }

    #[test]
    fn parses_content_disposition() {
        assert_eq!(
            filename_from_disposition(r#"attachment; filename="q3 report.csv""#).as_deref(),
            Some("q3 report.csv")
        );
        assert_eq!(filename_from_disposition("inline"), None);
    }

    #[tokio::test]
    async fn fetch_uses_response_headers() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/raw/data")
            .with_header("content-type", "text/csv; charset=utf-8")
            .with_header("content-disposition", "attachment; filename=\"data.csv\"")
            .with_body("a,b\n1,2\n")
            .create_async()
            .await;

        let adapter = LinkAdapter::new();
        let listing = adapter
            .browse(Some(&format!("{}/raw/data", server.url())))
            .unwrap();
        let item = adapter.fetch(&listing.entries[0]).await.unwrap();

        assert_eq!(item.name, "data.csv");
        assert_eq!(item.mime.as_deref(), Some("text/csv"));
        assert_eq!(item.size, 8);
    }
}
