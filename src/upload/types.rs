use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Success,
    Error(String),
    Skipped(String),
}

#[derive(Debug, Clone)]
pub struct FileStatus {
    pub file_id: String,
    pub name: String,
    pub status: UploadStatus,
}

/// Object store the token endpoint should presign for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UploadProvider {
    #[default]
    Aws,
    Cloudflare,
    DigitalOcean,
    Minio,
}

/// Body of the presign request sent to the token endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub mime: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accept: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple: Option<bool>,
    pub provider: UploadProvider,
}

/// Single-use upload authorization returned by the token endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedTarget {
    pub key: String,
    pub public_url: String,
    pub upload_url: String,
    /// Seconds the `upload_url` stays valid.
    pub expires_in: u64,
    #[serde(skip, default = "Instant::now")]
    pub issued_at: Instant,
}

impl PresignedTarget {
    pub fn expires_at(&self) -> Instant {
        self.issued_at + Duration::from_secs(self.expires_in)
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at()
    }
}

/// Byte progress of one file's upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadProgressEntry {
    pub file_id: String,
    pub loaded: u64,
    pub total: u64,
    complete: bool,
}

impl UploadProgressEntry {
    pub fn new(file_id: impl Into<String>, total: u64) -> Self {
        Self {
            file_id: file_id.into(),
            loaded: 0,
            total,
            complete: false,
        }
    }

    /// `floor(loaded / total * 100)`, clamped to 0..=100.
    pub fn percentage(&self) -> u8 {
        if self.complete {
            return 100;
        }
        if self.total == 0 {
            return 0;
        }
        ((self.loaded.min(self.total) as u128 * 100) / self.total as u128) as u8
    }

    /// Moves `loaded` forward. Smaller values are ignored; values past `total` are clamped.
    pub fn advance(&mut self, loaded: u64) -> bool {
        let loaded = loaded.min(self.total);
        if loaded <= self.loaded {
            return false;
        }
        self.loaded = loaded;
        true
    }

    pub fn finish(&mut self) {
        self.loaded = self.total;
        self.complete = true;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_monotonic_and_clamped() {
        let mut entry = UploadProgressEntry::new("f", 300);
        assert_eq!(entry.percentage(), 0);

        assert!(entry.advance(100));
        assert_eq!(entry.percentage(), 33);
        assert!(!entry.advance(50));
        assert_eq!(entry.loaded, 100);

        assert!(entry.advance(10_000));
        assert_eq!(entry.loaded, 300);
        assert_eq!(entry.percentage(), 100);
    }

    #[test]
    fn empty_file_reaches_full_progress_on_finish() {
        let mut entry = UploadProgressEntry::new("empty", 0);
        assert_eq!(entry.percentage(), 0);
        entry.finish();
        assert_eq!(entry.percentage(), 100);
    }

    #[test]
    fn presign_request_uses_wire_names() {
        let request = PresignRequest {
            name: "a.png".into(),
            mime: "image/png".into(),
            size: 12,
            accept: None,
            multiple: Some(true),
            provider: UploadProvider::Cloudflare,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "name": "a.png",
                "type": "image/png",
                "size": 12,
                "multiple": true,
                "provider": "cloudflare"
            })
        );
    }

    #[test]
    fn target_parses_camel_case_and_expires() {
        let target: PresignedTarget = serde_json::from_str(
            r#"{"key":"k","publicUrl":"https://cdn/k","uploadUrl":"https://s3/k?sig","expiresIn":0}"#,
        )
        .unwrap();
        assert_eq!(target.public_url, "https://cdn/k");
        assert!(target.is_expired());
    }
}
