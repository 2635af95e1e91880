use crate::config::WidgetConfig;
use crate::error::{Result, UploaderError};
use crate::files::ManagedFile;
use crate::upload::{PresignRequest, PresignedTarget, UploadProvider};

/// Client for the host's token endpoint, which hands out presigned upload targets.
#[derive(Clone)]
pub struct PresignClient {
    client: reqwest::Client,
    endpoint: String,
    provider: UploadProvider,
    accept: Option<String>,
    multiple: bool,
}

impl PresignClient {
    pub fn new(client: reqwest::Client, config: &WidgetConfig) -> Self {
        Self {
            client,
            endpoint: config.token_endpoint.clone(),
            provider: config.provider,
            accept: config.accept.clone(),
            multiple: config.allows_multiple(),
        }
    }

    pub fn request_for(&self, file: &ManagedFile) -> PresignRequest {
        PresignRequest {
            name: file.name.clone(),
            mime: file.mime.clone(),
            size: file.size,
            accept: self.accept.clone(),
            multiple: Some(self.multiple),
            provider: self.provider,
        }
    }

    /// One attempt, no retry. Every failure is a `PresignedUrl` error.
    pub async fn presign(&self, file: &ManagedFile) -> Result<PresignedTarget> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.request_for(file))
            .send()
            .await
            .map_err(|e| UploaderError::PresignedUrl(format!("Failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UploaderError::PresignedUrl(format!(
                "Token endpoint failed with status {}: {}",
                status, body
            )));
        }

        let target = response.json::<PresignedTarget>().await.map_err(|e| {
            UploaderError::PresignedUrl(format!("Failed to parse presign response: {}", e))
        })?;

        tracing::debug!(file = %file.name, key = %target.key, expires_in = target.expires_in, "presigned upload target");
        Ok(target)
    }
}
