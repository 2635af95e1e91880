use crate::adapters::AdapterId;
use crate::error::Result;
use crate::upload::UploadProvider;
use crate::utils::FileSizeUtils;
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Size limit as written in configuration, e.g. `{ size = 10, unit = "MB" }`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MaxFileSize {
    pub size: f64,
    #[serde(default = "default_unit")]
    pub unit: SizeUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeUnit {
    B,
    KB,
    MB,
    GB,
}

impl SizeUnit {
    fn as_str(self) -> &'static str {
        match self {
            SizeUnit::B => "B",
            SizeUnit::KB => "KB",
            SizeUnit::MB => "MB",
            SizeUnit::GB => "GB",
        }
    }
}

fn default_unit() -> SizeUnit {
    SizeUnit::MB
}

impl MaxFileSize {
    pub fn new(size: f64, unit: SizeUnit) -> Self {
        Self { size, unit }
    }

    pub fn bytes(&self) -> u64 {
        FileSizeUtils::to_bytes(self.size, self.unit.as_str()).unwrap_or(u64::MAX)
    }
}

/// OAuth-backed drive credentials. A drive without a `client_id` is never enabled.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriveCredentials {
    #[serde(default)]
    pub client_id: String,
    /// Token obtained from the provider's sign-in flow.
    #[serde(default)]
    pub access_token: Option<String>,
    /// Override for the provider API root; used against test servers.
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub max_file_size: Option<MaxFileSize>,
}

impl DriveCredentials {
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub max_file_size: Option<MaxFileSize>,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_file_size: None,
        }
    }
}

fn default_true() -> bool {
    true
}

/// External snapshot command used as the camera, e.g. `["fswebcam", "--no-banner", "-"]`.
#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    pub command: Vec<String>,
    #[serde(default = "default_camera_mime")]
    pub mime: String,
}

fn default_camera_mime() -> String {
    "image/jpeg".to_string()
}

/// Re-encoding applied to JPEG and PNG images before they are presigned.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct ImageCompression {
    /// JPEG quality, 1 to 100.
    #[serde(default = "default_quality")]
    pub quality: u8,
    /// Longest edge in pixels; larger images are scaled down.
    #[serde(default)]
    pub max_dimension: Option<u32>,
}

fn default_quality() -> u8 {
    80
}

impl Default for ImageCompression {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            max_dimension: None,
        }
    }
}

/// Everything the widget needs at mount time. Passed explicitly to every component.
#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
    /// Maximum number of files in the selection.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Compact single-file mode.
    #[serde(default)]
    pub mini: bool,
    #[serde(default = "default_true")]
    pub multiple: bool,
    /// Comma separated MIME types and extensions, e.g. `"image/*,.pdf"`.
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub max_file_size: Option<MaxFileSize>,
    #[serde(default = "default_enabled_adapters")]
    pub enabled_adapters: Vec<AdapterId>,
    #[serde(default)]
    pub google_drive: Option<DriveCredentials>,
    #[serde(default)]
    pub one_drive: Option<DriveCredentials>,
    #[serde(default)]
    pub dropbox: Option<DriveCredentials>,
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub camera: Option<CameraConfig>,
    #[serde(default)]
    pub dark: bool,
    #[serde(default = "default_token_endpoint")]
    pub token_endpoint: String,
    #[serde(default)]
    pub provider: UploadProvider,
    #[serde(default = "default_preview_text_limit")]
    pub preview_text_limit: usize,
    /// Opt-in image re-encoding before upload.
    #[serde(default)]
    pub compress_images: Option<ImageCompression>,
    /// Folder the device browser opens at. The binary fills it with the user's home.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

fn default_enabled_adapters() -> Vec<AdapterId> {
    AdapterId::ALL.to_vec()
}

fn default_token_endpoint() -> String {
    "http://localhost:3000/api/upload/presign".to_string()
}

fn default_preview_text_limit() -> usize {
    64 * 1024
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            limit: None,
            mini: false,
            multiple: true,
            accept: None,
            max_file_size: None,
            enabled_adapters: default_enabled_adapters(),
            google_drive: None,
            one_drive: None,
            dropbox: None,
            link: LinkConfig::default(),
            camera: None,
            dark: false,
            token_endpoint: default_token_endpoint(),
            provider: UploadProvider::default(),
            preview_text_limit: default_preview_text_limit(),
            compress_images: None,
            local_root: None,
        }
    }
}

impl WidgetConfig {
    /// Loads defaults, then the optional config file, then `UPLOADER__*` environment overrides.
    pub fn load(config_path: &str) -> Result<Self> {
        let settings = Config::builder()
            .add_source(File::with_name(config_path).required(false))
            .add_source(Environment::with_prefix("UPLOADER").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Effective file-count cap: one in mini mode, otherwise `limit`.
    pub fn max_files(&self) -> Option<usize> {
        if self.mini {
            Some(1)
        } else {
            self.limit
        }
    }

    pub fn allows_multiple(&self) -> bool {
        self.multiple && !self.mini
    }

    pub fn max_file_bytes(&self) -> Option<u64> {
        self.max_file_size.map(|m| m.bytes())
    }

    /// Widget limit combined with the adapter's own limit, whichever is smaller.
    pub fn max_bytes_for(&self, adapter: AdapterId) -> Option<u64> {
        let adapter_limit = match adapter {
            AdapterId::GoogleDrive => self.google_drive.as_ref().and_then(|c| c.max_file_size),
            AdapterId::OneDrive => self.one_drive.as_ref().and_then(|c| c.max_file_size),
            AdapterId::Dropbox => self.dropbox.as_ref().and_then(|c| c.max_file_size),
            AdapterId::Link => self.link.max_file_size,
            AdapterId::Internal | AdapterId::Camera => None,
        }
        .map(|m| m.bytes());

        match (self.max_file_bytes(), adapter_limit) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    pub fn drive_credentials(&self, adapter: AdapterId) -> Option<&DriveCredentials> {
        match adapter {
            AdapterId::GoogleDrive => self.google_drive.as_ref(),
            AdapterId::OneDrive => self.one_drive.as_ref(),
            AdapterId::Dropbox => self.dropbox.as_ref(),
            _ => None,
        }
    }
}
