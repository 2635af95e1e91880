use crate::adapters::{
    Adapter, AdapterId, CameraAdapter, CaptureDevice, CommandCaptureDevice, DropboxAdapter,
    GoogleDriveAdapter, LinkAdapter, LocalAdapter, OneDriveAdapter,
};
use crate::config::WidgetConfig;
use crate::files::AcceptPattern;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    pub id: AdapterId,
    pub title: &'static str,
    pub icon: &'static str,
    pub enabled: bool,
}

/// The sources this widget instance offers, fixed at mount time.
#[derive(Clone)]
pub struct AdapterRegistry {
    descriptors: Vec<AdapterDescriptor>,
    config: WidgetConfig,
    camera: Option<Arc<dyn CaptureDevice>>,
}

impl AdapterRegistry {
    pub fn from_config(config: &WidgetConfig) -> Self {
        let camera = config.camera.as_ref().and_then(|camera| {
            CommandCaptureDevice::new(&camera.command, camera.mime.clone())
                .map(|device| Arc::new(device) as Arc<dyn CaptureDevice>)
        });
        Self::with_camera(config, camera)
    }

    pub fn with_camera(config: &WidgetConfig, camera: Option<Arc<dyn CaptureDevice>>) -> Self {
        let mut descriptors: Vec<AdapterDescriptor> = Vec::new();

        for &id in &config.enabled_adapters {
            if descriptors.iter().any(|d| d.id == id) {
                continue;
            }

            let enabled = match id {
                AdapterId::Internal => true,
                AdapterId::GoogleDrive | AdapterId::OneDrive | AdapterId::Dropbox => config
                    .drive_credentials(id)
                    .is_some_and(|c| c.is_configured()),
                AdapterId::Link => config.link.enabled,
                AdapterId::Camera => camera.is_some(),
            };

            if !enabled {
                tracing::info!(adapter = id.as_str(), "adapter requested but not configured");
            }

            descriptors.push(AdapterDescriptor {
                id,
                title: id.title(),
                icon: id.icon(),
                enabled,
            });
        }

        Self {
            descriptors,
            config: config.clone(),
            camera,
        }
    }

    pub fn list(&self) -> &[AdapterDescriptor] {
        &self.descriptors
    }

    pub fn enabled(&self) -> impl Iterator<Item = &AdapterDescriptor> {
        self.descriptors.iter().filter(|d| d.enabled)
    }

    pub fn is_enabled(&self, id: AdapterId) -> bool {
        self.descriptors.iter().any(|d| d.id == id && d.enabled)
    }

    /// Instantiates an enabled adapter.
    pub fn build(&self, id: AdapterId) -> Option<Adapter> {
        if !self.is_enabled(id) {
            return None;
        }

        let adapter = match id {
            AdapterId::Internal => Adapter::Internal(LocalAdapter::new(
                AcceptPattern::from_config(self.config.accept.as_deref()),
                self.config.allows_multiple(),
            )
            .with_root(self.config.local_root.clone())),
            AdapterId::GoogleDrive => {
                Adapter::GoogleDrive(GoogleDriveAdapter::new(self.config.google_drive.as_ref()?))
            }
            AdapterId::OneDrive => {
                Adapter::OneDrive(OneDriveAdapter::new(self.config.one_drive.as_ref()?))
            }
            AdapterId::Dropbox => Adapter::Dropbox(DropboxAdapter::new(self.config.dropbox.as_ref()?)),
            AdapterId::Link => Adapter::Link(LinkAdapter::new()),
            AdapterId::Camera => Adapter::Camera(CameraAdapter::new(self.camera.clone()?)),
        };
        Some(adapter)
    }
}
