use crate::adapters::{AdapterId, DriveEntry, DriveListing};
use crate::error::{Result, UploaderError};
use crate::files::RawItem;
use std::process::Command;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone)]
pub struct CapturedFrame {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Anything that can produce a still image on demand.
pub trait CaptureDevice: Send + Sync {
    fn name(&self) -> &str;
    fn capture(&self) -> Result<CapturedFrame>;
}

/// Runs an external snapshot tool (`fswebcam`, `imagesnap`, ...) that writes an image to stdout.
#[derive(Debug, Clone)]
pub struct CommandCaptureDevice {
    program: String,
    args: Vec<String>,
    mime: String,
}

impl CommandCaptureDevice {
    pub fn new(command: &[String], mime: impl Into<String>) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            mime: mime.into(),
        })
    }
}

impl CaptureDevice for CommandCaptureDevice {
    fn name(&self) -> &str {
        &self.program
    }

    fn capture(&self) -> Result<CapturedFrame> {
        let output = Command::new(&self.program).args(&self.args).output()?;
        if !output.status.success() || output.stdout.is_empty() {
            return Err(UploaderError::adapter(
                AdapterId::Camera,
                format!(
                    "{} failed: {}",
                    self.program,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        Ok(CapturedFrame {
            bytes: output.stdout,
            mime: self.mime.clone(),
        })
    }
}

#[derive(Clone)]
pub struct CameraAdapter {
    device: Arc<dyn CaptureDevice>,
}

impl CameraAdapter {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self { device }
    }

    /// The only entry is the device itself.
    pub fn browse(&self) -> DriveListing {
        DriveListing {
            folder: None,
            entries: vec![DriveEntry::file("capture", self.device.name())],
        }
    }

    pub fn fetch(&self) -> Result<RawItem> {
        let frame = self.device.capture()?;
        let extension = mime_guess::get_mime_extensions_str(&frame.mime)
            .and_then(|exts| exts.first())
            .copied()
            .unwrap_or("img");
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();

        let name = format!("capture-{}.{}", stamp, extension);
        tracing::info!(file = %name, size = frame.bytes.len(), "captured camera frame");
        Ok(RawItem::from_bytes(name, Some(frame.mime), frame.bytes, AdapterId::Camera))
    }
}
