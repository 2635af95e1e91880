use crate::config::ImageCompression;
use crate::error::Result;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, GenericImageView, ImageEncoder, ImageFormat};

/// Re-encodes JPEG and PNG images, scaling them down to a maximum edge length.
#[derive(Debug, Clone, Copy)]
pub struct ImageCompressor {
    settings: ImageCompression,
}

impl ImageCompressor {
    pub fn new(settings: ImageCompression) -> Self {
        Self { settings }
    }

    fn format_for(mime: &str) -> Option<ImageFormat> {
        match mime {
            "image/jpeg" => Some(ImageFormat::Jpeg),
            "image/png" => Some(ImageFormat::Png),
            _ => None,
        }
    }

    pub fn supports(mime: &str) -> bool {
        Self::format_for(mime).is_some()
    }

    fn scale(&self, image: DynamicImage) -> (DynamicImage, bool) {
        match self.settings.max_dimension {
            Some(max) if max > 0 && (image.width() > max || image.height() > max) => {
                (image.resize(max, max, FilterType::Triangle), true)
            }
            _ => (image, false),
        }
    }

    /// Returns the re-encoded image, or `None` when the result would not be an improvement.
    pub fn compress(&self, original: &[u8], mime: &str) -> Result<Option<Vec<u8>>> {
        let Some(format) = Self::format_for(mime) else {
            return Ok(None);
        };
        let decoded = image::load_from_memory_with_format(original, format)?;
        let (image, scaled) = self.scale(decoded);
        let (width, height) = image.dimensions();

        let mut out = Vec::new();
        match format {
            ImageFormat::Jpeg => {
                let rgb = image.to_rgb8();
                let quality = self.settings.quality.clamp(1, 100);
                JpegEncoder::new_with_quality(&mut out, quality).encode(
                    rgb.as_raw(),
                    width,
                    height,
                    ColorType::Rgb8,
                )?;
            }
            _ => {
                let rgba = image.to_rgba8();
                PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive)
                    .write_image(rgba.as_raw(), width, height, ColorType::Rgba8)?;
            }
        }

        if scaled || out.len() < original.len() {
            tracing::debug!(mime, before = original.len(), after = out.len(), width, height, "image re-encoded");
            Ok(Some(out))
        } else {
            Ok(None)
        }
    }
}
