//! Still image payload sent with a generation request.

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;

use super::client::VeoError;

/// A still image loaded into memory together with its MIME type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    mime_type: &'static str,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    /// Build a payload from raw bytes.
    ///
    /// The MIME type is detected from the file signature; `extension` is only
    /// consulted when the signature is not recognised.
    pub fn from_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<Self, VeoError> {
        if bytes.is_empty() {
            return Err(VeoError::InvalidImage {
                reason: "image file is empty".to_string(),
            });
        }

        let mime_type = image::guess_format(&bytes)
            .ok()
            .and_then(supported_mime_type)
            .or_else(|| {
                extension
                    .and_then(ImageFormat::from_extension)
                    .and_then(supported_mime_type)
            })
            .ok_or_else(|| VeoError::InvalidImage {
                reason: "unsupported image format (expected PNG, JPEG, WebP or GIF)".to_string(),
            })?;

        Ok(Self { bytes, mime_type })
    }

    /// Read an image file from disk.
    pub async fn load(path: &Path) -> Result<Self, VeoError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| VeoError::InvalidImage {
            reason: format!("failed to read '{}': {}", path.display(), e),
        })?;
        let extension = path.extension().and_then(|e| e.to_str());
        Self::from_bytes(bytes, extension)
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Standard base64 encoding of the image bytes, as the API expects.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

/// MIME type for the formats the video API accepts.
fn supported_mime_type(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        _ => None,
    }
}
