//! Recipe image payloads: base64 decoding, format detection and storage
//! under the media root.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ApiError;

/// Images are stored under `{media_root}/recipes/images/`.
const IMAGE_DIR: &str = "recipes/images";

/// A decoded image with the file extension matching its actual format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub bytes: Vec<u8>,
    pub extension: &'static str,
}

fn invalid(message: &str) -> ApiError {
    ApiError::validation(message, Some("image"))
}

/// Detects the image format from its leading bytes.
fn sniff_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        Some("gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("webp")
    } else {
        None
    }
}

/// Decodes a base64 image, either bare or as a `data:image/<fmt>;base64,` URI.
/// The payload must be a PNG, JPEG, GIF or WEBP image.
pub fn decode_image(payload: &str) -> Result<DecodedImage, ApiError> {
    let payload = payload.trim();
    let data = match payload.strip_prefix("data:") {
        Some(uri) => {
            let (header, data) = uri
                .split_once(',')
                .ok_or_else(|| invalid("Malformed data URI"))?;
            if !header.starts_with("image/") || !header.ends_with(";base64") {
                return Err(invalid("Image must be a base64 encoded image/* data URI"));
            }
            data
        }
        None => payload,
    };

    if data.is_empty() {
        return Err(invalid("Image must not be empty"));
    }

    let compact: String = data.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact.as_bytes())
        .map_err(|_| invalid("Image is not valid base64"))?;

    let extension =
        sniff_extension(&bytes).ok_or_else(|| invalid("Unsupported image format"))?;
    debug!(size = bytes.len(), extension, "Decoded image");

    Ok(DecodedImage { bytes, extension })
}

/// Writes the image of `recipe_id` and returns its path relative to the media root.
/// Every call gets a fresh file name, so the previous image survives until
/// the new one is committed.
pub async fn store_image(
    media_root: &Path,
    recipe_id: i32,
    image: &DecodedImage,
) -> std::io::Result<String> {
    let relative = format!(
        "{IMAGE_DIR}/{recipe_id}_{}.{}",
        Utc::now().timestamp_micros(),
        image.extension
    );
    let target: PathBuf = media_root.join(&relative);
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&target, &image.bytes).await?;
    debug!(path = %target.display(), "Stored recipe image");
    Ok(relative)
}

/// Removes a stored image. Failures are only logged: a stale file does not
/// affect any stored row.
pub async fn remove_image(media_root: &Path, relative: &str) {
    if relative.is_empty() {
        return;
    }
    let target = media_root.join(relative);
    if let Err(e) = tokio::fs::remove_file(&target).await {
        warn!(path = %target.display(), "Failed to remove image: {}", e);
    }
}

/// Public URL of a stored image.
pub fn image_url(relative: &str) -> String {
    format!("/media/{relative}")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Smallest valid 1x1 PNG, base64 encoded.
    pub(crate) const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_bare_png() {
        let image = decode_image(PIXEL_PNG).unwrap();
        assert_eq!(image.extension, "png");
        assert!(image.bytes.starts_with(b"\x89PNG"));
    }

    #[test]
    fn decodes_data_uri() {
        let uri = format!("data:image/png;base64,{PIXEL_PNG}");
        assert_eq!(decode_image(&uri).unwrap().extension, "png");
    }

    #[test]
    fn detects_gif_and_jpeg() {
        let gif = STANDARD.encode(b"GIF89a\x01\x00\x01\x00");
        assert_eq!(decode_image(&gif).unwrap().extension, "gif");
        let jpeg = STANDARD.encode([0xFF, 0xD8, 0xFF, 0xE0, 0x00]);
        assert_eq!(decode_image(&jpeg).unwrap().extension, "jpg");
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_image("").is_err());
        assert!(decode_image("not base64 at all!").is_err());
        assert!(decode_image(&STANDARD.encode("plain text")).is_err());
        assert!(decode_image("data:text/plain;base64,aGVsbG8=").is_err());
        assert!(decode_image("data:image/png,raw").is_err());
    }

    #[tokio::test]
    async fn stores_and_removes_image() {
        let dir = tempfile::tempdir().unwrap();
        let image = decode_image(PIXEL_PNG).unwrap();

        let relative = store_image(dir.path(), 7, &image).await.unwrap();
        assert!(relative.starts_with("recipes/images/7_"));
        assert!(relative.ends_with(".png"));
        assert_eq!(std::fs::read(dir.path().join(&relative)).unwrap(), image.bytes);

        remove_image(dir.path(), &relative).await;
        assert!(!dir.path().join(&relative).exists());
    }
}
