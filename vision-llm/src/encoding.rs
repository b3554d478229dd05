use std::path::Path;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::ImageFormat;
use tracing::info;

use crate::error::{LlmError, Result};

const FALLBACK_MIME: &str = "image/jpeg";

/// An image ready to be inlined in a request payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub mime_type: &'static str,
    pub base64: String,
}

impl EncodedImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// Read an image from disk and base64 it.
///
/// Missing files fail with `NotFound` before anything is read. The bytes are forwarded untouched:
/// no resizing, format validation or size cap.
pub async fn encode_image_file(path: &Path) -> Result<EncodedImage> {
    if !tokio::fs::try_exists(path).await? {
        return Err(LlmError::NotFound(path.to_path_buf()));
    }

    let bytes = tokio::fs::read(path).await?;
    let mime_type = sniff_format(&bytes)
        .or_else(|| ImageFormat::from_path(path).ok())
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME);

    info!(
        path = %path.display(),
        size_bytes = bytes.len(),
        mime_type,
        "Encoded image for vendor request"
    );

    Ok(EncodedImage {
        mime_type,
        base64: STANDARD.encode(&bytes),
    })
}

pub fn encode_image_bytes(bytes: &[u8]) -> EncodedImage {
    let mime_type = sniff_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME);

    EncodedImage {
        mime_type,
        base64: STANDARD.encode(bytes),
    }
}

/// Guess the image format from its magic bytes.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// File suffix (with dot) matching the sniffed format, `.png` when unknown.
pub fn suffix_for(bytes: &[u8]) -> String {
    sniff_format(bytes)
        .and_then(|format| format.extensions_str().first().copied())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_else(|| ".png".to_string())
}
