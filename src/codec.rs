use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use thiserror::Error;

use crate::buffer::Frame;

pub const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("payload is missing the data-uri separator")]
    MissingSeparator,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("undecodable image: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("jpeg encoding failed: {0}")]
    Jpeg(#[from] image::ImageError),
    #[error("result serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decodes `"<mime-prefix>,<base64 payload>"` into an RGB frame.
/// Only the first comma separates the prefix from the payload.
pub fn decode_data_uri(payload: &str) -> Result<Frame, DecodeError> {
    let (_, encoded) = payload
        .split_once(',')
        .ok_or(DecodeError::MissingSeparator)?;
    let bytes = STANDARD.decode(encoded.trim())?;
    let image = image::load_from_memory(&bytes)?.to_rgb8();
    Ok(Frame::new(image))
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).encode_image(image)?;
    Ok(buf)
}

pub fn jpeg_data_uri(jpeg: &[u8]) -> String {
    let mut uri = String::with_capacity(JPEG_DATA_URI_PREFIX.len() + jpeg.len() * 4 / 3 + 4);
    uri.push_str(JPEG_DATA_URI_PREFIX);
    STANDARD.encode_string(jpeg, &mut uri);
    uri
}
