use crate::error::EncodingError;
use crate::frame::RgbBuffer;
use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::ColorType;

/// JPEG bytes for one accepted frame, alive for a single upload attempt
#[derive(Debug, Clone)]
pub struct UploadArtifact {
    pub sequence: u64,
    pub jpeg: Bytes,
}

impl UploadArtifact {
    pub fn len(&self) -> usize {
        self.jpeg.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jpeg.is_empty()
    }
}

/// Encode a packed pixel buffer as baseline JPEG at `quality`
pub fn encode_jpeg(rgb: &RgbBuffer, quality: u8) -> Result<Vec<u8>, EncodingError> {
    if rgb.width == 0 || rgb.height == 0 {
        return Err(EncodingError::EmptyBuffer {
            width: rgb.width,
            height: rgb.height,
        });
    }

    if rgb.data.len() != rgb.expected_len() {
        return Err(EncodingError::BufferSize {
            expected: rgb.expected_len(),
            actual: rgb.data.len(),
        });
    }

    let pixels = rgb.to_rgb24();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    encoder
        .encode(&pixels, rgb.width, rgb.height, ColorType::Rgb8)
        .map_err(|e| EncodingError::Backend {
            details: e.to_string(),
        })?;

    Ok(buf)
}
