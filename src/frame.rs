use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::SystemTime;

/// Pixel format of a raw camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameFormat {
    /// 4:2:0 chroma-subsampled YUV with three planes (I420, YV12, NV12/NV21 views)
    Yuv420,
    /// YUV 4:2:2 packed format
    Yuyv,
}

/// Interleaving of the two chroma channels in a semi-planar buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChromaOrder {
    /// V before U (NV21)
    Vu,
    /// U before V (NV12)
    Uv,
}

/// Byte order of a packed 4-byte pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelLayout {
    Rgba,
    Argb,
}

impl PixelLayout {
    pub const BYTES_PER_PIXEL: usize = 4;

    /// Write one opaque pixel into a 4-byte slot
    #[inline]
    pub fn write(&self, out: &mut [u8], r: u8, g: u8, b: u8) {
        match self {
            PixelLayout::Rgba => {
                out[0] = r;
                out[1] = g;
                out[2] = b;
                out[3] = 0xFF;
            }
            PixelLayout::Argb => {
                out[0] = 0xFF;
                out[1] = r;
                out[2] = g;
                out[3] = b;
            }
        }
    }

    /// Read the colour channels back out of a 4-byte slot
    #[inline]
    pub fn read(&self, px: &[u8]) -> (u8, u8, u8) {
        match self {
            PixelLayout::Rgba => (px[0], px[1], px[2]),
            PixelLayout::Argb => (px[1], px[2], px[3]),
        }
    }
}

/// One image plane as delivered by the camera
#[derive(Debug, Clone)]
pub struct Plane {
    /// Plane bytes (shared with the camera buffer where possible)
    pub data: Bytes,
    /// Distance in bytes between the starts of two rows
    pub row_stride: usize,
    /// Distance in bytes between two samples of the same row
    pub pixel_stride: usize,
}

impl Plane {
    pub fn new(data: impl Into<Bytes>, row_stride: usize, pixel_stride: usize) -> Self {
        Self {
            data: data.into(),
            row_stride,
            pixel_stride,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes needed to address `rows` rows of `samples` samples at this plane's strides
    pub fn required_len(&self, samples: usize, rows: usize) -> usize {
        if samples == 0 || rows == 0 {
            return 0;
        }
        self.row_stride * (rows - 1) + self.pixel_stride * (samples - 1) + 1
    }

    #[inline]
    pub(crate) fn sample(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.row_stride + x * self.pixel_stride]
    }
}

/// A raw camera frame: three planes of 4:2:0 YUV plus metadata
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Sequence number assigned by the camera source
    pub sequence: u64,
    /// Timestamp when frame was captured
    pub timestamp: SystemTime,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Frame format
    pub format: FrameFormat,
    /// Luminance plane
    pub y: Plane,
    /// First chroma plane (Cb)
    pub u: Plane,
    /// Second chroma plane (Cr)
    pub v: Plane,
}

impl RawFrame {
    /// Create a 4:2:0 frame from its three planes
    pub fn yuv420(
        sequence: u64,
        timestamp: SystemTime,
        width: u32,
        height: u32,
        y: Plane,
        u: Plane,
        v: Plane,
    ) -> Self {
        Self {
            sequence,
            timestamp,
            width,
            height,
            format: FrameFormat::Yuv420,
            y,
            u,
            v,
        }
    }

    /// Chroma plane dimensions for 4:2:0 subsampling
    pub fn chroma_dimensions(&self) -> (usize, usize) {
        (
            (self.width as usize + 1) / 2,
            (self.height as usize + 1) / 2,
        )
    }

    /// Total bytes held across all planes
    pub fn byte_len(&self) -> usize {
        self.y.len() + self.u.len() + self.v.len()
    }

    /// Get frame age in milliseconds
    pub fn age_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.timestamp)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// Packed 4-byte-per-pixel image produced by the converter
#[derive(Debug, Clone)]
pub struct RgbBuffer {
    /// Sequence number of the frame this buffer came from
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub layout: PixelLayout,
    pub data: Vec<u8>,
}

impl RgbBuffer {
    pub fn new(sequence: u64, width: u32, height: u32, layout: PixelLayout, data: Vec<u8>) -> Self {
        Self {
            sequence,
            width,
            height,
            layout,
            data,
        }
    }

    /// Byte length a buffer of these dimensions must have
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * PixelLayout::BYTES_PER_PIXEL
    }

    /// Colour channels of the pixel at (x, y)
    pub fn pixel(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = (y as usize * self.width as usize + x as usize) * PixelLayout::BYTES_PER_PIXEL;
        self.layout
            .read(&self.data[idx..idx + PixelLayout::BYTES_PER_PIXEL])
    }

    /// Drop the alpha channel, yielding tightly packed RGB24
    pub fn to_rgb24(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width as usize * self.height as usize * 3);
        for px in self.data.chunks_exact(PixelLayout::BYTES_PER_PIXEL) {
            let (r, g, b) = self.layout.read(px);
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }
}
