use super::pack::pack_semi_planar;
use super::ColorConverter;
use crate::config::ConverterConfig;
use crate::error::ConversionError;
use crate::frame::{ChromaOrder, PixelLayout, RawFrame, RgbBuffer};
use tracing::trace;

/// Portable nested-loop converter: repack, then BT.601 per pixel
#[derive(Debug, Clone)]
pub struct ReferenceConverter {
    chroma_order: ChromaOrder,
    layout: PixelLayout,
}

impl ReferenceConverter {
    pub fn new(chroma_order: ChromaOrder, layout: PixelLayout) -> Self {
        Self {
            chroma_order,
            layout,
        }
    }

    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(config.chroma_order, config.output_layout)
    }

    pub fn chroma_order(&self) -> ChromaOrder {
        self.chroma_order
    }

    pub fn layout(&self) -> PixelLayout {
        self.layout
    }
}

impl Default for ReferenceConverter {
    fn default() -> Self {
        Self::new(ChromaOrder::Vu, PixelLayout::Rgba)
    }
}

impl ColorConverter for ReferenceConverter {
    fn convert(&self, frame: &RawFrame) -> Result<RgbBuffer, ConversionError> {
        let packed = pack_semi_planar(frame, self.chroma_order)?;
        let rgb = semi_planar_to_rgb(
            &packed,
            frame.sequence,
            frame.width,
            frame.height,
            self.chroma_order,
            self.layout,
        )?;

        trace!(
            "Converted frame {} ({}x{}, {} bytes in, {} bytes out)",
            frame.sequence,
            frame.width,
            frame.height,
            frame.byte_len(),
            rgb.data.len()
        );

        Ok(rgb)
    }

    fn name(&self) -> &'static str {
        "reference"
    }
}

/// Convert a packed semi-planar 4:2:0 buffer to 4-byte pixels.
///
/// BT.601 limited range in 8.8 fixed point; chroma is upsampled nearest-neighbour.
pub fn semi_planar_to_rgb(
    packed: &[u8],
    sequence: u64,
    width: u32,
    height: u32,
    order: ChromaOrder,
    layout: PixelLayout,
) -> Result<RgbBuffer, ConversionError> {
    if width == 0 || height == 0 {
        return Err(ConversionError::InvalidDimensions { width, height });
    }

    let w = width as usize;
    let h = height as usize;
    let chroma_width = (w + 1) / 2;
    let chroma_height = (h + 1) / 2;
    let luma_len = w * h;
    let expected = luma_len + chroma_width * chroma_height * 2;
    if packed.len() < expected {
        return Err(ConversionError::PlaneTooShort {
            plane: "semi-planar",
            expected,
            actual: packed.len(),
        });
    }

    let (luma, chroma) = packed.split_at(luma_len);
    let mut out = vec![0u8; luma_len * PixelLayout::BYTES_PER_PIXEL];

    for row in 0..h {
        let chroma_row = &chroma[(row / 2) * chroma_width * 2..];
        let luma_row = &luma[row * w..(row + 1) * w];
        let out_row = &mut out[row * w * PixelLayout::BYTES_PER_PIXEL..];

        for (col, &y) in luma_row.iter().enumerate() {
            let pair = (col / 2) * 2;
            let (u, v) = match order {
                ChromaOrder::Vu => (chroma_row[pair + 1], chroma_row[pair]),
                ChromaOrder::Uv => (chroma_row[pair], chroma_row[pair + 1]),
            };
            let (r, g, b) = yuv_to_rgb(y, u, v);
            let slot = col * PixelLayout::BYTES_PER_PIXEL;
            layout.write(&mut out_row[slot..slot + PixelLayout::BYTES_PER_PIXEL], r, g, b);
        }
    }

    Ok(RgbBuffer::new(sequence, width, height, layout, out))
}

#[inline]
pub(crate) fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let c = y as i32 - 16;
    let d = u as i32 - 128;
    let e = v as i32 - 128;

    let r = (298 * c + 409 * e + 128) >> 8;
    let g = (298 * c - 100 * d - 208 * e + 128) >> 8;
    let b = (298 * c + 516 * d + 128) >> 8;

    (clamp(r), clamp(g), clamp(b))
}

#[inline]
fn clamp(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}
