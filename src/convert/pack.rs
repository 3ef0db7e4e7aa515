use crate::error::ConversionError;
use crate::frame::{ChromaOrder, FrameFormat, Plane, RawFrame};

/// Check that a frame is 4:2:0 YUV whose planes can be addressed at their strides
pub fn validate_yuv420(frame: &RawFrame) -> Result<(), ConversionError> {
    if frame.format != FrameFormat::Yuv420 {
        return Err(ConversionError::UnsupportedFormat {
            details: format!("{:?} frames cannot be converted, expected Yuv420", frame.format),
        });
    }

    if frame.width == 0 || frame.height == 0 {
        return Err(ConversionError::InvalidDimensions {
            width: frame.width,
            height: frame.height,
        });
    }

    let width = frame.width as usize;
    let height = frame.height as usize;

    if frame.y.pixel_stride != 1 {
        return Err(ConversionError::UnsupportedFormat {
            details: format!(
                "luma pixel stride must be 1, got {}",
                frame.y.pixel_stride
            ),
        });
    }
    check_plane("Y", &frame.y, width, height)?;

    let u = &frame.u;
    let v = &frame.v;
    if u.row_stride != v.row_stride || u.pixel_stride != v.pixel_stride {
        return Err(ConversionError::ChromaMismatch {
            details: format!(
                "U strides ({}, {}) differ from V strides ({}, {})",
                u.row_stride, u.pixel_stride, v.row_stride, v.pixel_stride
            ),
        });
    }
    if !matches!(u.pixel_stride, 1 | 2) {
        return Err(ConversionError::ChromaMismatch {
            details: format!("chroma pixel stride {} is not 1 or 2", u.pixel_stride),
        });
    }

    let (chroma_width, chroma_height) = frame.chroma_dimensions();
    check_plane("U", u, chroma_width, chroma_height)?;
    check_plane("V", v, chroma_width, chroma_height)?;

    Ok(())
}

fn check_plane(
    name: &'static str,
    plane: &Plane,
    samples: usize,
    rows: usize,
) -> Result<(), ConversionError> {
    let row_span = plane.pixel_stride * (samples - 1) + 1;
    if plane.row_stride < row_span {
        return Err(ConversionError::InvalidStride {
            plane: name,
            stride: plane.row_stride,
            width: samples,
        });
    }

    let expected = plane.required_len(samples, rows);
    if plane.len() < expected {
        return Err(ConversionError::PlaneTooShort {
            plane: name,
            expected,
            actual: plane.len(),
        });
    }

    Ok(())
}

/// Repack three strided planes into one contiguous semi-planar buffer.
///
/// Layout: `width * height` luma bytes with row padding removed, followed by
/// `ceil(w/2) * ceil(h/2)` chroma pairs interleaved in `order`.
pub fn pack_semi_planar(frame: &RawFrame, order: ChromaOrder) -> Result<Vec<u8>, ConversionError> {
    validate_yuv420(frame)?;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let (chroma_width, chroma_height) = frame.chroma_dimensions();

    let mut packed = Vec::with_capacity(width * height + chroma_width * chroma_height * 2);

    for row in 0..height {
        let start = row * frame.y.row_stride;
        packed.extend_from_slice(&frame.y.data[start..start + width]);
    }

    let (first, second) = match order {
        ChromaOrder::Vu => (&frame.v, &frame.u),
        ChromaOrder::Uv => (&frame.u, &frame.v),
    };

    for row in 0..chroma_height {
        for col in 0..chroma_width {
            packed.push(first.sample(col, row));
            packed.push(second.sample(col, row));
        }
    }

    Ok(packed)
}
