mod pack;
mod yuv;

pub use pack::{pack_semi_planar, validate_yuv420};
pub use yuv::{semi_planar_to_rgb, ReferenceConverter};

use crate::error::ConversionError;
use crate::frame::{RawFrame, RgbBuffer};

/// Turns a raw 4:2:0 camera frame into a packed RGB buffer.
///
/// Implementations must not hold on to the frame: it is released back to the
/// camera as soon as `convert` returns.
pub trait ColorConverter: Send + Sync {
    fn convert(&self, frame: &RawFrame) -> Result<RgbBuffer, ConversionError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}
