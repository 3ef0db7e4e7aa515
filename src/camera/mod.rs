mod builder;
#[cfg(all(target_os = "linux", feature = "camera"))]
mod gst;
mod interface;
mod pool;
mod synthetic;

pub use builder::CameraInterfaceBuilder;
pub use interface::CameraInterface;
pub use pool::{FrameLease, FramePool};
pub use synthetic::SyntheticPattern;
