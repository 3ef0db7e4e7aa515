pub mod app;
pub mod camera;
pub mod config;
pub mod convert;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod sampler;
pub mod upload;

pub use app::{ComponentState, FramecastOrchestrator, ShutdownReason};
pub use camera::{CameraInterface, CameraInterfaceBuilder, FrameLease, FramePool};
pub use config::FramecastConfig;
pub use convert::{ColorConverter, ReferenceConverter};
pub use error::{FramecastError, Result};
pub use frame::{ChromaOrder, FrameFormat, PixelLayout, Plane, RawFrame, RgbBuffer};
pub use pipeline::{FrameLane, PipelineMetrics, PipelineStats, PipelineWorker};
pub use sampler::FrameSampler;
pub use upload::{FrameTransport, HttpTransport, UploadDispatcher, UploadReceipt};
