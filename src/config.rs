use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::frame::{ChromaOrder, PixelLayout};

/// Highest frame rate the capture loop is asked to produce
pub const MAX_CAMERA_FPS: u32 = 1_000;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FramecastConfig {
    pub camera: CameraConfig,
    pub sampler: SamplerConfig,
    pub converter: ConverterConfig,
    pub upload: UploadConfig,
    pub system: SystemConfig,
}

/// Where frames come from
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraSource {
    /// Generated moving test pattern
    Synthetic,
    /// V4L2 device through GStreamer
    Device,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Frame source
    #[serde(default = "default_camera_source")]
    pub source: CameraSource,

    /// Camera device index (e.g., 0 for /dev/video0)
    #[serde(default = "default_camera_index")]
    pub index: u32,

    /// Camera resolution (width, height)
    #[serde(default = "default_camera_resolution")]
    pub resolution: (u32, u32),

    /// Frames per second delivered by the source
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Frames that may be checked out of the camera at once
    #[serde(default = "default_frame_pool_size")]
    pub frame_pool_size: usize,

    /// Capacity of the channel between camera and pipeline lane
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SamplerConfig {
    /// Minimum spacing between accepted frames in milliseconds
    #[serde(default = "default_sampler_interval_ms")]
    pub interval_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ConverterConfig {
    /// Chroma interleaving used when repacking planes
    #[serde(default = "default_chroma_order")]
    pub chroma_order: ChromaOrder,

    /// Byte order of packed output pixels
    #[serde(default = "default_output_layout")]
    pub output_layout: PixelLayout,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct UploadConfig {
    /// Server base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the frame upload endpoint
    #[serde(default = "default_upload_path")]
    pub upload_path: String,

    /// Path of the audio fetch endpoint
    #[serde(default = "default_audio_path")]
    pub audio_path: String,

    /// Multipart field name carrying the frame
    #[serde(default = "default_field_name")]
    pub field_name: String,

    /// File name announced for the frame part
    #[serde(default = "default_file_name")]
    pub file_name: String,

    /// JPEG quality (1-100)
    #[serde(default = "default_jpeg_quality")]
    pub jpeg_quality: u8,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// How long shutdown waits for in-flight uploads
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Interval between pipeline statistics log lines (0 disables)
    #[serde(default = "default_stats_interval_seconds")]
    pub stats_interval_seconds: u64,
}

impl FramecastConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("framecast.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.source", "synthetic")?
            .set_default("camera.index", default_camera_index() as i64)?
            .set_default(
                "camera.resolution",
                vec![
                    default_camera_resolution().0 as i64,
                    default_camera_resolution().1 as i64,
                ],
            )?
            .set_default("camera.fps", default_camera_fps() as i64)?
            .set_default("camera.frame_pool_size", default_frame_pool_size() as i64)?
            .set_default(
                "camera.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default("sampler.interval_ms", default_sampler_interval_ms() as i64)?
            .set_default("converter.chroma_order", "vu")?
            .set_default("converter.output_layout", "rgba")?
            .set_default("upload.base_url", default_base_url())?
            .set_default("upload.upload_path", default_upload_path())?
            .set_default("upload.audio_path", default_audio_path())?
            .set_default("upload.field_name", default_field_name())?
            .set_default("upload.file_name", default_file_name())?
            .set_default("upload.jpeg_quality", default_jpeg_quality() as i64)?
            .set_default("upload.timeout_ms", default_timeout_ms() as i64)?
            .set_default(
                "upload.shutdown_grace_ms",
                default_shutdown_grace_ms() as i64,
            )?
            .set_default(
                "system.stats_interval_seconds",
                default_stats_interval_seconds() as i64,
            )?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // FRAMECAST_UPLOAD__BASE_URL -> upload.base_url
            .add_source(
                Environment::with_prefix("FRAMECAST")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: FramecastConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.resolution.0 == 0 || self.camera.resolution.1 == 0 {
            return Err(ConfigError::Message(
                "Camera resolution must be greater than 0".to_string(),
            ));
        }

        if self.camera.fps == 0 || self.camera.fps > MAX_CAMERA_FPS {
            return Err(ConfigError::Message(format!(
                "Camera fps must be between 1 and {}, got {}",
                MAX_CAMERA_FPS, self.camera.fps
            )));
        }

        if self.camera.frame_pool_size == 0 {
            return Err(ConfigError::Message(
                "Camera frame_pool_size must be greater than 0".to_string(),
            ));
        }

        if self.camera.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Camera channel_capacity must be greater than 0".to_string(),
            ));
        }

        if self.sampler.interval_ms == 0 {
            return Err(ConfigError::Message(
                "Sampler interval_ms must be greater than 0".to_string(),
            ));
        }

        if !(1..=100).contains(&self.upload.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "Upload jpeg_quality must be between 1 and 100, got {}",
                self.upload.jpeg_quality
            )));
        }

        if self.upload.base_url.trim().is_empty() {
            return Err(ConfigError::Message(
                "Upload base_url cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for FramecastConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                source: default_camera_source(),
                index: default_camera_index(),
                resolution: default_camera_resolution(),
                fps: default_camera_fps(),
                frame_pool_size: default_frame_pool_size(),
                channel_capacity: default_channel_capacity(),
            },
            sampler: SamplerConfig {
                interval_ms: default_sampler_interval_ms(),
            },
            converter: ConverterConfig {
                chroma_order: default_chroma_order(),
                output_layout: default_output_layout(),
            },
            upload: UploadConfig {
                base_url: default_base_url(),
                upload_path: default_upload_path(),
                audio_path: default_audio_path(),
                field_name: default_field_name(),
                file_name: default_file_name(),
                jpeg_quality: default_jpeg_quality(),
                timeout_ms: default_timeout_ms(),
                shutdown_grace_ms: default_shutdown_grace_ms(),
            },
            system: SystemConfig {
                stats_interval_seconds: default_stats_interval_seconds(),
            },
        }
    }
}

// Default value functions
fn default_camera_source() -> CameraSource {
    CameraSource::Synthetic
}
fn default_camera_index() -> u32 {
    0
}
fn default_camera_resolution() -> (u32, u32) {
    (640, 480)
}
fn default_camera_fps() -> u32 {
    30
}
fn default_frame_pool_size() -> usize {
    2
}
fn default_channel_capacity() -> usize {
    2
}

fn default_sampler_interval_ms() -> u64 {
    500
}

fn default_chroma_order() -> ChromaOrder {
    ChromaOrder::Vu
}
fn default_output_layout() -> PixelLayout {
    PixelLayout::Rgba
}

fn default_base_url() -> String {
    "http://127.0.0.1:5000".to_string()
}
fn default_upload_path() -> String {
    "/upload-frame".to_string()
}
fn default_audio_path() -> String {
    "/get-audio".to_string()
}
fn default_field_name() -> String {
    "file".to_string()
}
fn default_file_name() -> String {
    "frame.jpg".to_string()
}
fn default_jpeg_quality() -> u8 {
    90
}
fn default_timeout_ms() -> u64 {
    10_000
}
fn default_shutdown_grace_ms() -> u64 {
    2_000
}

fn default_stats_interval_seconds() -> u64 {
    30
}
