use thiserror::Error;

#[derive(Error, Debug)]
pub enum FramecastError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

impl FramecastError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Errors the application cannot run past
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FramecastError::Camera(CameraError::PermissionDenied { .. })
        )
    }
}

/// Camera source failures
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Camera permission denied: {details}")]
    PermissionDenied { details: String },

    #[error("Failed to open camera device: {details}")]
    DeviceOpen { details: String },

    #[error("Camera configuration error: {details}")]
    Configuration { details: String },

    #[error("Camera capture stream error: {details}")]
    CaptureStream { details: String },
}

/// Malformed or unsupported frame data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Unsupported frame format: {details}")]
    UnsupportedFormat { details: String },

    #[error("Invalid frame dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("{plane} plane too short: expected at least {expected} bytes, got {actual}")]
    PlaneTooShort {
        plane: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{plane} plane stride {stride} cannot hold a row of {width} samples")]
    InvalidStride {
        plane: &'static str,
        stride: usize,
        width: usize,
    },

    #[error("Inconsistent chroma planes: {details}")]
    ChromaMismatch { details: String },
}

/// JPEG encoding failures
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Cannot encode empty {width}x{height} buffer")]
    EmptyBuffer { width: u32, height: u32 },

    #[error("Pixel buffer size mismatch: expected {expected} bytes, got {actual}")]
    BufferSize { expected: usize, actual: usize },

    #[error("JPEG encoder failed: {details}")]
    Backend { details: String },
}

/// Network and HTTP failures
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request to {url} failed: {details}")]
    Request { url: String, details: String },

    #[error("Server at {url} answered with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },

    #[error("Failed to read response from {url}: {details}")]
    Response { url: String, details: String },

    #[error("Transport task failed: {details}")]
    Task { details: String },
}

pub type Result<T> = std::result::Result<T, FramecastError>;
