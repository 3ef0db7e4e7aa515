/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone, PartialEq)]
pub enum ShutdownReason {
    Signal(String),
    UserRequest,
}

pub(super) const CAMERA: &str = "camera";
pub(super) const PIPELINE: &str = "pipeline";
pub(super) const UPLOADS: &str = "uploads";
