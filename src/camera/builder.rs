use super::interface::CameraInterface;
use crate::config::CameraConfig;
use crate::error::{FramecastError, Result};

/// Builder for the camera interface
pub struct CameraInterfaceBuilder {
    config: Option<CameraConfig>,
}

impl CameraInterfaceBuilder {
    pub fn new() -> Self {
        Self { config: None }
    }

    pub fn config(mut self, config: CameraConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub async fn build(self) -> Result<CameraInterface> {
        let config = self
            .config
            .ok_or_else(|| FramecastError::system("Camera configuration must be specified"))?;

        CameraInterface::new(config).await
    }
}

impl Default for CameraInterfaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
