use super::types::{CAMERA, PIPELINE, UPLOADS};
use super::{ComponentState, FramecastOrchestrator};
use crate::error::{FramecastError, Result};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info, warn};

const CAMERA_STOP_TIMEOUT: Duration = Duration::from_secs(5);
const PIPELINE_STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl FramecastOrchestrator {
    /// Stop the camera, close and join the lane, then give uploads a short grace period
    pub async fn shutdown(&mut self) -> Result<i32> {
        info!("Beginning graceful shutdown");

        self.cancellation_token.cancel();
        if let Some(stats_task) = self.stats_task.take() {
            let _ = stats_task.await;
        }

        let mut exit_code = 0;

        let camera_stop = timeout(CAMERA_STOP_TIMEOUT, self.camera.stop_capture()).await;
        if let Err(e) = self.finish_stop(CAMERA, camera_stop).await {
            error!("Error stopping camera: {}", e);
            exit_code = 1;
        }

        if let Some(worker) = self.worker.take() {
            self.set_component_state(PIPELINE, ComponentState::Stopping)
                .await;
            let pipeline_stop = timeout(PIPELINE_STOP_TIMEOUT, async {
                worker.shutdown().await.map(|_| ())
            })
            .await;
            if let Err(e) = self.finish_stop(PIPELINE, pipeline_stop).await {
                error!("Error stopping pipeline: {}", e);
                exit_code = 1;
            }
        } else {
            self.set_component_state(PIPELINE, ComponentState::Stopped)
                .await;
        }

        self.set_component_state(UPLOADS, ComponentState::Stopping)
            .await;
        let grace = Duration::from_millis(self.config.upload.shutdown_grace_ms);
        if !self.dispatcher.drain(grace).await {
            warn!("Abandoning in-flight uploads after {:?}", grace);
        }
        self.set_component_state(UPLOADS, ComponentState::Stopped)
            .await;

        let stats = self.metrics.snapshot();
        info!(
            "Final statistics: {} frames received, {} accepted, {} uploaded, {} upload failures, {} conversion failures",
            stats.frames_received,
            stats.frames_accepted,
            stats.uploads_succeeded,
            stats.uploads_failed,
            stats.conversion_failures
        );

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        Ok(exit_code)
    }

    /// Record the outcome of a timed component stop
    async fn finish_stop(
        &self,
        component: &str,
        outcome: std::result::Result<Result<()>, tokio::time::error::Elapsed>,
    ) -> Result<()> {
        match outcome {
            Ok(Ok(())) => {
                self.set_component_state(component, ComponentState::Stopped)
                    .await;
                info!("{} component stopped", component);
                Ok(())
            }
            Ok(Err(e)) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(e)
            }
            Err(_) => {
                self.set_component_state(component, ComponentState::Failed)
                    .await;
                Err(FramecastError::system(format!(
                    "{} component stop timeout",
                    component
                )))
            }
        }
    }
}
