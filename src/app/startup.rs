use super::types::{CAMERA, PIPELINE, UPLOADS};
use super::{ComponentState, FramecastOrchestrator};
use crate::error::Result;
use crate::pipeline::{FrameLane, PipelineWorker};
use crate::sampler::FrameSampler;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

impl FramecastOrchestrator {
    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing Framecast system components");

        let mut states = self.component_states.lock().await;
        states.insert(CAMERA.to_string(), ComponentState::Stopped);
        states.insert(PIPELINE.to_string(), ComponentState::Stopped);
        states.insert(UPLOADS.to_string(), ComponentState::Stopped);
        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Start uploads, then the lane, then the camera feeding it
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting Framecast system");

        self.set_component_state(UPLOADS, ComponentState::Running)
            .await;

        self.set_component_state(PIPELINE, ComponentState::Starting)
            .await;
        let (frame_sender, frame_receiver) = mpsc::channel(self.config.camera.channel_capacity);
        let lane = FrameLane::new(
            FrameSampler::from_millis(self.config.sampler.interval_ms),
            Arc::clone(&self.converter),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.metrics),
        );
        let worker = PipelineWorker::spawn(lane, frame_receiver, Arc::clone(&self.clock))
            .map_err(|e| {
                error!("Failed to start pipeline lane: {}", e);
                e
            })?;
        self.worker = Some(worker);
        self.set_component_state(PIPELINE, ComponentState::Running)
            .await;
        info!(
            "Pipeline lane started, sampling every {}ms",
            self.config.sampler.interval_ms
        );

        self.set_component_state(CAMERA, ComponentState::Starting)
            .await;
        if let Err(e) = self.camera.start_capture(frame_sender).await {
            error!("Failed to start camera capture: {}", e);
            self.set_component_state(CAMERA, ComponentState::Failed)
                .await;
            return Err(e);
        }
        self.set_component_state(CAMERA, ComponentState::Running)
            .await;
        info!("Camera capture started successfully");

        self.start_stats_reporter();

        info!("Framecast system started successfully");
        Ok(())
    }

    /// Periodically log pipeline counters
    fn start_stats_reporter(&mut self) {
        let seconds = self.config.system.stats_interval_seconds;
        if seconds == 0 {
            return;
        }

        let metrics = Arc::clone(&self.metrics);
        let token = self.cancellation_token.clone();

        self.stats_task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(seconds));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let stats = metrics.snapshot();
                        info!(
                            received = stats.frames_received,
                            accepted = stats.frames_accepted,
                            throttled = stats.frames_throttled,
                            conversion_failures = stats.conversion_failures,
                            encoding_failures = stats.encoding_failures,
                            uploaded = stats.uploads_succeeded,
                            upload_failures = stats.uploads_failed,
                            in_flight = stats.uploads_in_flight(),
                            bytes = stats.bytes_uploaded,
                            "Pipeline statistics"
                        );
                    }
                }
            }
        }));
    }
}
