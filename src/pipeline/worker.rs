use super::clock::Clock;
use super::lane::FrameLane;
use crate::camera::FrameLease;
use crate::error::{FramecastError, Result};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// A `FrameLane` running on its own blocking thread
pub struct PipelineWorker {
    token: CancellationToken,
    handle: JoinHandle<FrameLane>,
}

impl PipelineWorker {
    /// Start draining `frames` through `lane`. The worker ends when the
    /// channel closes or `shutdown` is called.
    pub fn spawn(
        lane: FrameLane,
        frames: mpsc::Receiver<FrameLease>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            FramecastError::component("pipeline", &format!("No tokio runtime: {}", e))
        })?;
        let token = CancellationToken::new();
        let cancel = token.clone();

        let handle = runtime.spawn_blocking({
            let runtime = runtime.clone();
            move || run_lane(lane, frames, clock, cancel, runtime)
        });

        Ok(Self { token, handle })
    }

    /// Wait for the channel to close and the lane to finish
    pub async fn join(self) -> Result<FrameLane> {
        self.handle.await.map_err(|e| {
            error!("Pipeline lane panicked: {}", e);
            FramecastError::component("pipeline", &format!("Lane task failed: {}", e))
        })
    }

    /// Stop taking frames; queued leases are released with the receiver
    pub async fn shutdown(self) -> Result<FrameLane> {
        self.token.cancel();
        self.join().await
    }
}

fn run_lane(
    mut lane: FrameLane,
    mut frames: mpsc::Receiver<FrameLease>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    runtime: Handle,
) -> FrameLane {
    info!("Pipeline lane started");

    loop {
        let next = runtime.block_on(async {
            tokio::select! {
                _ = cancel.cancelled() => None,
                lease = frames.recv() => lease,
            }
        });

        let Some(lease) = next else {
            break;
        };
        lane.handle_frame(lease, clock.now_millis());
    }

    frames.close();
    info!("Pipeline lane stopped");
    lane
}
