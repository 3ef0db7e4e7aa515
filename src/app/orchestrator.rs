use super::types::{ComponentState, ShutdownReason};
use crate::camera::CameraInterface;
use crate::config::FramecastConfig;
use crate::convert::{ColorConverter, ReferenceConverter};
use crate::error::Result;
use crate::pipeline::{Clock, MonotonicClock, PipelineMetrics, PipelineStats, PipelineWorker};
use crate::upload::{FrameTransport, HttpTransport, UploadDispatcher};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Wires camera, pipeline lane and upload dispatcher together and owns their lifecycle
pub struct FramecastOrchestrator {
    pub(super) config: FramecastConfig,
    pub(super) metrics: Arc<PipelineMetrics>,

    // Components
    pub(super) camera: CameraInterface,
    pub(super) converter: Arc<dyn ColorConverter>,
    pub(super) dispatcher: Arc<UploadDispatcher>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) worker: Option<PipelineWorker>,
    pub(super) stats_task: Option<JoinHandle<()>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Arc<Mutex<Option<oneshot::Sender<ShutdownReason>>>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl FramecastOrchestrator {
    /// Create an orchestrator that uploads over HTTP
    pub async fn new(config: FramecastConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config.upload));
        info!("Uploading frames to {}", transport.upload_url());
        Self::with_transport(config, transport).await
    }

    /// Create an orchestrator around any transport
    pub async fn with_transport(
        config: FramecastConfig,
        transport: Arc<dyn FrameTransport>,
    ) -> Result<Self> {
        config.validate().map_err(|e| {
            error!("Invalid configuration: {}", e);
            e
        })?;

        let (shutdown_sender, shutdown_receiver) = oneshot::channel();
        let metrics = Arc::new(PipelineMetrics::new());

        // Camera access problems surface here, before anything runs
        let camera = CameraInterface::new(config.camera.clone()).await?;

        let converter: Arc<dyn ColorConverter> =
            Arc::new(ReferenceConverter::from_config(&config.converter));

        let dispatcher = Arc::new(UploadDispatcher::new(
            &config.upload,
            transport,
            Arc::clone(&metrics),
        )?);

        Ok(Self {
            config,
            metrics,
            camera,
            converter,
            dispatcher,
            clock: Arc::new(MonotonicClock::new()),
            worker: None,
            stats_task: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Arc::new(Mutex::new(Some(shutdown_sender))),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &FramecastConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraInterface {
        &self.camera
    }

    pub fn dispatcher(&self) -> &Arc<UploadDispatcher> {
        &self.dispatcher
    }

    /// Current pipeline counters
    pub fn stats(&self) -> PipelineStats {
        self.metrics.snapshot()
    }

    /// Ask a running orchestrator to shut down. Only the first request counts.
    pub async fn request_shutdown(&self, reason: ShutdownReason) {
        if let Some(sender) = self.shutdown_sender.lock().await.take() {
            let _ = sender.send(reason);
        }
    }
}
