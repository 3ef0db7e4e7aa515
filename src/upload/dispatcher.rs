use super::encode::{encode_jpeg, UploadArtifact};
use super::multipart::MultipartForm;
use super::transport::FrameTransport;
use crate::config::UploadConfig;
use crate::error::{EncodingError, FramecastError, Result, TransportError};
use crate::frame::RgbBuffer;
use crate::pipeline::PipelineMetrics;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace, warn};

const JPEG_CONTENT_TYPE: &str = "image/jpeg";

/// Encodes accepted frames and hands them to the transport without waiting.
///
/// `dispatch` is callable from the blocking lane thread: submissions are
/// spawned onto the runtime captured at construction and tracked so that
/// shutdown can give in-flight uploads a short grace period.
pub struct UploadDispatcher {
    transport: Arc<dyn FrameTransport>,
    metrics: Arc<PipelineMetrics>,
    quality: u8,
    field_name: String,
    file_name: String,
    tracker: TaskTracker,
    runtime: Handle,
}

impl UploadDispatcher {
    /// Must be called from within a tokio runtime
    pub fn new(
        config: &UploadConfig,
        transport: Arc<dyn FrameTransport>,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            FramecastError::component("upload_dispatcher", &format!("No tokio runtime: {}", e))
        })?;

        Ok(Self {
            transport,
            metrics,
            quality: config.jpeg_quality,
            field_name: config.field_name.clone(),
            file_name: config.file_name.clone(),
            tracker: TaskTracker::new(),
            runtime,
        })
    }

    /// Encode `rgb` as JPEG at the configured quality
    pub fn prepare(&self, rgb: &RgbBuffer) -> std::result::Result<UploadArtifact, EncodingError> {
        let jpeg = encode_jpeg(rgb, self.quality)?;
        trace!(
            "Encoded frame {} ({}x{}) into {} JPEG bytes",
            rgb.sequence,
            rgb.width,
            rgb.height,
            jpeg.len()
        );

        Ok(UploadArtifact {
            sequence: rgb.sequence,
            jpeg: Bytes::from(jpeg),
        })
    }

    /// Fire-and-forget upload of one converted frame.
    ///
    /// Encoding failures are logged and counted here; nothing reaches the
    /// network. Transport failures are logged and counted by the spawned task.
    pub fn dispatch(&self, rgb: RgbBuffer) {
        let sequence = rgb.sequence;
        let artifact = match self.prepare(&rgb) {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("Dropping frame {}: {}", sequence, e);
                self.metrics.record_encoding_failure();
                return;
            }
        };
        drop(rgb);

        let form = MultipartForm::single_file(
            &self.field_name,
            &self.file_name,
            JPEG_CONTENT_TYPE,
            &artifact.jpeg,
        );
        let size = artifact.len();
        drop(artifact);

        let transport = Arc::clone(&self.transport);
        let metrics = Arc::clone(&self.metrics);
        self.metrics.record_upload_started();

        self.tracker.spawn_on(
            async move {
                match transport.upload_frame(sequence, form).await {
                    Ok(receipt) => {
                        metrics.record_upload_succeeded(size);
                        debug!("Uploaded frame {} ({} bytes)", sequence, size);
                        if let Some(description) = receipt.scene_description {
                            info!("Frame {}: {}", sequence, description);
                        } else if let Some(message) = receipt.message {
                            debug!("Frame {} server message: {}", sequence, message);
                        }
                    }
                    Err(e) => {
                        metrics.record_upload_failed();
                        warn!("Upload of frame {} failed: {}", sequence, e);
                    }
                }
            },
            &self.runtime,
        );
    }

    /// One-shot pull of the latest audio clip
    pub async fn fetch_audio(&self) -> std::result::Result<Vec<u8>, TransportError> {
        self.transport.fetch_audio().await
    }

    /// Uploads spawned and not yet finished
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait up to `timeout` for in-flight uploads. Returns false if some were
    /// still running when the timeout hit; those are abandoned, not cancelled.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let finished = tokio::time::timeout(timeout, self.tracker.wait())
            .await
            .is_ok();
        self.tracker.reopen();

        if !finished {
            warn!(
                "{} uploads still in flight after {:?}",
                self.tracker.len(),
                timeout
            );
        }
        finished
    }
}
