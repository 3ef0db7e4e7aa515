use super::pool::{FrameLease, FramePool, Offer};
use super::synthetic::SyntheticPattern;
use crate::config::{CameraConfig, CameraSource};
use crate::error::{CameraError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

#[cfg(all(target_os = "linux", feature = "camera"))]
use super::gst::DeviceCapture;

/// Camera front end: owns the frame pool and pushes leased frames to a consumer
pub struct CameraInterface {
    config: CameraConfig,
    pool: FramePool,
    frame_counter: Arc<AtomicU64>,
    dropped_counter: Arc<AtomicU64>,
    is_running: Arc<AtomicBool>,
    capture_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
    #[cfg(all(target_os = "linux", feature = "camera"))]
    device: Option<DeviceCapture>,
}

impl CameraInterface {
    /// Create a new camera interface for the configured source
    pub async fn new(config: CameraConfig) -> Result<Self> {
        info!(
            "Initializing {:?} camera source {} ({}x{} @ {}fps, pool of {})",
            config.source,
            config.index,
            config.resolution.0,
            config.resolution.1,
            config.fps,
            config.frame_pool_size
        );

        if config.source == CameraSource::Device {
            check_device_access(config.index)?;
        }

        #[cfg(all(target_os = "linux", feature = "camera"))]
        let device = match config.source {
            CameraSource::Device => Some(DeviceCapture::new(&config)?),
            CameraSource::Synthetic => None,
        };

        #[cfg(not(all(target_os = "linux", feature = "camera")))]
        if config.source == CameraSource::Device {
            return Err(CameraError::Configuration {
                details: "device capture requires the `camera` feature on Linux".to_string(),
            }
            .into());
        }

        Ok(Self {
            pool: FramePool::new(config.frame_pool_size),
            config,
            frame_counter: Arc::new(AtomicU64::new(0)),
            dropped_counter: Arc::new(AtomicU64::new(0)),
            is_running: Arc::new(AtomicBool::new(false)),
            capture_task: Mutex::new(None),
            #[cfg(all(target_os = "linux", feature = "camera"))]
            device,
        })
    }

    /// Start delivering frames into `sink`
    pub async fn start_capture(&self, sink: mpsc::Sender<FrameLease>) -> Result<()> {
        if self.is_running.load(Ordering::Relaxed) {
            warn!("Camera capture is already running");
            return Ok(());
        }

        info!("Starting {:?} camera capture", self.config.source);
        self.is_running.store(true, Ordering::Relaxed);

        match self.config.source {
            CameraSource::Synthetic => self.run_synthetic_capture_loop(sink),
            CameraSource::Device => self.start_device_capture(sink),
        }
    }

    #[cfg(all(target_os = "linux", feature = "camera"))]
    fn start_device_capture(&self, sink: mpsc::Sender<FrameLease>) -> Result<()> {
        let device = self.device.as_ref().ok_or_else(|| CameraError::Configuration {
            details: "Pipeline not initialized".to_string(),
        })?;

        device
            .start(
                self.pool.clone(),
                sink,
                Arc::clone(&self.frame_counter),
                Arc::clone(&self.dropped_counter),
            )
            .map_err(|e| {
                self.is_running.store(false, Ordering::Relaxed);
                e.into()
            })
    }

    #[cfg(not(all(target_os = "linux", feature = "camera")))]
    fn start_device_capture(&self, _sink: mpsc::Sender<FrameLease>) -> Result<()> {
        self.is_running.store(false, Ordering::Relaxed);
        Err(CameraError::Configuration {
            details: "device capture requires the `camera` feature on Linux".to_string(),
        }
        .into())
    }

    /// Run the synthetic capture loop at the configured frame rate
    fn run_synthetic_capture_loop(&self, sink: mpsc::Sender<FrameLease>) -> Result<()> {
        let config = self.config.clone();
        let pool = self.pool.clone();
        let is_running = Arc::clone(&self.is_running);
        let frame_counter = Arc::clone(&self.frame_counter);
        let dropped_counter = Arc::clone(&self.dropped_counter);

        let task = tokio::spawn(async move {
            let frame_interval = Duration::from_micros(1_000_000 / config.fps.max(1) as u64);
            let mut interval_timer = tokio::time::interval(frame_interval);
            interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let pattern = SyntheticPattern::new(config.resolution.0, config.resolution.1);

            info!(
                "Synthetic capture loop started (luma stride {}, chroma stride {})",
                pattern.luma_stride(),
                pattern.chroma_stride()
            );

            while is_running.load(Ordering::Relaxed) {
                interval_timer.tick().await;

                if !is_running.load(Ordering::Relaxed) {
                    break;
                }

                let sequence = frame_counter.fetch_add(1, Ordering::Relaxed);
                let frame = pattern.frame(sequence, SystemTime::now());

                match pool.offer(frame, &sink) {
                    Offer::Delivered => trace!("Generated synthetic frame {}", sequence),
                    Offer::PoolExhausted | Offer::ChannelFull => {
                        dropped_counter.fetch_add(1, Ordering::Relaxed);
                    }
                    Offer::Closed => {
                        info!("Frame consumer closed, stopping synthetic capture");
                        break;
                    }
                }
            }

            is_running.store(false, Ordering::Relaxed);
            info!("Synthetic capture loop stopped");
        });

        *self.capture_task.lock() = Some(task);
        Ok(())
    }

    /// Stop camera capture
    pub async fn stop_capture(&self) -> Result<()> {
        if !self.is_running.swap(false, Ordering::Relaxed) && self.capture_task.lock().is_none()
        {
            debug!("Camera capture is not running");
            return Ok(());
        }

        info!("Stopping camera capture");

        #[cfg(all(target_os = "linux", feature = "camera"))]
        if let Some(device) = &self.device {
            device.stop()?;
        }

        let task = self.capture_task.lock().take();
        if let Some(task) = task {
            match tokio::time::timeout(Duration::from_secs(3), task).await {
                Ok(Ok(())) => {
                    info!("Capture task completed successfully");
                }
                Ok(Err(e)) => {
                    error!("Error waiting for capture task: {}", e);
                }
                Err(_) => {
                    warn!("Capture task did not complete within timeout");
                }
            }
        }

        info!(
            "Camera capture stopped after {} frames ({} dropped at source)",
            self.frame_count(),
            self.dropped_count()
        );
        Ok(())
    }

    /// Check if camera is currently capturing
    pub fn is_capturing(&self) -> bool {
        self.is_running.load(Ordering::Relaxed)
    }

    /// Get camera configuration
    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    /// Frame pool shared with the consumer
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// Frames produced by the source
    pub fn frame_count(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Frames dropped at the source (no free slot or consumer behind)
    pub fn dropped_count(&self) -> u64 {
        self.dropped_counter.load(Ordering::Relaxed)
    }
}

/// Make sure the process may open `/dev/video{index}` before building a pipeline
fn check_device_access(index: u32) -> std::result::Result<(), CameraError> {
    let path = format!("/dev/video{}", index);

    match std::fs::OpenOptions::new().read(true).write(true).open(&path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            error!("Camera permission denied for {}", path);
            Err(CameraError::PermissionDenied {
                details: format!("{}: {}", path, e),
            })
        }
        Err(e) => Err(CameraError::DeviceOpen {
            details: format!("{}: {}", path, e),
        }),
    }
}
