use super::pool::{FrameLease, FramePool, Offer};
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::frame::{Plane, RawFrame};
use bytes::Bytes;
use gstreamer::prelude::*;
use gstreamer::Pipeline;
use gstreamer_app::AppSink;
use gstreamer_video::VideoInfo;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

/// V4L2 capture through a GStreamer pipeline ending in an I420 appsink
pub(super) struct DeviceCapture {
    pipeline: Pipeline,
}

impl DeviceCapture {
    pub(super) fn new(config: &CameraConfig) -> Result<Self, CameraError> {
        gstreamer::init().map_err(|e| CameraError::Configuration {
            details: format!("Failed to initialize GStreamer: {}", e),
        })?;

        let pipeline_desc = pipeline_description(config);
        info!("Creating GStreamer pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(&pipeline_desc)
            .map_err(|e| CameraError::Configuration {
                details: format!("Failed to create pipeline: {}", e),
            })?
            .downcast::<Pipeline>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to Pipeline".to_string(),
            })?;

        Ok(Self { pipeline })
    }

    pub(super) fn start(
        &self,
        pool: FramePool,
        sink: mpsc::Sender<FrameLease>,
        frame_counter: Arc<AtomicU64>,
        dropped_counter: Arc<AtomicU64>,
    ) -> Result<(), CameraError> {
        let appsink = self
            .pipeline
            .by_name("sink")
            .ok_or_else(|| CameraError::Configuration {
                details: "Failed to get appsink element".to_string(),
            })?
            .downcast::<AppSink>()
            .map_err(|_| CameraError::Configuration {
                details: "Failed to downcast to AppSink".to_string(),
            })?;

        appsink.set_callbacks(
            gstreamer_app::AppSinkCallbacks::builder()
                .new_sample(move |appsink| {
                    let sample = appsink
                        .pull_sample()
                        .map_err(|_| gstreamer::FlowError::Eos)?;
                    let sequence = frame_counter.fetch_add(1, Ordering::Relaxed);

                    let frame = match sample_to_frame(&sample, sequence) {
                        Ok(frame) => frame,
                        Err(e) => {
                            warn!("Discarding camera sample {}: {}", sequence, e);
                            return Ok(gstreamer::FlowSuccess::Ok);
                        }
                    };

                    match pool.offer(frame, &sink) {
                        Offer::Delivered => {
                            trace!("Captured frame {}", sequence);
                            Ok(gstreamer::FlowSuccess::Ok)
                        }
                        Offer::PoolExhausted | Offer::ChannelFull => {
                            dropped_counter.fetch_add(1, Ordering::Relaxed);
                            Ok(gstreamer::FlowSuccess::Ok)
                        }
                        Offer::Closed => {
                            debug!("Frame consumer closed, ending camera stream");
                            Err(gstreamer::FlowError::Eos)
                        }
                    }
                })
                .build(),
        );

        self.pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to start GStreamer pipeline: {}", e),
            })?;

        info!("GStreamer pipeline started successfully");
        Ok(())
    }

    pub(super) fn stop(&self) -> Result<(), CameraError> {
        self.pipeline
            .set_state(gstreamer::State::Null)
            .map_err(|e| CameraError::CaptureStream {
                details: format!("Failed to stop GStreamer pipeline: {}", e),
            })?;
        info!("GStreamer capture stopped");
        Ok(())
    }
}

fn pipeline_description(config: &CameraConfig) -> String {
    let (width, height) = config.resolution;

    format!(
        "v4l2src device=/dev/video{} io-mode=mmap do-timestamp=true ! \
         videoconvert ! \
         video/x-raw,format=I420,width={},height={},framerate={}/1 ! \
         appsink name=sink sync=false max-buffers={} drop=true qos=false enable-last-sample=false emit-signals=false",
        config.index, width, height, config.fps, config.frame_pool_size
    )
}

/// Copy the three I420 planes of a sample into a `RawFrame`
fn sample_to_frame(sample: &gstreamer::Sample, sequence: u64) -> Result<RawFrame, CameraError> {
    let buffer = sample.buffer().ok_or_else(|| CameraError::CaptureStream {
        details: "No buffer in sample".to_string(),
    })?;

    let caps = sample.caps().ok_or_else(|| CameraError::CaptureStream {
        details: "No caps in sample".to_string(),
    })?;

    let info = VideoInfo::from_caps(caps).map_err(|e| CameraError::CaptureStream {
        details: format!("Failed to get video info: {}", e),
    })?;

    let map = buffer
        .map_readable()
        .map_err(|e| CameraError::CaptureStream {
            details: format!("Failed to map buffer: {}", e),
        })?;
    let data = map.as_slice();

    let height = info.height() as usize;
    let chroma_rows = (height + 1) / 2;

    let plane = |index: usize, rows: usize| -> Result<Plane, CameraError> {
        let offset = info.offset()[index];
        let stride = info.stride()[index] as usize;
        let end = (offset + stride * rows).min(data.len());
        if offset >= end {
            return Err(CameraError::CaptureStream {
                details: format!("Plane {} lies outside the {} byte buffer", index, data.len()),
            });
        }
        Ok(Plane::new(Bytes::copy_from_slice(&data[offset..end]), stride, 1))
    };

    Ok(RawFrame::yuv420(
        sequence,
        SystemTime::now(),
        info.width(),
        info.height(),
        plane(0, height)?,
        plane(1, chroma_rows)?,
        plane(2, chroma_rows)?,
    ))
}
