use super::metrics::PipelineMetrics;
use crate::camera::FrameLease;
use crate::convert::ColorConverter;
use crate::sampler::FrameSampler;
use crate::upload::UploadDispatcher;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// What happened to one frame on the lane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaneOutcome {
    /// Rejected by the sampling gate
    Throttled,
    /// Converted and handed to the dispatcher
    Dispatched,
    /// Accepted but the converter refused it
    ConversionFailed,
}

/// Sequential sample → convert → dispatch path for one camera.
///
/// The lane owns the sampler so the gate timestamp needs no lock. Every
/// lease is released before the lane returns, whatever the outcome.
pub struct FrameLane {
    sampler: FrameSampler,
    converter: Arc<dyn ColorConverter>,
    dispatcher: Arc<UploadDispatcher>,
    metrics: Arc<PipelineMetrics>,
}

impl FrameLane {
    pub fn new(
        sampler: FrameSampler,
        converter: Arc<dyn ColorConverter>,
        dispatcher: Arc<UploadDispatcher>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        debug!(
            "Frame lane using {} converter, sampling every {:?}",
            converter.name(),
            sampler.interval()
        );

        Self {
            sampler,
            converter,
            dispatcher,
            metrics,
        }
    }

    pub fn handle_frame(&mut self, lease: FrameLease, now_millis: u64) -> LaneOutcome {
        let sequence = lease.sequence();
        self.metrics.record_received();

        if !self.sampler.accept(lease.frame(), now_millis) {
            trace!("Frame {} throttled at {}ms", sequence, now_millis);
            self.metrics.record_throttled();
            self.release(lease);
            return LaneOutcome::Throttled;
        }

        self.metrics.record_accepted();
        debug!(
            "Frame {} accepted at {}ms (age {}ms)",
            sequence,
            now_millis,
            lease.frame().age_ms()
        );

        let converted = self.converter.convert(lease.frame());
        self.release(lease);

        match converted {
            Ok(rgb) => {
                self.dispatcher.dispatch(rgb);
                LaneOutcome::Dispatched
            }
            Err(e) => {
                warn!("Dropping frame {}: {}", sequence, e);
                self.metrics.record_conversion_failure();
                LaneOutcome::ConversionFailed
            }
        }
    }

    pub fn sampler(&self) -> &FrameSampler {
        &self.sampler
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    fn release(&self, lease: FrameLease) {
        lease.release();
        self.metrics.record_released();
    }
}
