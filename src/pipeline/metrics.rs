use std::sync::atomic::{AtomicU64, Ordering};

/// Counters shared by the lane, the dispatcher and the upload tasks
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    received: AtomicU64,
    accepted: AtomicU64,
    throttled: AtomicU64,
    released: AtomicU64,
    conversion_failures: AtomicU64,
    encoding_failures: AtomicU64,
    uploads_started: AtomicU64,
    uploads_succeeded: AtomicU64,
    uploads_failed: AtomicU64,
    bytes_uploaded: AtomicU64,
}

/// Point-in-time copy of `PipelineMetrics`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_received: u64,
    pub frames_accepted: u64,
    pub frames_throttled: u64,
    pub frames_released: u64,
    pub conversion_failures: u64,
    pub encoding_failures: u64,
    pub uploads_started: u64,
    pub uploads_succeeded: u64,
    pub uploads_failed: u64,
    pub bytes_uploaded: u64,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_received(&self) {
        self.received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_throttled(&self) {
        self.throttled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_released(&self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_conversion_failure(&self) {
        self.conversion_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_encoding_failure(&self) {
        self.encoding_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_started(&self) {
        self.uploads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upload_succeeded(&self, bytes: usize) {
        self.uploads_succeeded.fetch_add(1, Ordering::Relaxed);
        self.bytes_uploaded.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn record_upload_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_received: self.received.load(Ordering::Relaxed),
            frames_accepted: self.accepted.load(Ordering::Relaxed),
            frames_throttled: self.throttled.load(Ordering::Relaxed),
            frames_released: self.released.load(Ordering::Relaxed),
            conversion_failures: self.conversion_failures.load(Ordering::Relaxed),
            encoding_failures: self.encoding_failures.load(Ordering::Relaxed),
            uploads_started: self.uploads_started.load(Ordering::Relaxed),
            uploads_succeeded: self.uploads_succeeded.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            bytes_uploaded: self.bytes_uploaded.load(Ordering::Relaxed),
        }
    }
}

impl PipelineStats {
    /// Uploads spawned but not yet finished
    pub fn uploads_in_flight(&self) -> u64 {
        self.uploads_started
            .saturating_sub(self.uploads_succeeded + self.uploads_failed)
    }

    /// Share of received frames that passed the gate
    pub fn acceptance_ratio(&self) -> f64 {
        if self.frames_received > 0 {
            self.frames_accepted as f64 / self.frames_received as f64
        } else {
            0.0
        }
    }
}
