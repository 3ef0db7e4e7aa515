use crate::frame::RawFrame;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::trace;

/// Bounded set of frame slots shared between a camera and its consumer.
///
/// A camera may only hand out a frame while it holds a slot. Slots come back
/// when the consumer drops (or explicitly releases) the `FrameLease`, so a
/// consumer that forgets to release stalls the camera instead of leaking.
#[derive(Debug, Clone)]
pub struct FramePool {
    permits: Arc<Semaphore>,
    capacity: usize,
    released: Arc<AtomicU64>,
    starved: Arc<AtomicU64>,
}

/// Result of offering a frame to the consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Offer {
    Delivered,
    /// No free slot; frame dropped at the source
    PoolExhausted,
    /// Consumer is behind; frame dropped and its slot returned
    ChannelFull,
    /// Consumer went away
    Closed,
}

impl FramePool {
    pub fn new(capacity: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            released: Arc::new(AtomicU64::new(0)),
            starved: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Check a frame out of the pool, or `None` if every slot is in use
    pub fn try_lease(&self, frame: RawFrame) -> Option<FrameLease> {
        match Arc::clone(&self.permits).try_acquire_owned() {
            Ok(permit) => Some(FrameLease {
                frame,
                _permit: permit,
                released: Arc::clone(&self.released),
            }),
            Err(_) => {
                self.starved.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Lease `frame` and push it to `sink` without waiting
    pub(crate) fn offer(&self, frame: RawFrame, sink: &mpsc::Sender<FrameLease>) -> Offer {
        let sequence = frame.sequence;
        let Some(lease) = self.try_lease(frame) else {
            trace!("Frame pool exhausted, dropping frame {}", sequence);
            return Offer::PoolExhausted;
        };

        match sink.try_send(lease) {
            Ok(()) => Offer::Delivered,
            Err(TrySendError::Full(_lease)) => {
                trace!("Frame channel full, dropping frame {}", sequence);
                Offer::ChannelFull
            }
            Err(TrySendError::Closed(_lease)) => Offer::Closed,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently checked out
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Leases returned so far
    pub fn released_count(&self) -> u64 {
        self.released.load(Ordering::Relaxed)
    }

    /// Frames dropped because no slot was free
    pub fn starved_count(&self) -> u64 {
        self.starved.load(Ordering::Relaxed)
    }
}

/// A frame checked out of a `FramePool`; the slot is returned on drop
#[derive(Debug)]
pub struct FrameLease {
    frame: RawFrame,
    _permit: OwnedSemaphorePermit,
    released: Arc<AtomicU64>,
}

impl FrameLease {
    pub fn frame(&self) -> &RawFrame {
        &self.frame
    }

    pub fn sequence(&self) -> u64 {
        self.frame.sequence
    }

    /// Hand the frame back to the camera
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for FrameLease {
    fn drop(&mut self) {
        self.released.fetch_add(1, Ordering::Relaxed);
    }
}
