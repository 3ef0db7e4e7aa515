use crate::frame::RawFrame;
use std::time::Duration;
use tracing::trace;

/// Time-based gate that lets at most one frame through per interval.
///
/// There is no queue and no catch-up: a frame arriving inside the interval is
/// rejected and the caller is expected to release it straight away. The gate
/// timestamp is updated on acceptance, before any downstream work starts, so a
/// slow or failing converter never opens the gate early.
#[derive(Debug)]
pub struct FrameSampler {
    interval_ms: u64,
    last_accepted: Option<u64>,
}

impl FrameSampler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis() as u64,
            last_accepted: None,
        }
    }

    pub fn from_millis(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            last_accepted: None,
        }
    }

    /// Decide whether `frame`, seen at `now_millis`, goes downstream
    pub fn accept(&mut self, frame: &RawFrame, now_millis: u64) -> bool {
        let open = match self.last_accepted {
            None => true,
            // A clock that stepped backwards keeps the gate shut until it passes last + interval
            Some(last) => now_millis >= last && now_millis - last >= self.interval_ms,
        };

        if open {
            self.last_accepted = Some(now_millis);
            trace!("Sampler accepted frame {} at {}ms", frame.sequence, now_millis);
        } else {
            trace!("Sampler dropped frame {} at {}ms", frame.sequence, now_millis);
        }

        open
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn last_accepted(&self) -> Option<u64> {
        self.last_accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Plane;
    use std::time::SystemTime;

    fn create_test_frame(sequence: u64) -> RawFrame {
        RawFrame::yuv420(
            sequence,
            SystemTime::now(),
            2,
            2,
            Plane::new(vec![16u8; 4], 2, 1),
            Plane::new(vec![128u8; 1], 1, 1),
            Plane::new(vec![128u8; 1], 1, 1),
        )
    }

    #[test]
    fn test_first_frame_always_accepted() {
        let mut sampler = FrameSampler::from_millis(500);
        assert!(sampler.accept(&create_test_frame(0), 0));
        assert_eq!(sampler.last_accepted(), Some(0));
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let mut sampler = FrameSampler::from_millis(500);
        let frame = create_test_frame(0);

        assert!(sampler.accept(&frame, 1_000));
        assert!(!sampler.accept(&frame, 1_499));
        assert!(sampler.accept(&frame, 1_500));
        assert_eq!(sampler.last_accepted(), Some(1_500));
    }

    #[test]
    fn test_rejection_does_not_move_gate() {
        let mut sampler = FrameSampler::new(Duration::from_millis(500));
        let frame = create_test_frame(0);

        assert!(sampler.accept(&frame, 0));
        for t in (50..500).step_by(50) {
            assert!(!sampler.accept(&frame, t));
        }
        assert_eq!(sampler.last_accepted(), Some(0));
        assert!(sampler.accept(&frame, 500));
    }

    #[test]
    fn test_ten_frames_at_100ms_accept_two() {
        let mut sampler = FrameSampler::from_millis(500);

        let accepted: Vec<u64> = (0..10u64)
            .filter(|i| sampler.accept(&create_test_frame(*i), i * 100))
            .collect();

        assert_eq!(accepted, vec![0, 5]);
    }

    #[test]
    fn test_at_most_one_per_window() {
        let mut sampler = FrameSampler::from_millis(500);
        // Irregular arrivals, including bursts and long gaps
        let arrivals = [
            0u64, 3, 7, 120, 499, 500, 501, 730, 999, 1_000, 1_001, 1_620, 1_621, 2_900, 3_399,
            3_400, 3_401,
        ];

        let accepted: Vec<u64> = arrivals
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, t)| sampler.accept(&create_test_frame(*i as u64), *t))
            .map(|(_, t)| t)
            .collect();

        assert_eq!(accepted, vec![0, 500, 1_000, 1_620, 2_900, 3_400]);
        for pair in accepted.windows(2) {
            assert!(pair[1] - pair[0] >= 500);
        }
    }

    #[test]
    fn test_clock_moving_backwards_keeps_gate_shut() {
        let mut sampler = FrameSampler::from_millis(500);
        let frame = create_test_frame(0);

        assert!(sampler.accept(&frame, 10_000));
        assert!(!sampler.accept(&frame, 9_000));
        assert!(!sampler.accept(&frame, 10_499));
        assert!(sampler.accept(&frame, 10_500));
    }
}
