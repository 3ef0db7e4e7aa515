mod clock;
mod lane;
mod metrics;
mod worker;


pub use clock::{Clock, MonotonicClock};
pub use lane::{FrameLane, LaneOutcome};
pub use metrics::{PipelineMetrics, PipelineStats};
pub use worker::PipelineWorker;
