pub mod controller;
mod loop_worker;
pub mod state;

pub use controller::{Scheduler, MAX_INTERVAL_SECS, MIN_INTERVAL_SECS, STOP_TIMEOUT};
pub use loop_worker::{TickPipeline, TickReport};
pub use state::SchedulerStatus;
