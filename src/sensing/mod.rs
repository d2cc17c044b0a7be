pub mod aggregator;
pub mod calendar;
pub mod collector;
pub mod system;
pub mod time;

pub use aggregator::{Aggregation, ContextAggregator};
pub use calendar::CalendarCollector;
pub use collector::Collector;
pub use system::SystemCollector;
pub use time::TimeCollector;
