use anyhow::Result;

use crate::models::ContextSnapshot;

/// A source of context signals. Keys should carry the collector's namespace prefix
/// (`time_`, `system_`, `calendar_`).
pub trait Collector: Send + Sync {
    fn name(&self) -> &str;

    /// May block on I/O. Failures only drop this collector's keys for the current tick.
    fn collect(&self) -> Result<ContextSnapshot>;
}
