pub mod dispatcher;
pub mod lighting;
pub mod sound;
mod state;
pub mod workspace;

pub use dispatcher::{AdapterDispatcher, AdapterOutcome, AdapterReport, DispatchReport};
pub use lighting::LightingAdapter;
pub use sound::SoundAdapter;
pub use workspace::WorkspaceAdapter;

use anyhow::Result;

use crate::models::Settings;

/// Something that can push settings into the user's environment.
pub trait Adapter: Send + Sync {
    fn name(&self) -> &str;

    /// Setting names this adapter understands. Only these are ever passed to `apply_settings`.
    fn supported_settings(&self) -> &[&str];

    /// Apply a subset of settings. `Ok(false)` means the adapter declined without erroring.
    fn apply_settings(&self, settings: &Settings) -> Result<bool>;

    /// Read-only snapshot of what the adapter last applied.
    fn current_settings(&self) -> Settings;
}
