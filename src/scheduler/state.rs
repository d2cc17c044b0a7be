use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum SchedulerStatus {
    #[default]
    Stopped,
    Running,
}

/// Worker slot guarded by the scheduler's lock.
///
/// `Draining` holds a cancelled worker that outlived the stop timeout; it still owns its
/// in-flight tick and must be joined before another worker is spawned.
#[derive(Default)]
pub(crate) enum WorkerState {
    #[default]
    Stopped,
    Running {
        handle: JoinHandle<()>,
        cancel: CancellationToken,
    },
    Draining {
        handle: JoinHandle<()>,
    },
}

impl WorkerState {
    pub(crate) fn status(&self) -> SchedulerStatus {
        match self {
            WorkerState::Stopped | WorkerState::Draining { .. } => SchedulerStatus::Stopped,
            WorkerState::Running { .. } => SchedulerStatus::Running,
        }
    }
}
