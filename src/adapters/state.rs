use std::sync::RwLock;

use crate::models::Settings;

/// Last-applied settings shared between the tick worker and foreground readers.
pub(crate) struct AdapterState {
    current: RwLock<Settings>,
}

impl AdapterState {
    pub(crate) fn new(initial: Settings) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub(crate) fn snapshot(&self) -> Settings {
        match self.current.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Merge `changes` and return the names whose value actually changed.
    pub(crate) fn merge(&self, changes: &Settings) -> Vec<String> {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut changed = Vec::new();
        for (name, value) in changes {
            if guard.get(name) != Some(value) {
                guard.insert(name.clone(), value.clone());
                changed.push(name.clone());
            }
        }
        changed
    }
}
