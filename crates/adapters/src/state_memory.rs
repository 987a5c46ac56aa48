//! In-memory state store for testing and dry experiments

use async_trait::async_trait;
use crypto_scout_domain::{RunState, StateError, StateStore};
use std::sync::RwLock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// In-memory state store implementation
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    state: RwLock<RunState>,
    saves: AtomicUsize,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: RunState) -> Self {
        Self {
            state: RwLock::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    /// Current document
    pub fn snapshot(&self) -> RunState {
        self.state
            .read()
            .map(|state| state.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Number of completed saves
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn load(&self) -> RunState {
        self.snapshot()
    }

    async fn save(&self, state: &RunState) -> Result<(), StateError> {
        let mut current = self
            .state
            .write()
            .map_err(|e| StateError::Serialization(e.to_string()))?;
        *current = state.clone();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
