pub mod handles;
pub mod models;
pub mod paging;
pub mod queries;
pub mod stats;

use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

pub use models::{Permission, Target, Workspace};

/// Process-wide workspace state.
///
/// Every handler runs its whole read-validate-mutate sequence inside one
/// `with_state` call, so handler bodies never interleave.
pub struct Store {
    state: Mutex<Workspace>,
}

impl Store {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Workspace::default()),
        }
    }

    pub fn with_state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Workspace) -> T,
    {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| {
            warn!("Workspace lock poisoned, recovering");
            PoisonError::into_inner(poisoned)
        });
        f(&mut state)
    }

    /// Drop everything and start from an empty workspace.
    pub fn reset(&self) {
        self.with_state(|ws| *ws = Workspace::default());
        info!("Workspace cleared");
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

/// Current wall-clock time in unix seconds.
pub fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}
