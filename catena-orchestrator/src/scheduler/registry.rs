//! Cancellation registry
//!
//! Maps the id of every job with a live worker to that worker's cancellation
//! token. A job absent from the registry has no worker that could observe a
//! stop request.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Default)]
pub struct CancellationRegistry {
    tokens: Mutex<HashMap<Uuid, CancellationToken>>,
}

impl CancellationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<Uuid, CancellationToken>> {
        self.tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Registers a fresh token for `job_id`
    pub fn register(&self, job_id: Uuid) -> CancellationToken {
        let token = CancellationToken::new();
        self.tokens().insert(job_id, token.clone());
        token
    }

    /// Cancels the worker of `job_id`; false if no worker is registered
    pub fn cancel(&self, job_id: Uuid) -> bool {
        match self.tokens().get(&job_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, job_id: Uuid) {
        self.tokens().remove(&job_id);
    }

    #[cfg(test)]
    pub fn contains(&self, job_id: Uuid) -> bool {
        self.tokens().contains_key(&job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_registered_job() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        let token = registry.register(id);

        assert!(!token.is_cancelled());
        assert!(registry.cancel(id));
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_cancel_unknown_job() {
        let registry = CancellationRegistry::new();
        assert!(!registry.cancel(Uuid::new_v4()));
    }

    #[test]
    fn test_remove() {
        let registry = CancellationRegistry::new();
        let id = Uuid::new_v4();
        registry.register(id);
        assert!(registry.contains(id));

        registry.remove(id);
        assert!(!registry.contains(id));
        assert!(!registry.cancel(id));
    }
}
