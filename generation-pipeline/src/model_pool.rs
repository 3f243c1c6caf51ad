use std::{
    collections::HashMap,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use common::error::AppError;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::backend::GenerationBackend;

/// A constructed generation backend and the candidate name it was built from.
#[derive(Clone)]
pub struct ModelHandle {
    name: String,
    backend: Arc<dyn GenerationBackend>,
}

impl ModelHandle {
    pub fn new(name: impl Into<String>, backend: Arc<dyn GenerationBackend>) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &Arc<dyn GenerationBackend> {
        &self.backend
    }
}

impl fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelHandle").field("name", &self.name).finish_non_exhaustive()
    }
}

/// Ordered generation models plus the time until which each one is sidelined.
#[derive(Debug, Default)]
pub struct ModelPool {
    handles: Vec<ModelHandle>,
    cooldowns: Mutex<HashMap<String, Instant>>,
}

impl ModelPool {
    pub fn new(handles: Vec<ModelHandle>) -> Self {
        Self {
            handles,
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    /// Keeps every candidate whose construction succeeds, in candidate order.
    pub fn assemble<F>(candidates: &[String], mut build: F) -> Self
    where
        F: FnMut(&str) -> Result<Arc<dyn GenerationBackend>, AppError>,
    {
        let handles = candidates
            .iter()
            .filter_map(|candidate| match build(candidate.as_str()) {
                Ok(backend) => {
                    info!(%candidate, "Generation model added to pool");
                    Some(ModelHandle::new(candidate.clone(), backend))
                }
                Err(err) => {
                    warn!(%candidate, error = %err, "Generation candidate unavailable");
                    None
                }
            })
            .collect();

        Self::new(handles)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.name.clone()).collect()
    }

    /// Models not on cooldown at `now`, in preference order.
    pub fn eligible(&self, now: Instant) -> Vec<ModelHandle> {
        let cooldowns = self.lock();
        self.handles
            .iter()
            .filter(|handle| !on_cooldown(&cooldowns, &handle.name, now))
            .cloned()
            .collect()
    }

    pub fn is_eligible(&self, name: &str, now: Instant) -> bool {
        !on_cooldown(&self.lock(), name, now)
    }

    /// Sidelines `name` until `until`; an existing later cooldown is kept.
    pub fn cool_down(&self, name: &str, until: Instant) {
        let mut cooldowns = self.lock();
        let entry = cooldowns.entry(name.to_owned()).or_insert(until);
        if *entry < until {
            *entry = until;
        }
    }

    pub fn available_at(&self, name: &str) -> Option<Instant> {
        self.lock().get(name).copied()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.cooldowns.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn on_cooldown(cooldowns: &HashMap<String, Instant>, name: &str, now: Instant) -> bool {
    matches!(cooldowns.get(name), Some(until) if *until > now)
}
