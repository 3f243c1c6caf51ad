use std::{
    collections::VecDeque,
    sync::{atomic::AtomicUsize, atomic::Ordering, Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::{
    backend::{GenerationBackend, GenerationError},
    model_pool::{ModelHandle, ModelPool},
    prompt::Prompt,
};

enum Behaviour {
    Answer(String),
    RateLimited,
    Failing,
    Delayed(String, Duration),
    /// Replays outcomes in order, then keeps failing.
    Scripted(Mutex<VecDeque<Result<String, GenerationError>>>),
}

/// Scripted generation backend that counts its calls.
pub struct MockBackend {
    pub calls: AtomicUsize,
    /// Signalled on every call.
    pub called: Notify,
    behaviour: Behaviour,
}

impl MockBackend {
    fn with(behaviour: Behaviour) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            called: Notify::new(),
            behaviour,
        })
    }

    pub fn answering(text: &str) -> Arc<Self> {
        Self::with(Behaviour::Answer(text.to_owned()))
    }

    pub fn rate_limited() -> Arc<Self> {
        Self::with(Behaviour::RateLimited)
    }

    pub fn failing() -> Arc<Self> {
        Self::with(Behaviour::Failing)
    }

    pub fn delayed(text: &str, delay: Duration) -> Arc<Self> {
        Self::with(Behaviour::Delayed(text.to_owned(), delay))
    }

    pub fn scripted(outcomes: Vec<Result<String, GenerationError>>) -> Arc<Self> {
        Self::with(Behaviour::Scripted(Mutex::new(outcomes.into())))
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate(&self, _prompt: &Prompt) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.called.notify_one();
        match &self.behaviour {
            Behaviour::Answer(text) => Ok(text.clone()),
            Behaviour::RateLimited => Err(GenerationError::RateLimited("quota exceeded".into())),
            Behaviour::Failing => Err(GenerationError::Failed("upstream error".into())),
            Behaviour::Delayed(text, delay) => {
                tokio::time::sleep(*delay).await;
                Ok(text.clone())
            }
            Behaviour::Scripted(outcomes) => outcomes
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or_else(|| Err(GenerationError::Failed("script exhausted".into()))),
        }
    }
}

pub fn pool_of(models: Vec<(&str, Arc<MockBackend>)>) -> ModelPool {
    ModelPool::new(
        models
            .into_iter()
            .map(|(name, backend)| ModelHandle::new(name, backend))
            .collect(),
    )
}
