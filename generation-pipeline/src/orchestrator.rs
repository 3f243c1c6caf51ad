use std::{
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use common::types::answer::{Answer, ChatRequest};
use retrieval_pipeline::{EmbeddingRetrievalAdapter, RetrievedChunk};
use tokio::time::{timeout, Instant};
use tokio_retry::RetryIf;
use tracing::{debug, info, instrument, warn};

use crate::{
    backend::GenerationError,
    cache::{normalize_query, ResponseCache},
    canned::{greeting_reply, no_context_answer},
    config::AnswerTuning,
    extractive::extractive_answer,
    language::detect_language,
    model_pool::{ModelHandle, ModelPool},
    prompt::{compose_prompt, Prompt},
};

/// Drives one request from cache lookup to a finalized answer.
///
/// `answer` never fails: generation outages degrade to an extractive answer built from the
/// retrieved text.
pub struct Orchestrator {
    retrieval: EmbeddingRetrievalAdapter,
    pool: ModelPool,
    cache: ResponseCache,
    tuning: AnswerTuning,
}

impl Orchestrator {
    pub fn new(
        retrieval: EmbeddingRetrievalAdapter,
        pool: ModelPool,
        tuning: AnswerTuning,
    ) -> Self {
        let cache = ResponseCache::new(tuning.cache_capacity, tuning.cache_policy);
        Self {
            retrieval,
            pool,
            cache,
            tuning,
        }
    }

    pub fn retrieval(&self) -> &EmbeddingRetrievalAdapter {
        &self.retrieval
    }

    pub fn pool(&self) -> &ModelPool {
        &self.pool
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    #[instrument(skip_all, fields(query_chars = request.query.chars().count()))]
    pub async fn answer(&self, request: &ChatRequest) -> Answer {
        let key = normalize_query(&request.query);

        if let Some(reply) = greeting_reply(&key) {
            debug!("Answered greeting");
            return reply;
        }

        if let Some(cached) = self.cache.get(&key) {
            debug!("Serving cached answer");
            return cached;
        }

        let chunks = self.retrieve(&request.query).await;
        if chunks.is_empty() {
            info!("No context retrieved; asking for clarification");
            return no_context_answer();
        }

        let prompt = compose_prompt(&self.tuning.system_prompt, &chunks, request);
        let generated = match timeout(self.tuning.request_timeout, self.generate(&prompt)).await {
            Ok(generated) => generated,
            Err(_) => {
                warn!(
                    timeout_secs = self.tuning.request_timeout.as_secs(),
                    "Generation timed out"
                );
                None
            }
        };

        let (answer, degraded) = match generated {
            Some(text) => {
                let language = detect_language(&text, self.tuning.language_probe_chars);
                let sources = chunks.iter().map(|retrieved| retrieved.chunk.source.as_str());
                (Answer::new(text, sources, language), false)
            }
            None => {
                let Some(extract) =
                    extractive_answer(&request.query, &chunks, self.tuning.fallback_excerpt_chars)
                else {
                    return no_context_answer();
                };
                let language = detect_language(&extract.text, self.tuning.language_probe_chars);
                (Answer::new(extract.text, [extract.source], language), true)
            }
        };

        if !degraded || self.tuning.cache_degraded_answers {
            self.cache.put(key, answer.clone());
        }
        answer
    }

    async fn retrieve(&self, query: &str) -> Vec<RetrievedChunk<'_>> {
        let k = self.tuning.retrieval_k;
        let chunks = self.retrieval.search(query, k).await;
        if chunks.is_empty() {
            self.retrieval.corpus().search(query, k)
        } else {
            chunks
        }
    }

    /// Walks eligible models in preference order; `None` once every one has failed.
    async fn generate(&self, prompt: &Prompt) -> Option<String> {
        let candidates = self.pool.eligible(Instant::now());
        if candidates.is_empty() {
            warn!(pool_size = self.pool.len(), "No generation model available");
            return None;
        }

        for handle in candidates {
            match self.attempt_model(&handle, prompt).await {
                Ok(text) if !text.trim().is_empty() => {
                    debug!(model = handle.name(), "Generation succeeded");
                    return Some(text.trim().to_owned());
                }
                Ok(_) => warn!(model = handle.name(), "Model returned an empty answer"),
                Err(GenerationError::RateLimited(reason)) => {
                    warn!(model = handle.name(), %reason, "Model still rate limited; trying next");
                }
                Err(GenerationError::CoolingDown) => {
                    debug!(model = handle.name(), "Model entered cooldown; skipping");
                }
                Err(GenerationError::Failed(reason)) => {
                    warn!(model = handle.name(), %reason, "Model failed; trying next");
                }
            }
        }

        warn!("All generation models exhausted");
        None
    }

    /// Calls one model with bounded, backed-off retries on rate limiting. The cooldown table
    /// is consulted before every attempt, and a model that was throttled at any point without
    /// then producing an answer is put on cooldown.
    async fn attempt_model(
        &self,
        handle: &ModelHandle,
        prompt: &Prompt,
    ) -> Result<String, GenerationError> {
        let pool = &self.pool;
        let name = handle.name();
        let backend = handle.backend();
        let guard = ThrottleGuard::new(pool, name, self.tuning.cooldown);
        let throttle = &guard;

        let result = RetryIf::spawn(
            self.tuning.retry_strategy(),
            move || async move {
                if !pool.is_eligible(name, Instant::now()) {
                    return Err(GenerationError::CoolingDown);
                }
                let outcome = backend.generate(prompt).await;
                if matches!(outcome, Err(GenerationError::RateLimited(_))) {
                    throttle.mark();
                }
                outcome
            },
            GenerationError::is_rate_limited,
        )
        .await;

        if matches!(&result, Ok(text) if !text.trim().is_empty()) {
            guard.clear();
        }
        result
    }
}

/// Cools a model down when dropped after a throttled attempt. Dropping also happens when the
/// request timeout cancels the rotation mid-backoff.
struct ThrottleGuard<'a> {
    pool: &'a ModelPool,
    name: &'a str,
    cooldown: Duration,
    throttled: AtomicBool,
}

impl<'a> ThrottleGuard<'a> {
    fn new(pool: &'a ModelPool, name: &'a str, cooldown: Duration) -> Self {
        Self {
            pool,
            name,
            cooldown,
            throttled: AtomicBool::new(false),
        }
    }

    fn mark(&self) {
        self.throttled.store(true, Ordering::SeqCst);
    }

    fn clear(&self) {
        self.throttled.store(false, Ordering::SeqCst);
    }
}

impl Drop for ThrottleGuard<'_> {
    fn drop(&mut self) {
        if *self.throttled.get_mut() {
            self.pool.cool_down(self.name, Instant::now() + self.cooldown);
            warn!(
                model = self.name,
                cooldown_secs = self.cooldown.as_secs(),
                "Model rate limited; cooling down"
            );
        }
    }
}
