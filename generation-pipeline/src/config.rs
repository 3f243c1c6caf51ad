use std::time::Duration;

use common::utils::config::{AppConfig, CachePolicy};
use tokio_retry::strategy::{jitter, ExponentialBackoff};

use crate::prompt::DEFAULT_SYSTEM_PROMPT;

/// Knobs for a single answer request.
#[derive(Debug, Clone)]
pub struct AnswerTuning {
    pub retrieval_k: usize,
    /// Attempts per model, first call included.
    pub max_attempts: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub cooldown: Duration,
    pub request_timeout: Duration,
    pub fallback_excerpt_chars: usize,
    pub language_probe_chars: usize,
    pub cache_capacity: usize,
    pub cache_policy: CachePolicy,
    pub cache_degraded_answers: bool,
    pub system_prompt: String,
}

impl Default for AnswerTuning {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl AnswerTuning {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            retrieval_k: config.retrieval_k,
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            cooldown: Duration::from_secs(config.cooldown_secs),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            fallback_excerpt_chars: config.fallback_excerpt_chars,
            language_probe_chars: config.language_probe_chars,
            cache_capacity: config.cache_capacity,
            cache_policy: config.cache_policy,
            cache_degraded_answers: config.cache_degraded_answers,
            system_prompt: config
                .system_prompt
                .clone()
                .filter(|prompt| !prompt.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_owned()),
        }
    }

    /// Delays between attempts on one model: `initial_backoff`, doubling, capped at
    /// `max_backoff`, jittered, with `max_attempts - 1` entries.
    pub fn retry_strategy(&self) -> impl Iterator<Item = Duration> {
        let initial_ms = u64::try_from(self.initial_backoff.as_millis()).unwrap_or(u64::MAX);
        ExponentialBackoff::from_millis(2)
            .factor((initial_ms / 2).max(1))
            .max_delay(self.max_backoff)
            .map(jitter)
            .take(self.max_attempts.saturating_sub(1))
    }
}
