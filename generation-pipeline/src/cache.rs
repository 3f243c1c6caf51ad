use std::{
    num::NonZeroUsize,
    sync::{Mutex, PoisonError},
};

use common::{types::answer::Answer, utils::config::CachePolicy};
use lru::LruCache;
use tracing::info;

/// Bounded map from normalized query to finalized answer.
///
/// A capacity of zero disables caching entirely.
pub struct ResponseCache {
    policy: CachePolicy,
    inner: Option<Mutex<CacheInner>>,
}

struct CacheInner {
    entries: LruCache<String, Answer>,
    saturation_logged: bool,
}

impl ResponseCache {
    pub fn new(capacity: usize, policy: CachePolicy) -> Self {
        let inner = NonZeroUsize::new(capacity).map(|capacity| {
            Mutex::new(CacheInner {
                entries: LruCache::new(capacity),
                saturation_logged: false,
            })
        });
        Self { policy, inner }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.inner
            .as_ref()
            .map_or(0, |inner| lock(inner).entries.cap().get())
    }

    pub fn len(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| lock(inner).entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<Answer> {
        let inner = self.inner.as_ref()?;
        let mut guard = lock(inner);
        match self.policy {
            CachePolicy::Lru => guard.entries.get(key).cloned(),
            CachePolicy::Saturate => guard.entries.peek(key).cloned(),
        }
    }

    pub fn put(&self, key: String, answer: Answer) {
        let Some(inner) = self.inner.as_ref() else {
            return;
        };
        let mut guard = lock(inner);

        match self.policy {
            CachePolicy::Lru => {
                guard.entries.put(key, answer);
            }
            CachePolicy::Saturate => {
                if guard.entries.contains(&key) {
                    return;
                }
                if guard.entries.len() >= guard.entries.cap().get() {
                    if !guard.saturation_logged {
                        guard.saturation_logged = true;
                        info!(
                            capacity = guard.entries.cap().get(),
                            "Response cache is full; new answers will not be cached"
                        );
                    }
                    return;
                }
                guard.entries.put(key, answer);
            }
        }
    }
}

fn lock(inner: &Mutex<CacheInner>) -> std::sync::MutexGuard<'_, CacheInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cache key for a query: trimmed, internal whitespace collapsed, lower-cased.
pub fn normalize_query(query: &str) -> String {
    query
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::types::answer::Language;
    use proptest::prelude::*;

    fn answer(text: &str) -> Answer {
        Answer::new(text, ["data/fees.txt"], Language::En)
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  What are   the\tFEES? "), "what are the fees?");
        assert_eq!(normalize_query(""), "");
    }

    #[test]
    fn test_lru_policy_evicts_least_recently_used() {
        let cache = ResponseCache::new(2, CachePolicy::Lru);
        cache.put("a".into(), answer("A"));
        cache.put("b".into(), answer("B"));
        assert!(cache.get("a").is_some());
        cache.put("c".into(), answer("C"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("b").is_none());
        assert_eq!(cache.get("a").map(|a| a.response), Some("A".into()));
        assert_eq!(cache.get("c").map(|a| a.response), Some("C".into()));
    }

    #[test]
    fn test_saturate_policy_ignores_writes_once_full() {
        let cache = ResponseCache::new(2, CachePolicy::Saturate);
        cache.put("a".into(), answer("A"));
        cache.put("b".into(), answer("B"));
        cache.put("c".into(), answer("C"));
        cache.put("a".into(), answer("A2"));

        assert_eq!(cache.len(), 2);
        assert!(cache.get("c").is_none());
        assert_eq!(cache.get("a").map(|a| a.response), Some("A".into()));
    }

    #[test]
    fn test_zero_capacity_disables_cache() {
        let cache = ResponseCache::new(0, CachePolicy::Lru);
        cache.put("a".into(), answer("A"));
        assert!(cache.get("a").is_none());
        assert_eq!(cache.capacity(), 0);
        assert!(cache.is_empty());
    }

    proptest! {
        #[test]
        fn prop_size_never_exceeds_capacity(
            capacity in 0usize..8,
            saturate in any::<bool>(),
            keys in proptest::collection::vec("[a-e]{1,2}", 0..64),
        ) {
            let policy = if saturate { CachePolicy::Saturate } else { CachePolicy::Lru };
            let cache = ResponseCache::new(capacity, policy);
            for key in keys {
                cache.put(key.clone(), answer(&key));
                prop_assert!(cache.len() <= capacity);
                if let Some(hit) = cache.get(&key) {
                    prop_assert_eq!(hit.response, key);
                }
            }
        }
    }
}
