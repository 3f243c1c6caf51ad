use std::path::PathBuf;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// What the response cache does once it holds `cache_capacity` answers.
#[derive(Clone, Copy, Deserialize, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CachePolicy {
    /// Evict the least recently used answer.
    #[default]
    Lru,
    /// Keep the first `cache_capacity` answers and ignore further writes.
    Saturate,
}

#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default = "default_openai_base_url")]
    pub openai_base_url: String,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default = "default_google_base_url")]
    pub google_base_url: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default)]
    pub vector_index_path: Option<String>,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Ordered embedding candidates, most preferred first.
    #[serde(default = "default_embedding_models")]
    pub embedding_models: Vec<String>,
    #[serde(default)]
    pub embedding_dimensions: Option<u32>,
    /// Ordered generation candidates, fastest/cheapest first.
    #[serde(default = "default_generation_models")]
    pub generation_models: Vec<String>,
    #[serde(default = "default_retrieval_k")]
    pub retrieval_k: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
    #[serde(default)]
    pub cache_policy: CachePolicy,
    #[serde(default)]
    pub cache_degraded_answers: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fallback_excerpt_chars")]
    pub fallback_excerpt_chars: usize,
    #[serde(default = "default_language_probe_chars")]
    pub language_probe_chars: usize,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: default_openai_base_url(),
            google_api_key: None,
            google_base_url: default_google_base_url(),
            data_dir: default_data_dir(),
            vector_index_path: None,
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            http_port: default_http_port(),
            embedding_models: default_embedding_models(),
            embedding_dimensions: None,
            generation_models: default_generation_models(),
            retrieval_k: default_retrieval_k(),
            cache_capacity: default_cache_capacity(),
            cache_policy: CachePolicy::default(),
            cache_degraded_answers: false,
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            cooldown_secs: default_cooldown_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            fallback_excerpt_chars: default_fallback_excerpt_chars(),
            language_probe_chars: default_language_probe_chars(),
            temperature: default_temperature(),
            system_prompt: None,
        }
    }
}

impl AppConfig {
    /// The OpenAI key, unless it is missing or still a template placeholder.
    pub fn openai_credential(&self) -> Option<&str> {
        usable_credential(self.openai_api_key.as_deref())
    }

    /// The Google key, unless it is missing or still a template placeholder.
    pub fn google_credential(&self) -> Option<&str> {
        usable_credential(self.google_api_key.as_deref())
    }

    pub fn vector_index_path(&self) -> PathBuf {
        self.vector_index_path.as_ref().map_or_else(
            || PathBuf::from(&self.data_dir).join(".vector_index.json"),
            PathBuf::from,
        )
    }
}

fn usable_credential(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|key| !key.is_empty() && !key.to_ascii_lowercase().contains("placeholder"))
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_google_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_data_dir() -> String {
    "./data".to_string()
}

const fn default_chunk_size() -> usize {
    1000
}

const fn default_chunk_overlap() -> usize {
    200
}

const fn default_http_port() -> u16 {
    8000
}

fn default_embedding_models() -> Vec<String> {
    vec![
        "google:text-embedding-004".to_string(),
        "openai:text-embedding-3-small".to_string(),
    ]
}

fn default_generation_models() -> Vec<String> {
    vec![
        "google:gemini-2.0-flash-lite".to_string(),
        "google:gemini-2.0-flash".to_string(),
        "google:gemini-2.5-flash".to_string(),
        "openai:gpt-4o-mini".to_string(),
    ]
}

const fn default_retrieval_k() -> usize {
    3
}

const fn default_cache_capacity() -> usize {
    150
}

const fn default_max_attempts() -> usize {
    3
}

const fn default_initial_backoff_ms() -> u64 {
    500
}

const fn default_max_backoff_ms() -> u64 {
    2_000
}

const fn default_cooldown_secs() -> u64 {
    30
}

const fn default_request_timeout_secs() -> u64 {
    25
}

const fn default_fallback_excerpt_chars() -> usize {
    400
}

const fn default_language_probe_chars() -> usize {
    50
}

const fn default_temperature() -> f32 {
    0.3
}

pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(
            Environment::default()
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("embedding_models")
                .with_list_parse_key("generation_models"),
        )
        .build()?;

    config.try_deserialize()
}
