pub mod backend;
pub mod cache;
pub mod canned;
pub mod catalog;
pub mod config;
pub mod extractive;
pub mod language;
pub mod lifecycle;
pub mod model_pool;
pub mod orchestrator;
pub mod prompt;

#[cfg(test)]
mod test_support;

pub use backend::{GenerationBackend, GenerationError};
pub use catalog::{BackendFactory, GeneratorFactory, ProviderCatalog};
pub use config::AnswerTuning;
pub use lifecycle::{AnswerService, ServiceSettings, ServiceStatus};
pub use orchestrator::Orchestrator;
