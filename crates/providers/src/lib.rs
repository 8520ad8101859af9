pub mod ollama;
pub mod provider;
pub mod runtime;

pub use ollama::OllamaClient;
pub use provider::{GenerationProvider, ProgressFn};
