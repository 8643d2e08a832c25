//! Text-generation backend layer for strokex.
//!
//! This crate provides a single request/response interface to a
//! text-generation service:
//! - `InferenceClient`, the trait the extraction pipeline consumes
//! - `OllamaClient`, the Ollama `/api/generate` implementation

mod backend;
mod error;

pub use backend::InferenceClient;
pub use backend::ollama::{OllamaClient, DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
pub use error::InferenceError;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
