//! Inference backend implementations.

pub mod ollama;

use std::future::Future;

use crate::Result;

/// Trait for text-generation backends.
///
/// One call is one prompt in, one free-text response out. Implementations
/// report every failure (transport, status, payload) as an `InferenceError`
/// and leave recovery to the caller.
pub trait InferenceClient: Send + Sync {
    /// Generate a response for `prompt` with the given model.
    ///
    /// # Arguments
    /// * `model` - Backend model identifier (e.g. `llama3.1`)
    /// * `prompt` - Complete prompt text
    ///
    /// # Returns
    /// The raw response text
    fn generate(&self, model: &str, prompt: &str) -> impl Future<Output = Result<String>> + Send;
}
