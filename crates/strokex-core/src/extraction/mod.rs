//! Variable extraction: prompt construction, answer normalization, and the
//! per-report pipeline that ties them to an inference backend.

mod answer;
mod fallback;
mod pipeline;
mod prompt;

pub use answer::{extract_final_answer, FINAL_ANSWER_MARKER, NO_ANSWER};
pub use fallback::{resolve_response, CallSite, ModelResponse, FALLBACK_RESPONSE};
pub use pipeline::{ExtractionPipeline, NoopObserver, PipelineObserver, RunSummary};
pub use prompt::{build_prompt, CLOSING_INSTRUCTION, CONTEXT_HEADER, REASONING_INSTRUCTION};
