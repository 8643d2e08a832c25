//! Recovery rule for failed inference calls.

use tracing::warn;

use strokex_inference::InferenceError;

/// Response substituted for any failed inference call. Parses to `"None"`.
pub const FALLBACK_RESPONSE: &str = "The final answer is: None";

/// Where a call happened, for logging.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    /// 0-based report position in the input.
    pub report_index: usize,
    pub accession_number: &'a str,
    pub key: &'a str,
}

/// Response text after the fallback rule has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResponse {
    pub text: String,
    /// True when `text` is the fallback substitute.
    pub failed: bool,
}

/// Turn an inference outcome into response text.
///
/// Successful output passes through untouched. Any error is logged and
/// replaced with [`FALLBACK_RESPONSE`]; it never reaches the caller.
pub fn resolve_response(outcome: Result<String, InferenceError>, site: CallSite<'_>) -> ModelResponse {
    match outcome {
        Ok(text) => ModelResponse {
            text,
            failed: false,
        },
        Err(e) => {
            warn!(
                report = site.report_index,
                accession = site.accession_number,
                key = site.key,
                "Inference failed: {}",
                e
            );
            ModelResponse {
                text: FALLBACK_RESPONSE.to_string(),
                failed: true,
            }
        }
    }
}
