//! Canonical answer extraction from free-text model output.

use lazy_static::lazy_static;
use regex::Regex;

/// Phrase that introduces the answer in a model response.
pub const FINAL_ANSWER_MARKER: &str = "The final answer is:";

/// Canonical value when no answer marker is present.
pub const NO_ANSWER: &str = "None";

lazy_static! {
    // Whitespace after the colon may span lines; the capture stops at the
    // next line break.
    static ref FINAL_ANSWER: Regex = Regex::new(
        r"(?i)The final answer is:\s*(.*)"
    ).unwrap();
}

/// Extract the canonical answer from a model response.
///
/// Returns the trimmed text following the first `The final answer is:`
/// (case-insensitive) up to the end of its line, or `"None"` when the marker
/// never appears. The answer is not checked against the answer choices.
pub fn extract_final_answer(text: &str) -> String {
    match FINAL_ANSWER.captures(text) {
        Some(caps) => caps
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default(),
        None => NO_ANSWER.to_string(),
    }
}
