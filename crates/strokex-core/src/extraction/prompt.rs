//! Prompt construction for a single (report, variable) pair.

use crate::models::VariableSpec;

/// Opening line naming the document domain.
pub const CONTEXT_HEADER: &str = "**Context**: The following is a stroke clinical report.";

/// Added in reasoning mode, before the closing format instruction.
pub const REASONING_INSTRUCTION: &str = "Please output your complete thought process. ";

/// Closing format instruction. Always the last text of every prompt.
pub const CLOSING_INSTRUCTION: &str = "At the end of the output, use this as the conclusion format: \
'The final answer is: ' followed by the number of the answer. \
If you can't find any relevant content, use this as the conclusion format: 'The final answer is: None'. \
Use plain text output. \
Please output in strict accordance with the required format: 'The final answer is: A NUMBER INDEX'.";

/// Build the prompt asking `spec`'s question about `report_text`.
///
/// Segment order is fixed: context and report, question, answer choices,
/// the worked chain-of-thought example (reasoning mode only), output
/// instruction, the reasoning request (reasoning mode only), and the
/// closing format instruction. Missing fields render as empty segments.
pub fn build_prompt(report_text: &str, spec: &VariableSpec, reasoning_mode: bool) -> String {
    let cot = spec.cot.as_deref().unwrap_or("");

    let mut prompt = String::with_capacity(
        report_text.len()
            + spec.question.len()
            + spec.answer_choices.len()
            + spec.final_output.len()
            + cot.len()
            + CLOSING_INSTRUCTION.len()
            + 256,
    );

    prompt.push_str(CONTEXT_HEADER);
    prompt.push_str("\n\n");
    prompt.push_str(report_text);
    prompt.push_str("\n\n");

    prompt.push_str(&format!("**Question**: {}\n\n", spec.question));
    prompt.push_str(&format!("**Answer Choices**:\n{}\n\n", spec.answer_choices));

    if reasoning_mode {
        prompt.push_str(&format!("**Chain-of-Thought**:\n{}\n\n", cot));
    }

    prompt.push_str(&format!("**Final Output**: {}\n\n", spec.final_output));

    if reasoning_mode {
        prompt.push_str(REASONING_INSTRUCTION);
    }
    prompt.push_str(CLOSING_INSTRUCTION);

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn occlusion_spec() -> VariableSpec {
        VariableSpec::new("lvo")
            .with_question("Is there a large vessel occlusion?")
            .with_answer_choices("0. No\n1. Yes")
            .with_final_output("Answer with the index only.")
            .with_cot("The report states the M1 segment is occluded, so the answer is 1.")
    }

    const REPORT: &str = "CTA head: abrupt cutoff of the left M1 segment.";

    #[test]
    fn test_plain_prompt_layout() {
        let prompt = build_prompt(REPORT, &occlusion_spec(), false);

        let expected = format!(
            "{}\n\n{}\n\n**Question**: Is there a large vessel occlusion?\n\n\
             **Answer Choices**:\n0. No\n1. Yes\n\n\
             **Final Output**: Answer with the index only.\n\n{}",
            CONTEXT_HEADER, REPORT, CLOSING_INSTRUCTION
        );
        assert_eq!(prompt, expected);
    }

    #[test]
    fn test_reasoning_segment_omitted_when_disabled() {
        let prompt = build_prompt(REPORT, &occlusion_spec(), false);

        assert!(!prompt.contains("Chain-of-Thought"));
        assert!(!prompt.contains("M1 segment is occluded"));
        assert!(!prompt.contains(REASONING_INSTRUCTION));
    }

    #[test]
    fn test_reasoning_segment_included_verbatim() {
        let spec = occlusion_spec();
        let prompt = build_prompt(REPORT, &spec, true);

        let block = format!("**Chain-of-Thought**:\n{}\n\n", spec.cot.as_deref().unwrap());
        let choices_at = prompt.find("**Answer Choices**").unwrap();
        let cot_at = prompt.find(&block).unwrap();
        let final_at = prompt.find("**Final Output**").unwrap();
        assert!(choices_at < cot_at && cot_at < final_at);

        let reasoning_at = prompt.find(REASONING_INSTRUCTION).unwrap();
        assert!(final_at < reasoning_at);
    }

    #[test]
    fn test_always_ends_with_closing_instruction() {
        let specs = [occlusion_spec(), VariableSpec::new("empty")];
        for spec in &specs {
            for reasoning in [false, true] {
                for report in ["", REPORT] {
                    assert!(build_prompt(report, spec, reasoning).ends_with(CLOSING_INSTRUCTION));
                }
            }
        }
    }

    #[test]
    fn test_missing_fields_render_empty() {
        let prompt = build_prompt("", &VariableSpec::new("k"), true);

        assert!(prompt.starts_with(CONTEXT_HEADER));
        assert!(prompt.contains("**Question**: \n\n"));
        assert!(prompt.contains("**Chain-of-Thought**:\n\n\n"));
    }

    #[test]
    fn test_deterministic() {
        let spec = occlusion_spec();
        assert_eq!(build_prompt(REPORT, &spec, true), build_prompt(REPORT, &spec, true));
    }
}
