//! Per-report, per-variable extraction loop.

use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info};

use strokex_inference::InferenceClient;

use super::answer::extract_final_answer;
use super::fallback::{resolve_response, CallSite};
use super::prompt::build_prompt;
use crate::error::{ConfigError, Result};
use crate::models::config::DEFAULT_COT_MAX_CHARS;
use crate::models::{ExtractionRow, ReportRecord, VariableOutcome, VariableSet};
use crate::table::{ResultAccumulator, ResultSink};

/// Hooks for progress reporting. All methods default to no-ops.
pub trait PipelineObserver {
    /// A report is about to be processed.
    fn report_started(&mut self, _index: usize, _record: &ReportRecord) {}

    /// One variable of the current report has an answer.
    fn variable_finished(&mut self, _index: usize, _key: &str, _failed: bool) {}

    /// The report's row has been persisted.
    fn report_finished(&mut self, _index: usize, _row: &ExtractionRow) {}
}

/// Observer that ignores every event.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Counters for a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Reports processed and persisted.
    pub reports: usize,
    /// Variables asked per report.
    pub variables: usize,
    /// Inference calls issued.
    pub inference_calls: usize,
    /// Calls that failed and were replaced by the fallback response.
    pub failed_calls: usize,
    pub elapsed: Duration,
}

/// Sequential extraction pipeline over a text-generation backend.
pub struct ExtractionPipeline<C> {
    client: C,
    model: String,
    reasoning_mode: bool,
    cot_max_chars: usize,
}

impl<C: InferenceClient> ExtractionPipeline<C> {
    /// Create a pipeline issuing requests for `model` through `client`.
    pub fn new(client: C, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            reasoning_mode: false,
            cot_max_chars: DEFAULT_COT_MAX_CHARS,
        }
    }

    /// Enable or disable reasoning mode.
    pub fn with_reasoning_mode(mut self, enabled: bool) -> Self {
        self.reasoning_mode = enabled;
        self
    }

    /// Set how many characters of each raw response are kept in reasoning mode.
    pub fn with_cot_max_chars(mut self, max_chars: usize) -> Self {
        self.cot_max_chars = max_chars;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn reasoning_mode(&self) -> bool {
        self.reasoning_mode
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Check that `variables` and the accumulator's schema fit this
    /// pipeline's mode. Called by `run` before any inference.
    pub fn validate<S>(&self, variables: &VariableSet, accumulator: &ResultAccumulator<S>) -> Result<()>
    where
        S: ResultSink,
    {
        if self.reasoning_mode {
            variables.require_reasoning()?;
        }

        let schema = accumulator.schema();
        if schema.reasoning_mode() != self.reasoning_mode {
            return Err(ConfigError::SchemaMismatch(format!(
                "schema reasoning mode is {}, pipeline reasoning mode is {}",
                schema.reasoning_mode(),
                self.reasoning_mode
            ))
            .into());
        }
        if !schema.variable_keys().eq(variables.keys()) {
            return Err(ConfigError::SchemaMismatch(format!(
                "schema variable columns [{}] do not match variables [{}]",
                schema.variable_keys().collect::<Vec<_>>().join(", "),
                variables.keys().collect::<Vec<_>>().join(", ")
            ))
            .into());
        }

        Ok(())
    }

    /// Process every report and persist after each one.
    pub async fn run<S: ResultSink>(
        &self,
        reports: &[ReportRecord],
        variables: &VariableSet,
        accumulator: &mut ResultAccumulator<S>,
    ) -> Result<RunSummary> {
        self.run_with_observer(reports, variables, accumulator, &mut NoopObserver)
            .await
    }

    /// Same as [`run`](Self::run), reporting progress to `observer`.
    ///
    /// Inference failures are absorbed per cell. Only configuration
    /// problems (before the first call) and sink failures end the run early.
    pub async fn run_with_observer<S, O>(
        &self,
        reports: &[ReportRecord],
        variables: &VariableSet,
        accumulator: &mut ResultAccumulator<S>,
        observer: &mut O,
    ) -> Result<RunSummary>
    where
        S: ResultSink,
        O: PipelineObserver + ?Sized,
    {
        self.validate(variables, accumulator)?;

        let start = Instant::now();
        let mut summary = RunSummary {
            variables: variables.len(),
            ..RunSummary::default()
        };

        for (index, record) in reports.iter().enumerate() {
            observer.report_started(index, record);
            let mut pending = ExtractionRow::start(record);

            for spec in variables {
                let prompt = build_prompt(&record.report_text, spec, self.reasoning_mode);
                debug!(report = index, key = %spec.key, "Prompt has {} chars", prompt.len());

                let outcome = self.client.generate(&self.model, &prompt).await;
                let response = resolve_response(
                    outcome,
                    CallSite {
                        report_index: index,
                        accession_number: &record.accession_number,
                        key: &spec.key,
                    },
                );

                summary.inference_calls += 1;
                if response.failed {
                    summary.failed_calls += 1;
                }
                observer.variable_finished(index, &spec.key, response.failed);

                pending.push(VariableOutcome {
                    answer: extract_final_answer(&response.text),
                    reasoning: self
                        .reasoning_mode
                        .then(|| bounded_prefix(&response.text, self.cot_max_chars)),
                });
            }

            accumulator.push(pending.finalize(Utc::now()))?;
            summary.reports += 1;

            if let Some(row) = accumulator.rows().last() {
                observer.report_finished(index, row);
            }
        }

        summary.elapsed = start.elapsed();
        info!(
            "Processing complete: {} reports, {} calls ({} failed) in {:?}",
            summary.reports, summary.inference_calls, summary.failed_calls, summary.elapsed
        );

        Ok(summary)
    }
}

/// First `max_chars` characters of `text`.
fn bounded_prefix(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{SinkError, StrokexError};
    use crate::models::{ResultSchema, VariableSpec};
    use crate::table::{CsvFileSink, ResultSink};
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use strokex_inference::InferenceError;

    type Responder = Box<dyn Fn(&str) -> std::result::Result<String, InferenceError> + Send + Sync>;

    /// Backend answering every prompt through a closure and recording calls.
    struct ScriptedClient {
        respond: Responder,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedClient {
        fn new(respond: impl Fn(&str) -> std::result::Result<String, InferenceError> + Send + Sync + 'static) -> Self {
            Self {
                respond: Box::new(respond),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn always(text: &'static str) -> Self {
            Self::new(move |_| Ok(text.to_string()))
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl InferenceClient for ScriptedClient {
        async fn generate(&self, model: &str, prompt: &str) -> std::result::Result<String, InferenceError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));
            (self.respond)(prompt)
        }
    }

    /// Sink keeping a snapshot of the table at every flush.
    #[derive(Default)]
    struct SnapshotSink {
        snapshots: Vec<Vec<ExtractionRow>>,
    }

    impl ResultSink for SnapshotSink {
        fn flush(&mut self, _schema: &ResultSchema, rows: &[ExtractionRow]) -> std::result::Result<(), SinkError> {
            self.snapshots.push(rows.to_vec());
            Ok(())
        }

        fn location(&self) -> String {
            "<memory>".to_string()
        }
    }

    struct BrokenSink;

    impl ResultSink for BrokenSink {
        fn flush(&mut self, _schema: &ResultSchema, _rows: &[ExtractionRow]) -> std::result::Result<(), SinkError> {
            Err(SinkError::Write(std::io::Error::other("disk full")))
        }

        fn location(&self) -> String {
            "<broken>".to_string()
        }
    }

    fn reports(n: usize) -> Vec<ReportRecord> {
        (1..=n)
            .map(|i| ReportRecord::new(format!("MRN{}", i), format!("ACC{}", i), format!("Report R{} body.", i)))
            .collect()
    }

    fn variables(reasoning: bool) -> VariableSet {
        let specs = vec![
            VariableSpec::new("lvo").with_question("Is there a large vessel occlusion?"),
            VariableSpec::new("ich").with_question("Is there an intracranial bleed?"),
        ];
        let specs = if reasoning {
            specs.into_iter().map(|s| s.with_cot("worked example")).collect()
        } else {
            specs
        };
        VariableSet::new(specs).unwrap()
    }

    fn accumulator<S: ResultSink>(variables: &VariableSet, reasoning: bool, sink: S) -> ResultAccumulator<S> {
        let schema = ResultSchema::build("Patient MRN", "Accession Number", variables, reasoning).unwrap();
        ResultAccumulator::new(schema, sink)
    }

    #[tokio::test]
    async fn test_two_reports_two_variables() {
        let vars = variables(false);
        let mut acc = accumulator(&vars, false, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("blah blah The final answer is: 3"), "llama3.1");

        let summary = pipeline.run(&reports(2), &vars, &mut acc).await.unwrap();

        assert_eq!(summary.reports, 2);
        assert_eq!(summary.inference_calls, 4);
        assert_eq!(summary.failed_calls, 0);
        assert_eq!(acc.len(), 2);
        for row in acc.rows() {
            assert_eq!(row.outcomes.len(), 2);
            assert_eq!(row.answer(0), Some("3"));
            assert_eq!(row.answer(1), Some("3"));
            assert!(row.outcomes.iter().all(|o| o.reasoning.is_none()));
        }
        assert_eq!(acc.rows()[1].accession_number, "ACC2");

        let calls = pipeline.client().calls.lock().unwrap();
        assert!(calls.iter().all(|(model, _)| model == "llama3.1"));
        // Report order, then variable order.
        assert!(calls[0].1.contains("R1") && calls[0].1.contains("large vessel"));
        assert!(calls[1].1.contains("R1") && calls[1].1.contains("bleed"));
        assert!(calls[2].1.contains("R2") && calls[2].1.contains("large vessel"));
    }

    #[tokio::test]
    async fn test_single_failure_is_isolated() {
        let vars = variables(false);
        let mut acc = accumulator(&vars, false, SnapshotSink::default());
        let client = ScriptedClient::new(|prompt| {
            if prompt.contains("R2") && prompt.contains("bleed") {
                Err(InferenceError::Timeout(300))
            } else {
                Ok("The final answer is: 1".to_string())
            }
        });
        let pipeline = ExtractionPipeline::new(client, "llama3.1");

        let summary = pipeline.run(&reports(3), &vars, &mut acc).await.unwrap();

        assert_eq!(summary.reports, 3);
        assert_eq!(summary.failed_calls, 1);
        let answers: Vec<Vec<&str>> = acc
            .rows()
            .iter()
            .map(|r| r.outcomes.iter().map(|o| o.answer.as_str()).collect())
            .collect();
        assert_eq!(answers, vec![vec!["1", "1"], vec!["1", "None"], vec!["1", "1"]]);
    }

    #[tokio::test]
    async fn test_sink_holds_i_complete_rows_after_report_i() {
        let vars = variables(false);
        let mut acc = accumulator(&vars, false, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("The final answer is: 0"), "m");

        pipeline.run(&reports(4), &vars, &mut acc).await.unwrap();

        let snapshots = &acc.sink().snapshots;
        assert_eq!(snapshots.len(), 4);
        for (i, snapshot) in snapshots.iter().enumerate() {
            assert_eq!(snapshot.len(), i + 1);
            assert!(snapshot.iter().all(|row| row.outcomes.len() == vars.len()));
            assert_eq!(snapshot[i].patient_id, format!("MRN{}", i + 1));
        }
    }

    #[tokio::test]
    async fn test_reasoning_trace_is_bounded() {
        let vars = variables(true);
        let mut acc = accumulator(&vars, true, SnapshotSink::default());
        let marker = "The final answer is: 2";
        let response = format!("{}{}", "r".repeat(3000 - marker.len()), marker);
        assert_eq!(response.chars().count(), 3000);

        let expected_trace: String = response.chars().take(1500).collect();
        let pipeline = ExtractionPipeline::new(ScriptedClient::new(move |_| Ok(response.clone())), "m")
            .with_reasoning_mode(true);

        pipeline.run(&reports(1), &vars, &mut acc).await.unwrap();

        let row = &acc.rows()[0];
        for outcome in &row.outcomes {
            assert_eq!(outcome.answer, "2");
            assert_eq!(outcome.reasoning.as_deref(), Some(expected_trace.as_str()));
        }
        let prompts = pipeline.client().calls.lock().unwrap();
        assert!(prompts[0].1.contains("**Chain-of-Thought**:\nworked example"));
    }

    #[tokio::test]
    async fn test_failed_call_trace_is_fallback_text() {
        let vars = variables(true);
        let mut acc = accumulator(&vars, true, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(
            ScriptedClient::new(|_| Err(InferenceError::Connection("http://localhost:11435".to_string()))),
            "m",
        )
        .with_reasoning_mode(true);

        let summary = pipeline.run(&reports(1), &vars, &mut acc).await.unwrap();

        assert_eq!(summary.failed_calls, 2);
        let outcome = &acc.rows()[0].outcomes[0];
        assert_eq!(outcome.answer, "None");
        assert_eq!(outcome.reasoning.as_deref(), Some("The final answer is: None"));
    }

    #[tokio::test]
    async fn test_missing_cot_fails_before_inference() {
        let vars = variables(false);
        let mut acc = accumulator(&vars, true, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("The final answer is: 1"), "m")
            .with_reasoning_mode(true);

        let err = pipeline.run(&reports(2), &vars, &mut acc).await.unwrap_err();

        assert!(matches!(err, StrokexError::Config(ConfigError::MissingCot)));
        assert_eq!(pipeline.client().call_count(), 0);
        assert!(acc.sink().snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_schema_mismatch_fails_before_inference() {
        let vars = variables(false);
        let other = VariableSet::new(vec![VariableSpec::new("lvo")]).unwrap();
        let mut acc = accumulator(&other, false, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("x"), "m");

        let err = pipeline.run(&reports(1), &vars, &mut acc).await.unwrap_err();

        assert!(matches!(err, StrokexError::Config(ConfigError::SchemaMismatch(_))));
        assert_eq!(pipeline.client().call_count(), 0);
    }

    #[tokio::test]
    async fn test_reordered_schema_fails_before_inference() {
        let vars = variables(false);
        let swapped = VariableSet::new(vec![VariableSpec::new("ich"), VariableSpec::new("lvo")]).unwrap();
        let mut acc = accumulator(&swapped, false, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("The final answer is: 1"), "m");

        let err = pipeline.run(&reports(1), &vars, &mut acc).await.unwrap_err();

        assert!(matches!(err, StrokexError::Config(ConfigError::SchemaMismatch(_))));
        assert_eq!(pipeline.client().call_count(), 0);
        assert!(acc.sink().snapshots.is_empty());
    }

    #[tokio::test]
    async fn test_sink_failure_stops_run() {
        let vars = variables(false);
        let mut acc = accumulator(&vars, false, BrokenSink);
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("The final answer is: 1"), "m");

        let err = pipeline.run(&reports(3), &vars, &mut acc).await.unwrap_err();

        assert!(matches!(err, StrokexError::Sink(_)));
        // Only the first report was attempted.
        assert_eq!(pipeline.client().call_count(), 2);
    }

    #[tokio::test]
    async fn test_csv_output_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.csv");
        let vars = variables(false);
        let mut acc = accumulator(&vars, false, CsvFileSink::create(&path).unwrap());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("The final answer is: 3"), "m");

        pipeline.run(&reports(2), &vars, &mut acc).await.unwrap();

        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, vec!["Patient MRN", "Accession Number", "lvo", "ich", "timestamp"]);
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[1][2], "3");
        assert_eq!(&rows[1][3], "3");
        assert!(!rows[1][4].is_empty());
    }

    #[tokio::test]
    async fn test_no_reports_writes_nothing() {
        let vars = variables(false);
        let mut acc = accumulator(&vars, false, SnapshotSink::default());
        let pipeline = ExtractionPipeline::new(ScriptedClient::always("x"), "m");

        let summary = pipeline.run(&[], &vars, &mut acc).await.unwrap();

        assert_eq!(summary.reports, 0);
        assert!(acc.sink().snapshots.is_empty());
    }

    #[test]
    fn test_bounded_prefix_counts_characters() {
        assert_eq!(bounded_prefix("abc", 5), "abc");
        assert_eq!(bounded_prefix("abcdef", 3), "abc");
        assert_eq!(bounded_prefix("", 3), "");

        let wide = "é中".repeat(1000);
        let prefix = bounded_prefix(&wide, 1500);
        assert_eq!(prefix.chars().count(), 1500);
        assert!(wide.starts_with(&prefix));
    }
}
