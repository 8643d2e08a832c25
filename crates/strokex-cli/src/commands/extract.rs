//! Extract command - run every variable over every report.

use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use strokex_core::models::{ExtractionRow, ReportRecord, ResultSchema, StrokexConfig};
use strokex_core::{
    load_reports, load_variables, ExtractionPipeline, FileSink, OllamaClient, PipelineObserver,
    ResultAccumulator, ResultSink,
};

/// Arguments for the extract command.
#[derive(Args)]
pub struct ExtractArgs {
    /// Directory containing the report table
    #[arg(long)]
    data_path: PathBuf,

    /// Report table file name (CSV or .xlsx), relative to --data-path
    #[arg(long)]
    reports: PathBuf,

    /// Variable spec table
    #[arg(long)]
    variables: PathBuf,

    /// Model identifier
    #[arg(short, long)]
    model: Option<String>,

    /// Backend base URL
    #[arg(long)]
    host: Option<String>,

    /// Output file (.xlsx writes a workbook, anything else CSV)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Ask for and record the model's reasoning trace
    #[arg(long)]
    cot: bool,

    /// Per-request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

impl ExtractArgs {
    /// Apply command-line overrides on top of the loaded configuration.
    fn apply(&self, config: &mut StrokexConfig) {
        if let Some(ref model) = self.model {
            config.backend.model = model.clone();
        }
        if let Some(ref host) = self.host {
            config.backend.host = host.clone();
        }
        if let Some(timeout) = self.timeout {
            config.backend.timeout_secs = timeout;
        }
        if let Some(ref output) = self.output {
            config.output.path = output.clone();
        }
        if self.cot {
            config.extraction.reasoning_mode = true;
        }
    }
}

/// Progress bar over reports, ticking once per persisted row.
struct ProgressObserver {
    bar: ProgressBar,
}

impl PipelineObserver for ProgressObserver {
    fn report_started(&mut self, _index: usize, record: &ReportRecord) {
        self.bar.set_message(record.accession_number.clone());
    }

    fn report_finished(&mut self, _index: usize, _row: &ExtractionRow) {
        self.bar.inc(1);
    }
}

pub async fn run(args: ExtractArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    // Load configuration
    let mut config = super::load_config(config_path)?;
    args.apply(&mut config);

    let reports = load_reports(&args.data_path.join(&args.reports), &config.input)?;
    let variables = load_variables(&args.variables)?;

    let reasoning_mode = config.extraction.reasoning_mode;
    if reasoning_mode {
        variables.require_reasoning()?;
    }

    let schema = ResultSchema::build(
        &config.input.patient_id_column,
        &config.input.accession_column,
        &variables,
        reasoning_mode,
    )?;
    let sink = FileSink::create(&config.output.path)?;
    let mut accumulator = ResultAccumulator::new(schema, sink);

    let client = OllamaClient::new(&config.backend.host, config.backend.timeout_secs)?;
    info!("Using model: {}", config.backend.model);
    info!("Reasoning mode enabled: {}", reasoning_mode);

    let pipeline = ExtractionPipeline::new(client, config.backend.model.clone())
        .with_reasoning_mode(reasoning_mode)
        .with_cot_max_chars(config.extraction.cot_max_chars);

    println!(
        "{} Extracting {} variables from {} reports with {}",
        style("ℹ").blue(),
        variables.len(),
        reports.len(),
        style(pipeline.model()).cyan()
    );

    let bar = ProgressBar::new(reports.len() as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} reports {msg}")?
            .progress_chars("=>-"),
    );
    let mut observer = ProgressObserver { bar };

    let summary = pipeline
        .run_with_observer(&reports, &variables, &mut accumulator, &mut observer)
        .await?;
    observer.bar.finish_with_message("Complete");

    // Print summary
    println!();
    println!(
        "{} Processed {} reports in {:?}",
        style("✓").green(),
        summary.reports,
        summary.elapsed
    );
    println!(
        "   {} inference calls, {} failed",
        style(summary.inference_calls).green(),
        style(summary.failed_calls).red()
    );
    if summary.reports > 0 {
        println!(
            "   Results written to {}",
            style(accumulator.sink().location()).bold()
        );
    } else {
        println!("   No reports to process, nothing written");
    }

    Ok(())
}
