//! Preview command - print the prompt for one report and variable.

use std::path::PathBuf;

use clap::Args;
use console::style;

use strokex_core::{build_prompt, load_reports, load_variables};

/// Arguments for the preview command.
#[derive(Args)]
pub struct PreviewArgs {
    /// Directory containing the report table
    #[arg(long)]
    data_path: PathBuf,

    /// Report table file name (CSV or .xlsx), relative to --data-path
    #[arg(long)]
    reports: PathBuf,

    /// Variable spec table
    #[arg(long)]
    variables: PathBuf,

    /// Variable key to build the prompt for
    #[arg(short, long)]
    key: String,

    /// Zero-based report row
    #[arg(short, long, default_value = "0")]
    row: usize,

    /// Build the reasoning-mode prompt
    #[arg(long)]
    cot: bool,
}

pub async fn run(args: PreviewArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let reasoning_mode = args.cot || config.extraction.reasoning_mode;

    let reports = load_reports(&args.data_path.join(&args.reports), &config.input)?;
    let variables = load_variables(&args.variables)?;
    if reasoning_mode {
        variables.require_reasoning()?;
    }

    let Some(spec) = variables.get(&args.key) else {
        anyhow::bail!(
            "Unknown variable key: {} (available: {})",
            args.key,
            variables.keys().collect::<Vec<_>>().join(", ")
        );
    };
    let Some(record) = reports.get(args.row) else {
        anyhow::bail!(
            "Report row {} out of range ({} reports loaded)",
            args.row,
            reports.len()
        );
    };

    eprintln!(
        "{} {} / {} ({})",
        style("▸").bold().cyan(),
        record.accession_number,
        spec.key,
        if reasoning_mode { "reasoning" } else { "direct" }
    );
    println!("{}", build_prompt(&record.report_text, spec, reasoning_mode));

    Ok(())
}
