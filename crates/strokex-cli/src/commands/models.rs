//! Models command - list models installed on the backend.

use clap::Args;
use console::style;

use strokex_core::OllamaClient;

/// Arguments for the models command.
#[derive(Args)]
pub struct ModelsArgs {
    /// Backend base URL
    #[arg(long)]
    host: Option<String>,
}

pub async fn run(args: ModelsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = super::load_config(config_path)?;
    let host = args.host.unwrap_or(config.backend.host);

    let client = OllamaClient::new(&host, config.backend.timeout_secs)?;
    let models = client.list_models().await?;

    println!("{} {}", style("Models on").bold(), style(client.host()).cyan());
    println!();

    if models.is_empty() {
        println!("{} No models installed.", style("ℹ").blue());
        return Ok(());
    }

    for name in &models {
        let marker = if *name == config.backend.model
            || name.strip_suffix(":latest") == Some(config.backend.model.as_str())
        {
            style(" (configured)").green().bold().to_string()
        } else {
            String::new()
        };
        println!("  {} {}{}", style("▸").cyan(), name, marker);
    }

    Ok(())
}
