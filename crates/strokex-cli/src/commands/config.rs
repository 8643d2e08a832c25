//! Config command - manage configuration.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Subcommand};
use console::style;
use serde_json::Value;

use strokex_core::StrokexConfig;

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Initialize a new configuration file
    Init(InitArgs),

    /// Get a specific configuration value
    Get {
        /// Configuration key (e.g., "backend.model")
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// New value (parsed as JSON, otherwise taken as a string)
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[derive(Args)]
struct InitArgs {
    /// Output path for configuration file
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Overwrite existing file
    #[arg(long)]
    force: bool,
}

/// Run a config subcommand against `config_path`, or the per-user file.
pub async fn run(args: ConfigArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(default_config_path);

    match args.command {
        ConfigCommand::Show => show_config(&path),
        ConfigCommand::Init(init_args) => init_config(init_args, &path),
        ConfigCommand::Get { key } => get_config(&path, &key),
        ConfigCommand::Set { key, value } => set_config(&path, &key, &value),
        ConfigCommand::Path => show_path(&path),
    }
}

fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("strokex")
        .join("config.json")
}

fn load_or_default(path: &Path) -> anyhow::Result<StrokexConfig> {
    if path.exists() {
        Ok(StrokexConfig::from_file(path)?)
    } else {
        Ok(StrokexConfig::default())
    }
}

fn show_config(path: &Path) -> anyhow::Result<()> {
    if !path.exists() {
        println!(
            "{} No config file found, showing defaults.",
            style("ℹ").blue()
        );
    }
    let config = load_or_default(path)?;

    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn init_config(args: InitArgs, path: &Path) -> anyhow::Result<()> {
    let output_path = args.output.unwrap_or_else(|| path.to_path_buf());

    if output_path.exists() && !args.force {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            output_path.display()
        );
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    StrokexConfig::default().save(&output_path)?;

    println!(
        "{} Created configuration file at {}",
        style("✓").green(),
        output_path.display()
    );

    Ok(())
}

fn get_config(path: &Path, key: &str) -> anyhow::Result<()> {
    let json = serde_json::to_value(load_or_default(path)?)?;
    let value = lookup(&json, key)?;

    println!("{}", serde_json::to_string_pretty(value)?);

    Ok(())
}

fn set_config(path: &Path, key: &str, value: &str) -> anyhow::Result<()> {
    let config = load_or_default(path)?;
    let parsed = parse_value(value);

    let updated = assign(&config, key, parsed.clone())?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    updated.save(path)?;

    println!(
        "{} Set {} = {}",
        style("✓").green(),
        key,
        serde_json::to_string(&parsed)?
    );

    Ok(())
}

fn show_path(path: &Path) -> anyhow::Result<()> {
    println!("Configuration file: {}", path.display());

    if path.exists() {
        println!("Status: {}", style("exists").green());
    } else {
        println!("Status: {}", style("not created").yellow());
        println!();
        println!("Run 'strokex config init' to create a configuration file.");
    }

    Ok(())
}

/// JSON if it parses, a plain string otherwise.
fn parse_value(value: &str) -> Value {
    serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()))
}

/// Follow a dotted key through nested objects.
fn lookup<'a>(json: &'a Value, key: &str) -> anyhow::Result<&'a Value> {
    key.split('.').try_fold(json, |current, part| {
        current
            .get(part)
            .ok_or_else(|| anyhow::anyhow!("Configuration key not found: {}", key))
    })
}

/// Return a copy of `config` with the existing field at `key` replaced.
///
/// Unknown keys are rejected instead of being written and then dropped on
/// the next load.
fn assign(config: &StrokexConfig, key: &str, value: Value) -> anyhow::Result<StrokexConfig> {
    let mut json = serde_json::to_value(config)?;

    let (parent_key, leaf) = match key.rsplit_once('.') {
        Some((parent, leaf)) => (Some(parent), leaf),
        None => (None, key),
    };

    let mut parent = &mut json;
    if let Some(parent_key) = parent_key {
        for part in parent_key.split('.') {
            parent = parent
                .get_mut(part)
                .ok_or_else(|| anyhow::anyhow!("Configuration path not found: {}", key))?;
        }
    }

    let Some(obj) = parent.as_object_mut() else {
        anyhow::bail!("Cannot set value at non-object path: {}", key);
    };
    let Some(slot) = obj.get_mut(leaf) else {
        anyhow::bail!("Configuration key not found: {}", key);
    };
    *slot = value;

    serde_json::from_value(json)
        .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_nested_key() {
        let json = serde_json::to_value(StrokexConfig::default()).unwrap();
        assert_eq!(*lookup(&json, "backend.model").unwrap(), "llama3.1");
        assert_eq!(*lookup(&json, "extraction.cot_max_chars").unwrap(), 1500);
        assert!(lookup(&json, "backend.nope").is_err());
    }

    #[test]
    fn test_assign_typed_values() {
        let config = StrokexConfig::default();

        let updated = assign(&config, "extraction.reasoning_mode", parse_value("true")).unwrap();
        assert!(updated.extraction.reasoning_mode);

        let updated = assign(&updated, "backend.host", parse_value("http://gpu-box:11434")).unwrap();
        assert_eq!(updated.backend.host, "http://gpu-box:11434");
        assert!(updated.extraction.reasoning_mode);
    }

    #[test]
    fn test_assign_rejects_unknown_and_mistyped() {
        let config = StrokexConfig::default();

        assert!(assign(&config, "backend.modle", parse_value("x")).is_err());
        assert!(assign(&config, "nothing.here", parse_value("1")).is_err());
        assert!(assign(&config, "backend.timeout_secs", parse_value("soon")).is_err());
    }

    #[test]
    fn test_set_then_get_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        set_config(&path, "output.path", "runs/out.csv").unwrap();
        let loaded = StrokexConfig::from_file(&path).unwrap();
        assert_eq!(loaded.output.path, PathBuf::from("runs/out.csv"));
        assert_eq!(loaded.backend.model, "llama3.1");
    }
}
