//! Subcommand implementations.

pub mod config;
pub mod extract;
pub mod models;
pub mod preview;

use std::path::Path;

use strokex_core::StrokexConfig;

/// Load the file given with `--config`, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<StrokexConfig> {
    let config = if let Some(path) = config_path {
        StrokexConfig::from_file(Path::new(path))?
    } else {
        StrokexConfig::default()
    };
    Ok(config)
}
