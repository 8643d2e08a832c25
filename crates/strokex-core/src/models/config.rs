//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use strokex_inference::{DEFAULT_HOST, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

/// Default bound on the stored reasoning trace, in characters.
pub const DEFAULT_COT_MAX_CHARS: usize = 1500;

/// Main configuration for strokex.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokexConfig {
    /// Inference backend configuration.
    pub backend: BackendConfig,

    /// Extraction behavior.
    pub extraction: ExtractionConfig,

    /// Input table column names.
    pub input: InputConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Text-generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Ollama base URL.
    pub host: String,

    /// Model identifier passed with every request.
    pub model: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Ask for and record the model's reasoning trace.
    pub reasoning_mode: bool,

    /// Maximum characters of the raw response kept per `<key>_COT` cell.
    pub cot_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            reasoning_mode: false,
            cot_max_chars: DEFAULT_COT_MAX_CHARS,
        }
    }
}

/// Fixed column names of the report table. The identifier names are also
/// used as output column headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub patient_id_column: String,
    pub accession_column: String,
    pub report_text_column: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            patient_id_column: "Patient MRN".to_string(),
            accession_column: "Accession Number".to_string(),
            report_text_column: "Report Text".to_string(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Result table path, overwritten after every report.
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("predictions.csv"),
        }
    }
}

impl StrokexConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
