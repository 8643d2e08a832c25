//! Result rows and the output schema they are rendered against.

use std::collections::HashSet;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::report::ReportRecord;
use super::variable::VariableSet;
use crate::error::ConfigError;

/// Name of the row finalization column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// Suffix appended to a variable key for its reasoning-trace column.
pub const COT_SUFFIX: &str = "_COT";

/// What a single output column holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    /// Patient identifier.
    PatientId,
    /// Accession number.
    Accession,
    /// Canonical answer of the variable at this index.
    Answer(usize),
    /// Bounded reasoning trace of the variable at this index.
    Reasoning(usize),
    /// Row finalization time.
    Timestamp,
}

/// Outcome of one (report, variable) inference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableOutcome {
    /// Canonical answer token (`"None"` when nothing was found).
    pub answer: String,

    /// Prefix of the raw response, recorded only in reasoning mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// A fully populated result row for one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionRow {
    pub patient_id: String,
    pub accession_number: String,

    /// One outcome per variable, in variable-set order.
    pub outcomes: Vec<VariableOutcome>,

    /// When the row was finalized.
    pub timestamp: DateTime<Utc>,
}

impl ExtractionRow {
    /// Start a row for `record`. The row only becomes an `ExtractionRow`
    /// once every outcome has been pushed and it is finalized.
    pub fn start(record: &ReportRecord) -> PendingRow {
        PendingRow {
            patient_id: record.patient_id.clone(),
            accession_number: record.accession_number.clone(),
            outcomes: Vec::new(),
        }
    }

    /// Canonical answer of the variable at `index`.
    pub fn answer(&self, index: usize) -> Option<&str> {
        self.outcomes.get(index).map(|o| o.answer.as_str())
    }
}

/// A row still being filled in for the in-flight report.
#[derive(Debug, Clone)]
pub struct PendingRow {
    patient_id: String,
    accession_number: String,
    outcomes: Vec<VariableOutcome>,
}

impl PendingRow {
    pub fn push(&mut self, outcome: VariableOutcome) {
        self.outcomes.push(outcome);
    }

    /// Stamp the row and freeze it.
    pub fn finalize(self, timestamp: DateTime<Utc>) -> ExtractionRow {
        ExtractionRow {
            patient_id: self.patient_id,
            accession_number: self.accession_number,
            outcomes: self.outcomes,
            timestamp,
        }
    }
}

/// Ordered output column set, assembled once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSchema {
    columns: Vec<(Column, String)>,
    reasoning_mode: bool,
}

impl ResultSchema {
    /// Build the schema: identifiers, one or two columns per variable,
    /// then the timestamp.
    pub fn build(
        patient_id_column: &str,
        accession_column: &str,
        variables: &VariableSet,
        reasoning_mode: bool,
    ) -> Result<Self, ConfigError> {
        let mut columns = Vec::with_capacity(3 + variables.len() * 2);
        columns.push((Column::PatientId, patient_id_column.to_string()));
        columns.push((Column::Accession, accession_column.to_string()));

        for (i, spec) in variables.iter().enumerate() {
            columns.push((Column::Answer(i), spec.key.clone()));
            if reasoning_mode {
                columns.push((Column::Reasoning(i), format!("{}{}", spec.key, COT_SUFFIX)));
            }
        }
        columns.push((Column::Timestamp, TIMESTAMP_COLUMN.to_string()));

        let mut seen = HashSet::with_capacity(columns.len());
        for (_, name) in &columns {
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::ColumnCollision(name.clone()));
            }
        }

        Ok(Self {
            columns,
            reasoning_mode,
        })
    }

    pub fn reasoning_mode(&self) -> bool {
        self.reasoning_mode
    }

    /// Variable keys of the answer columns, in output order.
    pub fn variable_keys(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().filter_map(|(c, name)| match c {
            Column::Answer(_) => Some(name.as_str()),
            _ => None,
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column headers in output order.
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(_, name)| name.as_str())
    }

    /// Position of the column named `name`.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|(_, n)| n == name)
    }

    /// Render a row as cells aligned with `headers()`.
    pub fn render(&self, row: &ExtractionRow) -> Vec<String> {
        self.columns
            .iter()
            .map(|(column, _)| match *column {
                Column::PatientId => row.patient_id.clone(),
                Column::Accession => row.accession_number.clone(),
                Column::Answer(i) => row
                    .outcomes
                    .get(i)
                    .map(|o| o.answer.clone())
                    .unwrap_or_default(),
                Column::Reasoning(i) => row
                    .outcomes
                    .get(i)
                    .and_then(|o| o.reasoning.clone())
                    .unwrap_or_default(),
                Column::Timestamp => row.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            })
            .collect()
    }
}
