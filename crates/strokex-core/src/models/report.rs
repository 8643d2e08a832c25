//! Clinical report input records.

use serde::{Deserialize, Serialize};

/// One stroke report to extract variables from.
///
/// Identifiers are carried through to the output untouched; they are never
/// validated or parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    /// Patient identifier (MRN).
    pub patient_id: String,

    /// Accession number of the imaging study.
    pub accession_number: String,

    /// Free-text report body. May be empty.
    pub report_text: String,
}

impl ReportRecord {
    pub fn new(
        patient_id: impl Into<String>,
        accession_number: impl Into<String>,
        report_text: impl Into<String>,
    ) -> Self {
        Self {
            patient_id: patient_id.into(),
            accession_number: accession_number.into(),
            report_text: report_text.into(),
        }
    }
}
