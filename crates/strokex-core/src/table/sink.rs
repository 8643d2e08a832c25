//! Durable result accumulation.
//!
//! Rows are appended in report order to an in-memory accumulator, which is
//! the single source of truth. Every append re-serializes the whole table
//! to the sink; a sink must either replace its previous content completely
//! or leave it untouched.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use rust_xlsxwriter::{Workbook, XlsxError};
use tracing::debug;

use crate::error::SinkError;
use crate::models::{ExtractionRow, ResultSchema};

/// Durable tabular store overwritten with the full result set.
pub trait ResultSink {
    /// Replace the stored table with `rows`.
    fn flush(&mut self, schema: &ResultSchema, rows: &[ExtractionRow]) -> Result<(), SinkError>;

    /// Human-readable location of the store.
    fn location(&self) -> String;
}

/// Write a staging file next to `path` with `write`, then rename it over
/// `path`. The replaced file keeps its permissions; a new file gets 0644.
fn replace_atomically<F>(path: &Path, suffix: &str, write: F) -> Result<(), SinkError>
where
    F: FnOnce(&mut File) -> Result<(), SinkError>,
{
    let dir = non_empty_parent(path).unwrap_or_else(|| Path::new("."));

    let mut staging = tempfile::Builder::new()
        .prefix(".strokex-")
        .suffix(suffix)
        .tempfile_in(dir)?;

    write(staging.as_file_mut())?;
    if let Some(permissions) = target_permissions(path) {
        staging.as_file().set_permissions(permissions)?;
    }
    staging.as_file().sync_all()?;

    staging.persist(path).map_err(|e| SinkError::Persist {
        path: path.display().to_string(),
        reason: e.error.to_string(),
    })?;

    Ok(())
}

fn target_permissions(path: &Path) -> Option<fs::Permissions> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_file() => Some(meta.permissions()),
        _ => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<fs::Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<fs::Permissions> {
    None
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}

fn create_parent(path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = non_empty_parent(path) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// CSV file sink with atomic replacement.
///
/// Each flush writes a staging file in the destination directory and
/// renames it over the target, so readers only ever see a complete table.
#[derive(Debug, Clone)]
pub struct CsvFileSink {
    path: PathBuf,
}

impl CsvFileSink {
    /// Create a sink at `path`, creating its parent directory if needed.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        create_parent(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvFileSink {
    fn flush(&mut self, schema: &ResultSchema, rows: &[ExtractionRow]) -> Result<(), SinkError> {
        replace_atomically(&self.path, ".csv.tmp", |file| {
            let mut wtr = csv::Writer::from_writer(file);
            wtr.write_record(schema.headers())?;
            for row in rows {
                wtr.write_record(schema.render(row))?;
            }
            wtr.flush()?;
            Ok(())
        })?;

        debug!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// Spreadsheet workbook sink with atomic replacement.
///
/// The table goes to a single worksheet, every cell as text.
#[derive(Debug, Clone)]
pub struct XlsxFileSink {
    path: PathBuf,
}

impl XlsxFileSink {
    /// Create a sink at `path`, creating its parent directory if needed.
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        create_parent(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn sheet_column(index: usize) -> Result<u16, XlsxError> {
    u16::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn sheet_row(index: usize) -> Result<u32, XlsxError> {
    u32::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}

fn encode_workbook(schema: &ResultSchema, rows: &[ExtractionRow]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();

    for (col, header) in schema.headers().enumerate() {
        sheet.write_string(0, sheet_column(col)?, header)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let r = sheet_row(r + 1)?;
        for (col, value) in schema.render(row).into_iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r, sheet_column(col)?, value)?;
            }
        }
    }

    workbook.save_to_buffer()
}

impl ResultSink for XlsxFileSink {
    fn flush(&mut self, schema: &ResultSchema, rows: &[ExtractionRow]) -> Result<(), SinkError> {
        let buffer = encode_workbook(schema, rows)?;
        replace_atomically(&self.path, ".xlsx.tmp", |file| {
            file.write_all(&buffer)?;
            Ok(())
        })?;

        debug!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// File sink whose format follows the output path's extension:
/// `.xlsx` writes a workbook, anything else CSV.
#[derive(Debug, Clone)]
pub enum FileSink {
    Csv(CsvFileSink),
    Xlsx(XlsxFileSink),
}

impl FileSink {
    pub fn create(path: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let path = path.into();
        let is_xlsx = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));

        if is_xlsx {
            Ok(Self::Xlsx(XlsxFileSink::create(path)?))
        } else {
            Ok(Self::Csv(CsvFileSink::create(path)?))
        }
    }
}

impl ResultSink for FileSink {
    fn flush(&mut self, schema: &ResultSchema, rows: &[ExtractionRow]) -> Result<(), SinkError> {
        match self {
            Self::Csv(sink) => sink.flush(schema, rows),
            Self::Xlsx(sink) => sink.flush(schema, rows),
        }
    }

    fn location(&self) -> String {
        match self {
            Self::Csv(sink) => sink.location(),
            Self::Xlsx(sink) => sink.location(),
        }
    }
}

/// Ordered row collection that flushes to its sink after every append.
pub struct ResultAccumulator<S> {
    schema: ResultSchema,
    rows: Vec<ExtractionRow>,
    sink: S,
}

impl<S: ResultSink> ResultAccumulator<S> {
    pub fn new(schema: ResultSchema, sink: S) -> Self {
        Self {
            schema,
            rows: Vec::new(),
            sink,
        }
    }

    /// Append a finished row and persist the whole table.
    ///
    /// If the flush fails the row stays in memory and the sink keeps its
    /// previous content.
    pub fn push(&mut self, row: ExtractionRow) -> Result<(), SinkError> {
        self.rows.push(row);
        self.flush()
    }

    /// Persist the current table.
    pub fn flush(&mut self) -> Result<(), SinkError> {
        self.sink.flush(&self.schema, &self.rows)
    }

    pub fn schema(&self) -> &ResultSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[ExtractionRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
