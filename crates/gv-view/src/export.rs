//! Export projection
//!
//! Rows are projected onto the visible columns, keyed by display label, and
//! handed to an [`ExportEncoder`]. Encoders own the file format; this module
//! only decides what goes in it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use gv_core::{ColumnDescriptor, GridResult, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Print,
    Spreadsheet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Print => "pdf",
            ExportFormat::Spreadsheet => "xlsx",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Print => "print",
            ExportFormat::Spreadsheet => "spreadsheet",
        }
    }
}

/// One exported row: display label to cell value, in column order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExportRecord(pub Map<String, Value>);

impl ExportRecord {
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.0.get(label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Encoded output of an export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    /// Artifact named `<title>.<extension>`
    pub fn new(format: ExportFormat, title: &str, bytes: Vec<u8>) -> Self {
        Self {
            format,
            file_name: format!("{title}.{}", format.extension()),
            bytes,
        }
    }
}

/// Turns projected records into a file
pub trait ExportEncoder: Send + Sync {
    fn format(&self) -> ExportFormat;

    fn encode(&self, records: &[ExportRecord], title: &str) -> GridResult<ExportArtifact>;
}

/// Project `rows` onto `columns`; missing cells become null
pub fn project(rows: &[Row], columns: &[ColumnDescriptor]) -> Vec<ExportRecord> {
    rows.iter()
        .map(|row| {
            let record = columns
                .iter()
                .map(|column| {
                    let value = row.get(&column.field_id).cloned().unwrap_or(Value::Null);
                    (column.display_label.clone(), value)
                })
                .collect();
            ExportRecord(record)
        })
        .collect()
}

/// Project and encode in one step
pub fn export(
    rows: &[Row],
    columns: &[ColumnDescriptor],
    title: &str,
    encoder: &dyn ExportEncoder,
) -> GridResult<ExportArtifact> {
    let records = project(rows, columns);
    debug!(
        format = encoder.format().as_str(),
        records = records.len(),
        columns = columns.len(),
        "exporting"
    );

    let artifact = encoder.encode(&records, title)?;
    info!(file = %artifact.file_name, bytes = artifact.bytes.len(), "export encoded");
    Ok(artifact)
}
