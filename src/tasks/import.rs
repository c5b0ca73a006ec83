//! CSV task import.
//!
//! The file must carry a `title,description` header row. Each data row is
//! validated independently; invalid rows are reported by their line number
//! and skipped while valid rows are kept.

use csv::{ReaderBuilder, Trim};
use serde::Serialize;

use crate::tasks::model::Task;

/// Columns every import file must provide, in order.
pub const EXPECTED_HEADER: [&str; 2] = ["title", "description"];

/// One parsed data row. `line` counts the header as line 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    pub line: usize,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Default)]
pub struct ImportBatch {
    pub tasks: Vec<Task>,
    pub errors: Vec<RowError>,
}

/// Header row with whitespace trimmed.
pub fn read_header(data: &[u8]) -> Result<Vec<String>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);
    Ok(reader.headers()?.iter().map(str::to_string).collect())
}

pub fn has_expected_header(header: &[String]) -> bool {
    header.len() == EXPECTED_HEADER.len()
        && header
            .iter()
            .zip(EXPECTED_HEADER)
            .all(|(actual, expected)| actual.eq_ignore_ascii_case(expected))
}

/// Parse every data row. Columns are located by header name, ignoring
/// case; blank or missing cells read as `None`.
pub fn read_records(data: &[u8]) -> Result<Vec<CsvRecord>, csv::Error> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(data);

    let header = reader.headers()?.clone();
    let column = |name: &str| header.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (title_at, description_at) = (column("title"), column("description"));

    let cell = |record: &csv::StringRecord, at: Option<usize>| {
        at.and_then(|i| record.get(i))
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    reader
        .records()
        .enumerate()
        .map(|(index, record)| {
            let record = record?;
            Ok(CsvRecord {
                line: index + 2,
                title: cell(&record, title_at),
                description: cell(&record, description_at),
            })
        })
        .collect()
}

/// Turn CSV bytes into tasks ready to store plus per-row errors.
pub fn parse_tasks(data: &[u8]) -> Result<ImportBatch, csv::Error> {
    let mut batch = ImportBatch::default();

    for record in read_records(data)? {
        let errors = Task::validate(record.title.as_deref(), record.description.as_deref());
        match (record.title, record.description) {
            (Some(title), Some(description)) if errors.is_empty() => {
                batch.tasks.push(Task::new(title, description));
            }
            _ => batch.errors.push(RowError {
                row: record.line,
                errors,
            }),
        }
    }

    Ok(batch)
}
