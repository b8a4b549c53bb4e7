// Purchase Event Extraction
//
// Reads every `.json` file directly inside the input directory, keeps the
// `purchase` events and flattens them into one raw row per line item.
//
// A file may contain a JSON array of events, a single event object, or a
// stream of concatenated / newline-delimited event objects.
//
// Failure isolation is per file: a file that cannot be read or parsed is
// logged and skipped, the others still contribute rows. Only an empty result
// across the whole directory is fatal.

pub mod flatten;

use sales_common::RawTable;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Extension of the files picked up from the input directory.
pub const INPUT_EXTENSION: &str = "json";

/// Result type for extraction
pub type Result<T> = std::result::Result<T, ExtractError>;

/// Fatal extraction errors
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Failed to read input directory {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No valid purchase data found in {}", directory.display())]
    NoData { directory: PathBuf },
}

/// Per-file errors; these are logged and the file is skipped
#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected an event object, found {0}")]
    NotAnObject(&'static str),
}

/// Extraction statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractStats {
    pub files_scanned: usize,
    pub files_parsed: usize,
    pub files_skipped: usize,
    pub events_seen: usize,
    pub purchase_events: usize,
    pub purchase_rows: usize,
}

/// Extracted table plus statistics
#[derive(Debug, Clone)]
pub struct Extraction {
    pub table: RawTable,
    pub stats: ExtractStats,
}

/// Extract purchase rows from every event file in `directory`
pub fn extract_sales(directory: &Path) -> Result<Extraction> {
    info!("Extracting purchase events from {}", directory.display());

    let files = list_input_files(directory)?;
    let mut stats = ExtractStats {
        files_scanned: files.len(),
        ..Default::default()
    };
    let mut table = RawTable::purchase();

    for path in &files {
        match read_events(path) {
            Ok(events) => {
                stats.files_parsed += 1;
                stats.events_seen += events.len();

                let before = table.len();
                for event in events.iter().filter(|e| flatten::is_purchase(e)) {
                    stats.purchase_events += 1;
                    for row in flatten::purchase_rows(event) {
                        table.push(row);
                    }
                }

                debug!(
                    file = %path.display(),
                    events = events.len(),
                    rows = table.len() - before,
                    "Parsed event file"
                );
            },
            Err(e) => {
                stats.files_skipped += 1;
                warn!(file = %path.display(), error = %e, "Skipping unreadable event file");
            },
        }
    }

    stats.purchase_rows = table.len();

    if table.is_empty() {
        return Err(ExtractError::NoData {
            directory: directory.to_path_buf(),
        });
    }

    info!(
        "Extracted {} purchase rows from {} events ({} of {} files parsed)",
        stats.purchase_rows, stats.purchase_events, stats.files_parsed, stats.files_scanned
    );

    Ok(Extraction { table, stats })
}

/// `.json` regular files directly inside `directory`, sorted by name
fn list_input_files(directory: &Path) -> Result<Vec<PathBuf>> {
    let io_error = |source| ExtractError::Io {
        path: directory.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in fs::read_dir(directory).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        let is_input = path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION));
        if is_input {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn read_events(path: &Path) -> std::result::Result<Vec<Map<String, Value>>, FileError> {
    let content = fs::read_to_string(path)?;
    parse_events(&content)
}

/// Parse file content into event objects
pub fn parse_events(content: &str) -> std::result::Result<Vec<Map<String, Value>>, FileError> {
    let mut events = Vec::new();

    for value in serde_json::Deserializer::from_str(content).into_iter::<Value>() {
        match value? {
            Value::Array(items) => {
                for item in items {
                    events.push(into_event(item)?);
                }
            },
            other => events.push(into_event(other)?),
        }
    }

    Ok(events)
}

fn into_event(value: Value) -> std::result::Result<Map<String, Value>, FileError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Err(FileError::NotAnObject("null")),
        Value::Bool(_) => Err(FileError::NotAnObject("a boolean")),
        Value::Number(_) => Err(FileError::NotAnObject("a number")),
        Value::String(_) => Err(FileError::NotAnObject("a string")),
        Value::Array(_) => Err(FileError::NotAnObject("a nested array")),
    }
}
