//! File import adapters: CSV or JSON bars into `Vec<Record>`.
//!
//! Both formats use the [`Record`] field names:
//!
//! ```text
//! timestamp,open,high,low,close,volume,adjusted_close
//! 1714521600,169.58,171.29,169.04,170.33,65934800,169.81
//! ```
//!
//! JSON input is an array of objects with the same keys. Surrounding
//! whitespace in CSV headers and fields is ignored. Values are not validated
//! here; [`Store::write`](crate::Store::write) rejects non-finite prices.
//!
//! Entrypoints:
//! - From any reader: [`read_csv`], [`read_json`]
//! - From a file, format chosen by extension: [`read_path`]
//! - Provenance for the write: [`import_metadata`]

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::{Metadata, Record};

/// Metadata key naming where imported bars came from.
pub const SOURCE_KEY: &str = "source";
/// Metadata key holding when the bars were retrieved.
pub const RETRIEVAL_DATE_KEY: &str = "retrieval_date";

/// Result alias for import adapters.
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors raised while reading an import file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// The file could not be opened.
    #[error("cannot open {path}")]
    Io {
        /// File being opened.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// A CSV row could not be turned into a [`Record`].
    #[error("bad CSV row at line {line}")]
    Row {
        /// 1-based line number, header included.
        line: u64,
        /// Underlying error.
        #[source]
        source: csv::Error,
    },

    /// The JSON document is not an array of records.
    #[error("invalid JSON bars")]
    Json(#[source] serde_json::Error),

    /// The file extension names no known format.
    #[error("cannot infer import format of {0}; expected .csv or .json")]
    UnknownFormat(PathBuf),
}

/// Supported import encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// Comma-separated with a header row.
    Csv,
    /// Array of record objects.
    Json,
}

impl ImportFormat {
    /// Guesses the format from the file extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Reads CSV bars with a header row.
///
/// Errors:
/// - [`ImportError::Row`] for the first row that does not parse
pub fn read_csv<R: Read>(reader: R) -> ImportResult<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<Record>().enumerate() {
        let record = row.map_err(|source| ImportError::Row {
            // header is line 1
            line: source.position().map_or(index as u64 + 2, |p| p.line()),
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Reads a JSON array of bars.
pub fn read_json<R: Read>(reader: R) -> ImportResult<Vec<Record>> {
    serde_json::from_reader(reader).map_err(ImportError::Json)
}

/// Reads `path` as `format`, or as whatever its extension says when `format`
/// is `None`.
pub fn read_path(path: &Path, format: Option<ImportFormat>) -> ImportResult<Vec<Record>> {
    let format = format
        .or_else(|| ImportFormat::from_path(path))
        .ok_or_else(|| ImportError::UnknownFormat(path.to_path_buf()))?;
    let file = File::open(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);
    match format {
        ImportFormat::Csv => read_csv(reader),
        ImportFormat::Json => read_json(reader),
    }
}

/// `source` and `retrieval_date` metadata for an imported batch.
pub fn import_metadata(source: impl Into<String>, retrieved_at: DateTime<Utc>) -> Metadata {
    Metadata::new()
        .with(SOURCE_KEY, source.into())
        .with(RETRIEVAL_DATE_KEY, retrieved_at)
}
