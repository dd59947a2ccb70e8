//! Record sources: the storage side of an analysis run.
//!
//! Each source owns its handle (connection or file reader) and releases it on
//! drop, so a failed scan still closes what it opened.

mod csv_source;
mod memory_source;
mod sqlite_source;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::ColumnMapping;
use crate::types::{Record, SourceKind};

pub use csv_source::CsvSource;
pub use memory_source::MemorySource;
pub use sqlite_source::SqliteSource;

/// Failure reading records from a source.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("column '{column}' not found in {location}")]
    MissingColumn { column: String, location: String },

    #[error("malformed record at row {row}: field '{field}' {reason}")]
    MalformedRecord {
        row: u64,
        field: String,
        reason: String,
    },
}

/// Trait that each record backend must implement.
pub trait RecordSource {
    /// Human-readable label, e.g. `inventory.db:InventoryMaster`.
    fn describe(&self) -> String;

    /// Push every record to `sink`. Returns the number of records read.
    ///
    /// Stops at the first unreadable or malformed record.
    fn scan(&mut self, sink: &mut dyn FnMut(Record)) -> Result<u64, SourceError>;
}

/// Open the source for `path`, inferring the backend from the extension when
/// `kind` is `None`.
pub fn open_source(
    kind: Option<SourceKind>,
    path: &Path,
    table: &str,
    columns: &ColumnMapping,
) -> Result<Box<dyn RecordSource>, SourceError> {
    let kind = kind.unwrap_or_else(|| SourceKind::infer(path));
    tracing::info!("opening {kind} source {}", path.display());
    let source: Box<dyn RecordSource> = match kind {
        SourceKind::Sqlite => Box::new(SqliteSource::open(path, table, columns.clone())?),
        SourceKind::Csv => Box::new(CsvSource::open(path, columns.clone())?),
    };
    Ok(source)
}
