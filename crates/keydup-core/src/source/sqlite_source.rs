use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row};

use super::{RecordSource, SourceError};
use crate::config::ColumnMapping;
use crate::types::{parse_job_date, NaturalKey, Record};

/// Reads records from one table of a SQLite database, opened read-only.
pub struct SqliteSource {
    connection: Connection,
    label: String,
    table: String,
    columns: ColumnMapping,
}

impl SqliteSource {
    /// Open `path` read-only. Fails if the file does not exist.
    pub fn open(path: &Path, table: &str, columns: ColumnMapping) -> Result<Self, SourceError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(path, flags)?;
        Ok(Self::with_connection(
            connection,
            path.display().to_string(),
            table,
            columns,
        ))
    }

    /// Wrap an already-open connection, e.g. an in-memory database.
    pub fn with_connection(
        connection: Connection,
        label: impl Into<String>,
        table: &str,
        columns: ColumnMapping,
    ) -> Self {
        Self {
            connection,
            label: label.into(),
            table: table.to_string(),
            columns,
        }
    }

    fn select_sql(&self) -> String {
        let columns: Vec<String> = self
            .columns
            .in_order()
            .iter()
            .map(|c| quote_identifier(c))
            .collect();
        format!(
            "SELECT {} FROM {}",
            columns.join(", "),
            quote_identifier(&self.table)
        )
    }
}

impl SqliteSource {
    /// Every mapped column must exist in the table. A double-quoted name that
    /// matches no column is otherwise read back as a string literal.
    fn check_columns(&self) -> Result<(), SourceError> {
        let mut statement = self
            .connection
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let existing = statement
            .query_map([self.table.as_str()], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        if existing.is_empty() {
            // Unknown table; the SELECT reports it.
            return Ok(());
        }

        for column in self.columns.in_order() {
            if !existing.iter().any(|name| name.eq_ignore_ascii_case(column)) {
                return Err(SourceError::MissingColumn {
                    column: column.to_string(),
                    location: self.describe(),
                });
            }
        }
        Ok(())
    }
}

impl RecordSource for SqliteSource {
    fn describe(&self) -> String {
        format!("{}:{}", self.label, self.table)
    }

    fn scan(&mut self, sink: &mut dyn FnMut(Record)) -> Result<u64, SourceError> {
        self.check_columns()?;
        let sql = self.select_sql();
        tracing::debug!("{sql}");
        let mut statement = self.connection.prepare(&sql)?;
        let mut rows = statement.query([])?;

        let mut count = 0u64;
        while let Some(row) = rows.next()? {
            count += 1;
            sink(map_row(row, &self.columns, count)?);
        }
        tracing::debug!("read {count} rows from {}", self.table);
        Ok(count)
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn map_row(row: &Row<'_>, columns: &ColumnMapping, row_no: u64) -> Result<Record, SourceError> {
    let key = NaturalKey {
        product_code: key_field(row, 0, &columns.product_code, row_no)?,
        grade_code: key_field(row, 1, &columns.grade_code, row_no)?,
        class_code: key_field(row, 2, &columns.class_code, row_no)?,
        shipping_mark_code: key_field(row, 3, &columns.shipping_mark_code, row_no)?,
        shipping_mark_name: key_field(row, 4, &columns.shipping_mark_name, row_no)?,
    };

    let job_date = match row.get_ref(5)? {
        ValueRef::Text(bytes) => {
            let text = text_value(bytes, &columns.job_date, row_no)?;
            parse_job_date(&text).ok_or_else(|| {
                malformed(row_no, &columns.job_date, format!("is not a date: '{text}'"))
            })?
        }
        ValueRef::Null => return Err(malformed(row_no, &columns.job_date, "is NULL")),
        other => {
            return Err(malformed(
                row_no,
                &columns.job_date,
                format!("has unsupported type {}", other.data_type()),
            ))
        }
    };

    Ok(Record { key, job_date })
}

/// Key fields are kept verbatim. INTEGER columns are rendered in decimal.
fn key_field(row: &Row<'_>, idx: usize, column: &str, row_no: u64) -> Result<String, SourceError> {
    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => text_value(bytes, column, row_no),
        ValueRef::Integer(value) => Ok(value.to_string()),
        ValueRef::Null => Err(malformed(row_no, column, "is NULL")),
        other => Err(malformed(
            row_no,
            column,
            format!("has unsupported type {}", other.data_type()),
        )),
    }
}

fn text_value(bytes: &[u8], column: &str, row_no: u64) -> Result<String, SourceError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| malformed(row_no, column, format!("is not valid UTF-8: {e}")))
}

fn malformed(row: u64, field: &str, reason: impl Into<String>) -> SourceError {
    SourceError::MalformedRecord {
        row,
        field: field.to_string(),
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const CREATE_TABLE: &str = "CREATE TABLE InventoryMaster (
        ProductCode TEXT,
        GradeCode TEXT,
        ClassCode TEXT,
        ShippingMarkCode TEXT,
        ShippingMarkName TEXT,
        JobDate TEXT,
        CurrentStock REAL
    )";

    fn memory_source(rows: &[&str]) -> SqliteSource {
        let connection = Connection::open_in_memory().unwrap();
        connection.execute_batch(CREATE_TABLE).unwrap();
        for values in rows {
            connection
                .execute_batch(&format!("INSERT INTO InventoryMaster VALUES ({values});"))
                .unwrap();
        }
        SqliteSource::with_connection(
            connection,
            "memory",
            "InventoryMaster",
            ColumnMapping::default(),
        )
    }

    fn collect(source: &mut SqliteSource) -> Result<Vec<Record>, SourceError> {
        let mut records = Vec::new();
        source.scan(&mut |r: Record| records.push(r))?;
        Ok(records)
    }

    #[test]
    fn test_scan_reads_all_rows() {
        let mut source = memory_source(&[
            "'00001', '001', '001', '0001', 'MARK    ', '2024-01-01', 10.0",
            "'00001', '001', '001', '0001', 'MARK    ', '2024-01-02 00:00:00', 12.5",
            "'00002', '001', '001', '0001', 'OTHER', '2024-01-01T08:30:00', 0",
        ]);
        let records = collect(&mut source).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].key.shipping_mark_name, "MARK    ");
        assert_eq!(
            records[1].job_date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
        assert_eq!(records[2].key.product_code, "00002");
        assert_eq!(source.describe(), "memory:InventoryMaster");
    }

    #[test]
    fn test_integer_key_rendered_in_decimal() {
        let mut source = memory_source(&["1, 2, 3, 4, 'M', '2024-05-01', 0"]);
        let records = collect(&mut source).unwrap();
        assert_eq!(records[0].key, NaturalKey::new("1", "2", "3", "4", "M"));
    }

    #[test]
    fn test_null_key_field_is_malformed() {
        let mut source = memory_source(&[
            "'00001', '001', '001', '0001', 'M', '2024-01-01', 0",
            "'00001', NULL, '001', '0001', 'M', '2024-01-01', 0",
        ]);
        let err = collect(&mut source).unwrap_err();
        match err {
            SourceError::MalformedRecord { row, field, .. } => {
                assert_eq!(row, 2);
                assert_eq!(field, "GradeCode");
            }
            other => panic!("expected malformed record, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_job_date_is_malformed() {
        let mut source = memory_source(&["'1', '1', '1', '1', 'M', 'not a date', 0"]);
        let err = collect(&mut source).unwrap_err();
        assert!(err.to_string().contains("JobDate"), "{err}");
    }

    #[test]
    fn test_real_job_date_is_unsupported() {
        // No declared type, so the REAL value is stored as-is.
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute_batch(
                "CREATE TABLE InventoryMaster (
                    ProductCode TEXT, GradeCode TEXT, ClassCode TEXT,
                    ShippingMarkCode TEXT, ShippingMarkName TEXT, JobDate
                );
                INSERT INTO InventoryMaster VALUES ('1', '1', '1', '1', 'M', 2460311.5);",
            )
            .unwrap();
        let mut source = SqliteSource::with_connection(
            connection,
            "memory",
            "InventoryMaster",
            ColumnMapping::default(),
        );
        let err = collect(&mut source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed record at row 1: field 'JobDate' has unsupported type Real"
        );
    }

    #[test]
    fn test_misnamed_key_column_is_missing() {
        let connection = Connection::open_in_memory().unwrap();
        connection.execute_batch(CREATE_TABLE).unwrap();
        for product in ["A", "B", "C"] {
            connection
                .execute(
                    "INSERT INTO InventoryMaster VALUES (?1, '1', '1', '1', 'M', '2024-01-01', 0)",
                    [product],
                )
                .unwrap();
        }
        let columns = ColumnMapping {
            product_code: "ProdCode".to_string(),
            ..ColumnMapping::default()
        };
        let mut source =
            SqliteSource::with_connection(connection, "memory", "InventoryMaster", columns);

        let mut seen = 0;
        let err = source.scan(&mut |_: Record| seen += 1).unwrap_err();
        assert_eq!(seen, 0);
        match err {
            SourceError::MissingColumn { column, location } => {
                assert_eq!(column, "ProdCode");
                assert_eq!(location, "memory:InventoryMaster");
            }
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_job_date_column_is_missing() {
        let connection = Connection::open_in_memory().unwrap();
        connection.execute_batch(CREATE_TABLE).unwrap();
        let columns = ColumnMapping {
            job_date: "SnapshotDate".to_string(),
            ..ColumnMapping::default()
        };
        let mut source =
            SqliteSource::with_connection(connection, "memory", "InventoryMaster", columns);
        let err = collect(&mut source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "column 'SnapshotDate' not found in memory:InventoryMaster"
        );
    }

    #[test]
    fn test_column_names_match_case_insensitively() {
        let mut source = memory_source(&["'1', '1', '1', '1', 'M', '2024-01-01', 0"]);
        source.columns.product_code = "productcode".to_string();
        assert_eq!(collect(&mut source).unwrap().len(), 1);
    }

    #[test]
    fn test_missing_table_surfaces_sqlite_error() {
        let connection = Connection::open_in_memory().unwrap();
        let mut source = SqliteSource::with_connection(
            connection,
            "memory",
            "InventoryMaster",
            ColumnMapping::default(),
        );
        assert!(matches!(collect(&mut source), Err(SourceError::Sqlite(_))));
    }

    #[test]
    fn test_open_file_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.db");
        {
            let connection = Connection::open(&path).unwrap();
            connection.execute_batch(CREATE_TABLE).unwrap();
            connection
                .execute_batch(
                    "INSERT INTO InventoryMaster VALUES ('1', '1', '1', '1', 'M', '2024-01-01', 0);",
                )
                .unwrap();
        }

        let mut source =
            SqliteSource::open(&path, "InventoryMaster", ColumnMapping::default()).unwrap();
        assert_eq!(collect(&mut source).unwrap().len(), 1);
        assert!(source
            .connection
            .execute_batch("DELETE FROM InventoryMaster;")
            .is_err());
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("JobDate"), "\"JobDate\"");
        assert_eq!(quote_identifier("odd\"name"), "\"odd\"\"name\"");
        assert_eq!(quote_identifier("在庫マスタ"), "\"在庫マスタ\"");
    }
}
