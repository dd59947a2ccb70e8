use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder, StringRecord};

use super::{RecordSource, SourceError};
use crate::config::ColumnMapping;
use crate::types::{parse_job_date, NaturalKey, Record};

/// Reads records from a CSV file with a header row.
///
/// Headers are matched by exact name against the column mapping. Field values
/// are used verbatim (no trimming), so trailing whitespace stays significant.
pub struct CsvSource {
    reader: Reader<File>,
    path: PathBuf,
    /// Header positions in record field order.
    positions: [usize; 6],
    names: [String; 6],
}

impl CsvSource {
    pub fn open(path: &Path, columns: ColumnMapping) -> Result<Self, SourceError> {
        let file = File::open(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);
        let headers = reader.headers()?.clone();

        let names = columns.in_order().map(str::to_string);
        let mut positions = [0usize; 6];
        for (slot, name) in positions.iter_mut().zip(names.iter()) {
            *slot = header_position(&headers, name).ok_or_else(|| SourceError::MissingColumn {
                column: name.clone(),
                location: path.display().to_string(),
            })?;
        }

        Ok(Self {
            reader,
            path: path.to_path_buf(),
            positions,
            names,
        })
    }

    fn field(&self, row: &StringRecord, slot: usize, row_no: u64) -> Result<String, SourceError> {
        row.get(self.positions[slot])
            .map(str::to_string)
            .ok_or_else(|| SourceError::MalformedRecord {
                row: row_no,
                field: self.names[slot].clone(),
                reason: "is missing".to_string(),
            })
    }

    fn map_row(&self, row: &StringRecord, row_no: u64) -> Result<Record, SourceError> {
        let key = NaturalKey {
            product_code: self.field(row, 0, row_no)?,
            grade_code: self.field(row, 1, row_no)?,
            class_code: self.field(row, 2, row_no)?,
            shipping_mark_code: self.field(row, 3, row_no)?,
            shipping_mark_name: self.field(row, 4, row_no)?,
        };

        let raw_date = self.field(row, 5, row_no)?;
        if raw_date.trim().is_empty() {
            return Err(SourceError::MalformedRecord {
                row: row_no,
                field: self.names[5].clone(),
                reason: "is empty".to_string(),
            });
        }
        let job_date = parse_job_date(&raw_date).ok_or_else(|| SourceError::MalformedRecord {
            row: row_no,
            field: self.names[5].clone(),
            reason: format!("is not a date: '{raw_date}'"),
        })?;

        Ok(Record { key, job_date })
    }
}

/// Find a header by exact name. A UTF-8 BOM on the first header is ignored.
fn header_position(headers: &StringRecord, name: &str) -> Option<usize> {
    headers
        .iter()
        .position(|h| h.trim_start_matches('\u{feff}') == name)
}

impl RecordSource for CsvSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn scan(&mut self, sink: &mut dyn FnMut(Record)) -> Result<u64, SourceError> {
        let mut row = StringRecord::new();
        let mut count = 0u64;
        while self.reader.read_record(&mut row)? {
            count += 1;
            sink(self.map_row(&row, count)?);
        }
        tracing::debug!("read {count} rows from {}", self.path.display());
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const HEADER: &str = "ProductCode,GradeCode,ClassCode,ShippingMarkCode,ShippingMarkName,JobDate,Quantity";

    fn write_csv(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    fn collect(source: &mut CsvSource) -> Result<Vec<Record>, SourceError> {
        let mut records = Vec::new();
        source.scan(&mut |r: Record| records.push(r))?;
        Ok(records)
    }

    #[test]
    fn test_reads_rows_verbatim() {
        let (_dir, path) = write_csv(&format!(
            "{HEADER}\n00001,001,001,0001,MARK ,2024-01-01,5\n00001,001,001,0001,MARK,2024/01/02,7\n"
        ));
        let mut source = CsvSource::open(&path, ColumnMapping::default()).unwrap();
        let records = collect(&mut source).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key.shipping_mark_name, "MARK ");
        assert_eq!(records[1].key.shipping_mark_name, "MARK");
        assert_eq!(
            records[1].job_date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_headers_in_any_order_with_bom() {
        let (_dir, path) = write_csv(
            "\u{feff}JobDate,ShippingMarkName,ShippingMarkCode,ClassCode,GradeCode,ProductCode\n2024-03-01,M,4,3,2,1\n",
        );
        let mut source = CsvSource::open(&path, ColumnMapping::default()).unwrap();
        let records = collect(&mut source).unwrap();
        assert_eq!(records[0].key, NaturalKey::new("1", "2", "3", "4", "M"));
        assert_eq!(
            records[0].job_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn test_custom_column_names() {
        let (_dir, path) = write_csv(
            "商品コード,等級コード,階級コード,荷印コード,荷印名,汎用日付2\n00010,001,002,0003,荷印,2024-04-01\n",
        );
        let columns = ColumnMapping {
            product_code: "商品コード".to_string(),
            grade_code: "等級コード".to_string(),
            class_code: "階級コード".to_string(),
            shipping_mark_code: "荷印コード".to_string(),
            shipping_mark_name: "荷印名".to_string(),
            job_date: "汎用日付2".to_string(),
        };
        let mut source = CsvSource::open(&path, columns).unwrap();
        let records = collect(&mut source).unwrap();
        assert_eq!(records[0].key.shipping_mark_name, "荷印");
    }

    #[test]
    fn test_missing_header_is_reported() {
        let (_dir, path) = write_csv("ProductCode,GradeCode,ClassCode,ShippingMarkCode,JobDate\n");
        let err = CsvSource::open(&path, ColumnMapping::default())
            .err()
            .expect("missing header should fail");
        match err {
            SourceError::MissingColumn { column, .. } => assert_eq!(column, "ShippingMarkName"),
            other => panic!("expected missing column, got {other:?}"),
        }
    }

    #[test]
    fn test_short_row_is_an_error() {
        let (_dir, path) = write_csv(&format!("{HEADER}\n00001,001,001,0001,MARK,2024-01-01,5\n00002,001\n"));
        let mut source = CsvSource::open(&path, ColumnMapping::default()).unwrap();
        assert!(matches!(collect(&mut source), Err(SourceError::Csv(_))));
    }

    #[test]
    fn test_empty_job_date_is_malformed() {
        let (_dir, path) = write_csv(&format!("{HEADER}\n00001,001,001,0001,MARK,,5\n"));
        let mut source = CsvSource::open(&path, ColumnMapping::default()).unwrap();
        let err = collect(&mut source).unwrap_err();
        assert_eq!(
            err.to_string(),
            "malformed record at row 1: field 'JobDate' is empty"
        );
    }

    #[test]
    fn test_header_only_file_is_empty() {
        let (_dir, path) = write_csv(&format!("{HEADER}\n"));
        let mut source = CsvSource::open(&path, ColumnMapping::default()).unwrap();
        assert_eq!(source.scan(&mut |_: Record| {}).unwrap(), 0);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = CsvSource::open(&dir.path().join("nope.csv"), ColumnMapping::default())
            .err()
            .expect("missing file should fail");
        assert!(matches!(err, SourceError::Io { .. }));
    }
}
