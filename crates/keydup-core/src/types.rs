use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five fields identifying an inventory item independent of date.
///
/// Equality is exact: no trimming, padding, or case folding. Two keys whose
/// `shipping_mark_name` differ only by trailing whitespace are distinct.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NaturalKey {
    pub product_code: String,
    pub grade_code: String,
    pub class_code: String,
    pub shipping_mark_code: String,
    pub shipping_mark_name: String,
}

impl NaturalKey {
    pub fn new(
        product_code: impl Into<String>,
        grade_code: impl Into<String>,
        class_code: impl Into<String>,
        shipping_mark_code: impl Into<String>,
        shipping_mark_name: impl Into<String>,
    ) -> Self {
        Self {
            product_code: product_code.into(),
            grade_code: grade_code.into(),
            class_code: class_code.into(),
            shipping_mark_code: shipping_mark_code.into(),
            shipping_mark_name: shipping_mark_name.into(),
        }
    }

    /// The shipping mark name cut to its first `width` characters, for display.
    pub fn short_name(&self, width: usize) -> String {
        truncate_chars(&self.shipping_mark_name, width)
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{}-{}-{}",
            self.product_code,
            self.grade_code,
            self.class_code,
            self.shipping_mark_code,
            self.shipping_mark_name
        )
    }
}

/// One inventory snapshot row: a natural key observed on a job date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub key: NaturalKey,
    pub job_date: NaiveDate,
}

impl Record {
    pub fn new(key: NaturalKey, job_date: NaiveDate) -> Self {
        Self { key, job_date }
    }
}

/// Storage backend a record source reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Sqlite,
    Csv,
}

impl SourceKind {
    /// Infer the backend from a file extension: `.csv` is CSV, anything else SQLite.
    pub fn infer(path: &std::path::Path) -> Self {
        match path.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => SourceKind::Csv,
            _ => SourceKind::Sqlite,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Sqlite => write!(f, "sqlite"),
            SourceKind::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sqlite" | "sqlite3" | "db" => Ok(SourceKind::Sqlite),
            "csv" => Ok(SourceKind::Csv),
            _ => Err(anyhow::anyhow!("unknown source kind: {s}")),
        }
    }
}

/// Parse a job date from text.
///
/// Accepts `YYYY-MM-DD` and `YYYY/MM/DD`, optionally followed by a time part
/// (`T` or space separated), which is discarded.
pub fn parse_job_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let date_part = trimmed
        .split(|c| c == 'T' || c == ' ')
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .ok()
}

/// First `width` characters of `s`. Counts chars, not bytes.
pub fn truncate_chars(s: &str, width: usize) -> String {
    s.chars().take(width).collect()
}
