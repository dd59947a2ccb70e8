use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::ReportConfig;
use crate::types::{NaturalKey, Record};

/// Sizing for the ranked sections of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Rows kept in each ranked section.
    pub top_n: usize,
    /// Characters of `shipping_mark_name` kept in duplicate key detail rows.
    pub name_width: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_n: 10,
            name_width: 20,
        }
    }
}

impl From<&ReportConfig> for ReportOptions {
    fn from(config: &ReportConfig) -> Self {
        Self {
            top_n: config.top_n,
            name_width: config.name_width,
        }
    }
}

/// Everything seen for one natural key.
#[derive(Debug, Clone, Default)]
pub struct KeyHistory {
    pub record_count: u64,
    pub job_dates: BTreeSet<NaiveDate>,
}

impl KeyHistory {
    pub fn is_duplicate(&self) -> bool {
        self.record_count > 1
    }

    pub fn distinct_job_dates(&self) -> usize {
        self.job_dates.len()
    }

    pub fn first_job_date(&self) -> Option<NaiveDate> {
        self.job_dates.first().copied()
    }

    pub fn latest_job_date(&self) -> Option<NaiveDate> {
        self.job_dates.last().copied()
    }
}

/// Running aggregation over a record stream.
///
/// Holds the per-date histogram and one [`KeyHistory`] per natural key.
/// Feed it with [`KeyIndex::observe`], then derive a [`DuplicationReport`].
#[derive(Debug, Clone, Default)]
pub struct KeyIndex {
    total_records: u64,
    per_job_date: BTreeMap<NaiveDate, u64>,
    per_key: HashMap<NaturalKey, KeyHistory>,
}

impl KeyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.observe(record.clone());
        }
        index
    }

    pub fn observe(&mut self, record: Record) {
        self.total_records += 1;
        *self.per_job_date.entry(record.job_date).or_insert(0) += 1;
        let history = self.per_key.entry(record.key).or_default();
        history.record_count += 1;
        history.job_dates.insert(record.job_date);
    }

    pub fn total_records(&self) -> u64 {
        self.total_records
    }

    pub fn unique_key_count(&self) -> u64 {
        self.per_key.len() as u64
    }

    /// Record count for every job date seen, ascending by date.
    pub fn job_date_counts(&self) -> &BTreeMap<NaiveDate, u64> {
        &self.per_job_date
    }

    pub fn history(&self, key: &NaturalKey) -> Option<&KeyHistory> {
        self.per_key.get(key)
    }

    pub fn duplicate_keys(&self) -> impl Iterator<Item = (&NaturalKey, &KeyHistory)> {
        self.per_key.iter().filter(|(_, h)| h.is_duplicate())
    }

    /// Number of keys whose most recent job date is each date, ascending by date.
    pub fn latest_job_date_counts(&self) -> BTreeMap<NaiveDate, u64> {
        let mut counts = BTreeMap::new();
        for history in self.per_key.values() {
            if let Some(latest) = history.latest_job_date() {
                *counts.entry(latest).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn report(&self, options: ReportOptions) -> DuplicationReport {
        DuplicationReport {
            source: None,
            total_records: self.total_records,
            distinct_job_dates: self.per_job_date.len() as u64,
            job_dates: most_recent(&self.per_job_date, options.top_n),
            duplicate_summary: self.duplicate_summary(),
            duplicate_keys: self.duplicate_details(options),
            reduction: self.reduction(),
            latest_job_dates: most_recent(&self.latest_job_date_counts(), options.top_n),
        }
    }

    fn duplicate_summary(&self) -> DuplicateSummary {
        let mut summary = DuplicateSummary::default();
        let mut job_date_total = 0u64;
        for (_, history) in self.duplicate_keys() {
            let dates = history.distinct_job_dates() as u64;
            summary.duplicate_key_count += 1;
            summary.duplicate_record_count += history.record_count;
            summary.max_job_dates_per_key = summary.max_job_dates_per_key.max(dates);
            job_date_total += dates;
        }
        if summary.duplicate_key_count > 0 {
            summary.avg_job_dates_per_key =
                job_date_total as f64 / summary.duplicate_key_count as f64;
        }
        summary
    }

    fn duplicate_details(&self, options: ReportOptions) -> Vec<DuplicateKeyDetail> {
        if options.top_n == 0 {
            return Vec::new();
        }

        let mut duplicates: Vec<(&NaturalKey, &KeyHistory)> = self.duplicate_keys().collect();
        // Record count descending, then product code ascending. The rest of the
        // key breaks any remaining tie so HashMap order never leaks into output.
        duplicates.sort_by(|(ka, ha), (kb, hb)| {
            hb.record_count
                .cmp(&ha.record_count)
                .then_with(|| ka.cmp(kb))
        });
        duplicates.truncate(options.top_n);

        duplicates
            .into_iter()
            .filter_map(|(key, history)| {
                Some(DuplicateKeyDetail {
                    product_code: key.product_code.clone(),
                    grade_code: key.grade_code.clone(),
                    class_code: key.class_code.clone(),
                    shipping_mark_code: key.shipping_mark_code.clone(),
                    shipping_mark_name: key.short_name(options.name_width),
                    job_date_count: history.distinct_job_dates() as u64,
                    min_job_date: history.first_job_date()?,
                    max_job_date: history.latest_job_date()?,
                    record_count: history.record_count,
                })
            })
            .collect()
    }

    fn reduction(&self) -> ReductionEstimate {
        let total = self.total_records;
        let unique = self.unique_key_count();
        let reduction_count = total - unique;
        let reduction_rate = if total > 0 {
            reduction_count as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        ReductionEstimate {
            total_records: total,
            unique_key_count: unique,
            reduction_count,
            reduction_rate,
        }
    }
}

/// The `top_n` latest dates of a date histogram, newest first.
fn most_recent(counts: &BTreeMap<NaiveDate, u64>, top_n: usize) -> Vec<DateCount> {
    counts
        .iter()
        .rev()
        .take(top_n)
        .map(|(date, count)| DateCount {
            job_date: *date,
            count: *count,
        })
        .collect()
}

/// A date and how many rows (or keys) fall on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateCount {
    pub job_date: NaiveDate,
    pub count: u64,
}

/// Aggregate view over keys that appear in more than one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DuplicateSummary {
    pub duplicate_key_count: u64,
    pub duplicate_record_count: u64,
    pub max_job_dates_per_key: u64,
    pub avg_job_dates_per_key: f64,
}

/// One duplicate key. `shipping_mark_name` is truncated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKeyDetail {
    pub product_code: String,
    pub grade_code: String,
    pub class_code: String,
    pub shipping_mark_code: String,
    pub shipping_mark_name: String,
    pub job_date_count: u64,
    pub min_job_date: NaiveDate,
    pub max_job_date: NaiveDate,
    pub record_count: u64,
}

/// Rows saved if history were collapsed to one row per key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReductionEstimate {
    pub total_records: u64,
    pub unique_key_count: u64,
    pub reduction_count: u64,
    /// Percentage, 0 to 100. Zero for an empty data set.
    pub reduction_rate: f64,
}

/// Full analysis result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub total_records: u64,
    pub distinct_job_dates: u64,
    pub job_dates: Vec<DateCount>,
    pub duplicate_summary: DuplicateSummary,
    pub duplicate_keys: Vec<DuplicateKeyDetail>,
    pub reduction: ReductionEstimate,
    pub latest_job_dates: Vec<DateCount>,
}

impl DuplicationReport {
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// Analyze an in-memory record set.
pub fn analyze(records: &[Record], options: ReportOptions) -> DuplicationReport {
    KeyIndex::from_records(records).report(options)
}
