use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::analysis::{DuplicationReport, KeyIndex, ReportOptions};
use crate::config::Config;
use crate::source::{open_source, RecordSource, SourceError};
use crate::types::Record;

/// Scan every record of `source` and build the report.
///
/// A failed scan returns the error and discards whatever was aggregated so far.
pub fn run_analysis(
    source: &mut dyn RecordSource,
    options: ReportOptions,
) -> Result<DuplicationReport, SourceError> {
    let label = source.describe();
    let started = Instant::now();

    let mut index = KeyIndex::new();
    let count = source.scan(&mut |record: Record| index.observe(record))?;

    tracing::info!(
        "analyzed {count} records ({} keys) from {label} in {:?}",
        index.unique_key_count(),
        started.elapsed()
    );
    Ok(index.report(options).with_source(label))
}

/// Reusable analysis pipeline: configuration in, report out.
pub struct AnalysisPipeline {
    config: Config,
}

impl AnalysisPipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Open the data file at `path`, analyze it, and release it.
    pub fn analyze(&self, path: &Path) -> Result<DuplicationReport> {
        let mut source = open_source(
            self.config.source.kind,
            path,
            &self.config.source.table,
            &self.config.columns,
        )
        .with_context(|| format!("failed to open data source '{}'", path.display()))?;

        let report = run_analysis(source.as_mut(), ReportOptions::from(&self.config.report))
            .with_context(|| format!("failed to read records from {}", source.describe()))?;
        Ok(report)
    }
}
