pub mod analysis;
pub mod check;
pub mod config;
pub mod pipeline;
pub mod source;
pub mod types;

pub use analysis::{analyze, DuplicationReport, KeyIndex, ReportOptions};
pub use check::{evaluate, CheckOutcome, CheckPolicy};
pub use config::Config;
pub use pipeline::{run_analysis, AnalysisPipeline};
pub use source::{open_source, RecordSource, SourceError};
pub use types::*;
