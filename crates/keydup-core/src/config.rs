use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::types::SourceKind;

pub const CONFIG_FILE: &str = ".keydup.toml";

/// Top-level configuration from `.keydup.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub columns: ColumnMapping,
    #[serde(default)]
    pub report: ReportConfig,
    #[serde(default)]
    pub check: CheckConfig,
}

/// Where records come from. `kind` is inferred from the file extension when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default)]
    pub kind: Option<SourceKind>,
    #[serde(default = "default_table")]
    pub table: String,
}

fn default_table() -> String {
    "InventoryMaster".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            kind: None,
            table: default_table(),
        }
    }
}

/// Column (or CSV header) names for each record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    #[serde(default = "default_product_code")]
    pub product_code: String,
    #[serde(default = "default_grade_code")]
    pub grade_code: String,
    #[serde(default = "default_class_code")]
    pub class_code: String,
    #[serde(default = "default_shipping_mark_code")]
    pub shipping_mark_code: String,
    #[serde(default = "default_shipping_mark_name")]
    pub shipping_mark_name: String,
    #[serde(default = "default_job_date")]
    pub job_date: String,
}

fn default_product_code() -> String {
    "ProductCode".to_string()
}
fn default_grade_code() -> String {
    "GradeCode".to_string()
}
fn default_class_code() -> String {
    "ClassCode".to_string()
}
fn default_shipping_mark_code() -> String {
    "ShippingMarkCode".to_string()
}
fn default_shipping_mark_name() -> String {
    "ShippingMarkName".to_string()
}
fn default_job_date() -> String {
    "JobDate".to_string()
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            product_code: default_product_code(),
            grade_code: default_grade_code(),
            class_code: default_class_code(),
            shipping_mark_code: default_shipping_mark_code(),
            shipping_mark_name: default_shipping_mark_name(),
            job_date: default_job_date(),
        }
    }
}

impl ColumnMapping {
    /// Column names in record field order: the five key fields, then the job date.
    pub fn in_order(&self) -> [&str; 6] {
        [
            self.product_code.as_str(),
            self.grade_code.as_str(),
            self.class_code.as_str(),
            self.shipping_mark_code.as_str(),
            self.shipping_mark_name.as_str(),
            self.job_date.as_str(),
        ]
    }
}

/// Report sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_name_width")]
    pub name_width: usize,
}

fn default_top_n() -> usize {
    10
}
fn default_name_width() -> usize {
    20
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            name_width: default_name_width(),
        }
    }
}

/// Thresholds for `keydup check`. Unset thresholds are not enforced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub max_reduction_rate: Option<f64>,
    #[serde(default)]
    pub max_duplicate_keys: Option<u64>,
}

impl Config {
    /// Load configuration from a `.keydup.toml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file '{}'", path.display()))?;
        let config: Config = toml::from_str(&content).with_context(|| {
            format!(
                "failed to parse '{}'. Run `keydup init` to create a valid config file",
                path.display()
            )
        })?;
        Ok(config)
    }

    /// Load from `.keydup.toml` in the given directory or any ancestor, or return defaults.
    pub fn load_or_default(dir: &Path) -> Self {
        let start = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());
        let mut current = start.as_path();
        loop {
            let config_path = current.join(CONFIG_FILE);
            if config_path.exists() {
                return match Self::load(&config_path) {
                    Ok(config) => {
                        tracing::debug!("loaded config from {}", config_path.display());
                        config
                    }
                    Err(e) => {
                        tracing::warn!(
                            "failed to load config from '{}': {e:#}. Using defaults.",
                            config_path.display()
                        );
                        Self::default()
                    }
                };
            }
            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }
        Self::default()
    }

    /// Generate default TOML content for `keydup init`.
    pub fn default_toml() -> String {
        r#"# keydup - Key Duplication Analysis Configuration

[source]
# Backend: "sqlite" or "csv". Inferred from the file extension when omitted.
# kind = "sqlite"
# Table to read when the source is a SQLite database
table = "InventoryMaster"

[columns]
# Column (or CSV header) names for the natural key and the job date
product_code = "ProductCode"
grade_code = "GradeCode"
class_code = "ClassCode"
shipping_mark_code = "ShippingMarkCode"
shipping_mark_name = "ShippingMarkName"
job_date = "JobDate"

[report]
# Rows shown in each ranked section
top_n = 10
# Characters of the shipping mark name shown in the duplicate key detail
name_width = 20

[check]
# Fail `keydup check` when these are exceeded
# max_reduction_rate = 50.0
# max_duplicate_keys = 1000
"#
        .to_string()
    }
}
