use serde::Serialize;

use keydup_core::analysis::DuplicationReport;
use keydup_core::check::CheckOutcome;

/// Format a full analysis report as JSON.
pub fn format_report(report: &DuplicationReport, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(report)
    } else {
        serde_json::to_string_pretty(report)
    }
}

/// Wrapper for check output that adds pass/fail metadata.
#[derive(Debug, Serialize)]
pub struct CheckOutput<'a> {
    #[serde(flatten)]
    pub report: &'a DuplicationReport,
    pub check: &'a CheckOutcome,
}

/// Format a check result as JSON. Returns (json_string, passed).
pub fn format_check(
    report: &DuplicationReport,
    outcome: &CheckOutcome,
    compact: bool,
) -> serde_json::Result<(String, bool)> {
    let output = CheckOutput {
        report,
        check: outcome,
    };

    let json = if compact {
        serde_json::to_string(&output)?
    } else {
        serde_json::to_string_pretty(&output)?
    };

    Ok((json, outcome.passed))
}
