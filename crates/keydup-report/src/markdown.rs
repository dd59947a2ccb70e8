use keydup_core::analysis::{DateCount, DuplicationReport};
use keydup_core::check::CheckOutcome;

use crate::ADVISORY;

/// Format a full analysis report as Markdown.
pub fn format_report(report: &DuplicationReport) -> String {
    let mut out = String::new();

    out.push_str("# keydup - Key Duplication Analysis\n\n");
    if let Some(ref source) = report.source {
        out.push_str(&format!("**Source:** `{source}`\n\n"));
    }

    // Summary
    out.push_str(&format!(
        "## Summary\n\n- **Records:** {}\n- **Job dates:** {}\n",
        report.total_records, report.distinct_job_dates,
    ));

    out.push_str("\n## Records by Job Date\n\n");
    push_date_table(&mut out, &report.job_dates, "Records");

    let summary = &report.duplicate_summary;
    out.push_str("\n## Duplicate Keys\n\n");
    out.push_str("| Metric | Value |\n");
    out.push_str("|--------|-------|\n");
    out.push_str(&format!(
        "| Duplicate keys | {} |\n",
        summary.duplicate_key_count
    ));
    out.push_str(&format!(
        "| Records in duplicate keys | {} |\n",
        summary.duplicate_record_count
    ));
    out.push_str(&format!(
        "| Max job dates per key | {} |\n",
        summary.max_job_dates_per_key
    ));
    out.push_str(&format!(
        "| Avg job dates per key | {:.2} |\n",
        summary.avg_job_dates_per_key
    ));

    if !report.duplicate_keys.is_empty() {
        out.push_str("\n### Top Duplicate Keys\n\n");
        out.push_str("| Product | Grade | Class | Mark | Mark Name | Records | Job Dates | First | Last |\n");
        out.push_str("|---------|-------|-------|------|-----------|---------|-----------|-------|------|\n");
        for d in &report.duplicate_keys {
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} | {} |\n",
                escape_cell(&d.product_code),
                escape_cell(&d.grade_code),
                escape_cell(&d.class_code),
                escape_cell(&d.shipping_mark_code),
                escape_cell(&d.shipping_mark_name),
                d.record_count,
                d.job_date_count,
                d.min_job_date,
                d.max_job_date,
            ));
        }
    }

    let reduction = &report.reduction;
    out.push_str(&format!(
        "\n## Reduction Estimate\n\n- **Unique keys:** {}\n- **Removable records:** {}\n- **Reduction rate:** {:.1}%\n",
        reduction.unique_key_count, reduction.reduction_count, reduction.reduction_rate,
    ));

    out.push_str("\n## Keys by Latest Job Date\n\n");
    push_date_table(&mut out, &report.latest_job_dates, "Keys");

    if !report.is_empty() {
        out.push_str("\n## Before Collapsing History\n\n");
        for (i, question) in ADVISORY.iter().enumerate() {
            out.push_str(&format!("{}. {question}\n", i + 1));
        }
    }

    out.push('\n');
    out
}

fn push_date_table(out: &mut String, dates: &[DateCount], unit: &str) {
    if dates.is_empty() {
        out.push_str("No data.\n");
        return;
    }
    out.push_str(&format!("| Job Date | {unit} |\n"));
    out.push_str("|----------|-------|\n");
    for entry in dates {
        out.push_str(&format!("| {} | {} |\n", entry.job_date, entry.count));
    }
}

/// Pipes would end the cell early.
fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Format a check result as Markdown. Returns (markdown, passed).
pub fn format_check(report: &DuplicationReport, outcome: &CheckOutcome) -> (String, bool) {
    let mut out = format_report(report);

    if outcome.passed {
        out.push_str("## Result\n\n**CHECK PASSED**\n");
    } else {
        out.push_str(&format!(
            "## Result\n\n**CHECK FAILED**: {} threshold(s) exceeded\n\n",
            outcome.failures.len()
        ));
        for failure in &outcome.failures {
            out.push_str(&format!("- {failure}\n"));
        }
    }

    (out, outcome.passed)
}
