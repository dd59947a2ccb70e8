use colored::Colorize;

use keydup_core::analysis::{DateCount, DuplicationReport};
use keydup_core::check::CheckOutcome;

use crate::ADVISORY;

/// Format a full analysis report for terminal output.
pub fn format_report(report: &DuplicationReport) -> String {
    let mut out = String::new();

    // Header
    out.push_str(&format!("\n{}\n", "keydup - Key Duplication Analysis".bold()));
    out.push_str(&format!("{}\n", "=".repeat(40)));
    if let Some(ref source) = report.source {
        out.push_str(&format!("{}: {source}\n", "Source".bold()));
    }

    // Totals
    out.push_str(&format!(
        "\n{}: {} records across {} job dates\n",
        "Summary".bold(),
        report.total_records,
        report.distinct_job_dates,
    ));

    // Records per job date
    out.push_str(&section(&format!(
        "Records by job date (latest {})",
        report.job_dates.len()
    )));
    push_dates(&mut out, &report.job_dates, "records");

    // Duplicate summary
    let summary = &report.duplicate_summary;
    out.push_str(&section("Duplicate keys"));
    out.push_str(&format!(
        "  Keys with more than one record: {}\n",
        summary.duplicate_key_count
    ));
    out.push_str(&format!(
        "  Records held by those keys:     {}\n",
        summary.duplicate_record_count
    ));
    out.push_str(&format!(
        "  Job dates per key:              max={}, avg={:.2}\n",
        summary.max_job_dates_per_key, summary.avg_job_dates_per_key
    ));

    // Duplicate detail
    if !report.duplicate_keys.is_empty() {
        out.push_str(&section(&format!(
            "Top duplicate keys ({})",
            report.duplicate_keys.len()
        )));
        for d in &report.duplicate_keys {
            out.push_str(&format!(
                "\n  {} {} / {} / {} / {} [{}]\n",
                "product".cyan(),
                d.product_code,
                d.grade_code,
                d.class_code,
                d.shipping_mark_code,
                d.shipping_mark_name,
            ));
            out.push_str(&format!(
                "    {} records, {} job dates, {} .. {}\n",
                d.record_count, d.job_date_count, d.min_job_date, d.max_job_date
            ));
        }
    }

    // Reduction estimate
    let reduction = &report.reduction;
    out.push_str(&section("Reduction estimate"));
    out.push_str(&format!("  Total records:     {}\n", reduction.total_records));
    out.push_str(&format!("  Unique keys:       {}\n", reduction.unique_key_count));
    out.push_str(&format!("  Removable records: {}\n", reduction.reduction_count));
    out.push_str(&format!(
        "  Reduction rate:    {}\n",
        rate_colored(reduction.reduction_rate)
    ));

    // Latest job date per key
    out.push_str(&section(&format!(
        "Keys by latest job date (latest {})",
        report.latest_job_dates.len()
    )));
    push_dates(&mut out, &report.latest_job_dates, "keys");

    if report.is_empty() {
        out.push_str(&format!("\n{}\n", "No records found.".yellow().bold()));
    } else {
        out.push_str(&format!("\n{}\n", "Before collapsing history".bold()));
        for (i, question) in ADVISORY.iter().enumerate() {
            out.push_str(&format!("  {}. {question}\n", i + 1));
        }
    }

    out.push('\n');
    out
}

fn section(title: &str) -> String {
    format!("\n{}\n{}\n", title.bold(), "-".repeat(40))
}

fn push_dates(out: &mut String, dates: &[DateCount], unit: &str) {
    if dates.is_empty() {
        out.push_str("  (none)\n");
        return;
    }
    for entry in dates {
        out.push_str(&format!("  {}: {} {unit}\n", entry.job_date, entry.count));
    }
}

fn rate_colored(rate: f64) -> String {
    let rate_str = format!("{rate:.1}%");
    if rate >= 50.0 {
        rate_str.red().to_string()
    } else if rate >= 10.0 {
        rate_str.yellow().to_string()
    } else {
        rate_str.green().to_string()
    }
}

/// Format a check result for CI use. Returns (text, passed).
pub fn format_check(report: &DuplicationReport, outcome: &CheckOutcome) -> (String, bool) {
    let mut out = format_report(report);

    if outcome.passed {
        out.push_str(&format!("{}\n", "CHECK PASSED".green().bold()));
    } else {
        out.push_str(&format!(
            "{}: {} threshold(s) exceeded\n",
            "CHECK FAILED".red().bold(),
            outcome.failures.len(),
        ));
        for failure in &outcome.failures {
            out.push_str(&format!("  - {failure}\n"));
        }
    }

    (out, outcome.passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{empty_report, sample_report};
    use keydup_core::check::{evaluate, CheckPolicy};

    #[test]
    fn test_format_report_contains_sections() {
        colored::control::set_override(false);
        let report = format_report(&sample_report());
        assert!(report.contains("Source: fixture.db:InventoryMaster"));
        assert!(report.contains("3 records across 2 job dates"));
        assert!(report.contains("2024-01-02: 1 records"));
        assert!(report.contains("2024-01-01: 2 records"));
        assert!(report.contains("max=2, avg=2.00"));
        assert!(report.contains("A / 1 / 1 / 1 [X]"));
        assert!(report.contains("2 records, 2 job dates, 2024-01-01 .. 2024-01-02"));
        assert!(report.contains("Reduction rate:    33.3%"));
        assert!(report.contains("2024-01-02: 1 keys"));
        assert!(report.contains("Before collapsing history"));
    }

    #[test]
    fn test_format_report_empty() {
        colored::control::set_override(false);
        let report = format_report(&empty_report());
        assert!(report.contains("0 records across 0 job dates"));
        assert!(report.contains("(none)"));
        assert!(report.contains("Reduction rate:    0.0%"));
        assert!(report.contains("No records found."));
        assert!(!report.contains("Top duplicate keys"));
    }

    #[test]
    fn test_format_check_failed_lists_thresholds() {
        colored::control::set_override(false);
        let report = sample_report();
        let outcome = evaluate(
            &report,
            &CheckPolicy {
                max_reduction_rate: Some(10.0),
                max_duplicate_keys: Some(0),
            },
        );
        let (text, passed) = format_check(&report, &outcome);
        assert!(!passed);
        assert!(text.contains("CHECK FAILED: 2 threshold(s) exceeded"));
        assert!(text.contains("reduction rate 33.3% exceeds 10.0%"));
    }

    #[test]
    fn test_format_check_passed() {
        colored::control::set_override(false);
        let report = sample_report();
        let outcome = evaluate(&report, &CheckPolicy::default());
        let (text, passed) = format_check(&report, &outcome);
        assert!(passed);
        assert!(text.contains("CHECK PASSED"));
    }
}
