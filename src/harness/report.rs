//! Report Formatter: console text and JSON for a finished ledger

use colored::Colorize;

use super::ledger::Ledger;
use super::outcome::Outcome;
use crate::common::Result;

const RULE_WIDTH: usize = 60;

/// One console line for a recorded outcome
pub fn outcome_line(outcome: &Outcome) -> String {
    if outcome.passed {
        format!("  {} {}", "✓".green(), outcome.probe)
    } else {
        format!(
            "  {} {}: {}",
            "✗".red(),
            outcome.probe,
            outcome.detail.dimmed()
        )
    }
}

/// Human-readable summary: one line per category, totals, verdict
pub fn format(ledger: &Ledger) -> String {
    let summary = ledger.summary();
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "=".repeat(RULE_WIDTH)));
    out.push_str(&format!("{}\n", "Test Results Summary".bold()));
    out.push_str(&format!("{}\n", "=".repeat(RULE_WIDTH)));

    for cat in &summary.per_category {
        let mark = if cat.failed == 0 {
            "✓".green()
        } else {
            "✗".red()
        };
        out.push_str(&format!(
            "{} {}: {} passed, {} failed\n",
            mark,
            cat.category.as_str().to_uppercase(),
            cat.passed,
            cat.failed
        ));
    }

    out.push_str(&format!("{}\n", "-".repeat(RULE_WIDTH)));
    out.push_str(&format!(
        "OVERALL: {} passed, {} failed\n",
        summary.total_passed, summary.total_failed
    ));

    if all_passed(ledger) {
        out.push_str(&format!("{}\n", "ALL TESTS PASSED".green().bold()));
    } else {
        out.push_str(&format!(
            "{}\n",
            "Some tests failed - check details above".red().bold()
        ));
        for outcome in ledger.outcomes().filter(|o| !o.passed) {
            out.push_str(&format!(
                "  [{}] {}: {}\n",
                outcome.category, outcome.probe, outcome.detail
            ));
        }
    }

    out
}

/// Verdict used as the exit status: true only when nothing failed
pub fn all_passed(ledger: &Ledger) -> bool {
    ledger.all_passed()
}

/// Full ledger as pretty JSON, with a top-level summary
pub fn to_json(ledger: &Ledger) -> Result<String> {
    let doc = serde_json::json!({
        "all_passed": all_passed(ledger),
        "summary": ledger.summary(),
        "categories": ledger.categories(),
    });
    Ok(serde_json::to_string_pretty(&doc)?)
}
