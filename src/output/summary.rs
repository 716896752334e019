use std::fmt::Write;

use comfy_table::{Cell, Color as TableColor};

use crate::dataset::Dataset;

use super::styling::{highlight, muted, passed, pending, strong};
use super::tables::{color_coded_coverage_cell, create_cyan_header, create_table, delay_cell};

/// Prints a human-readable summary of the dataset to stdout.
///
/// Shows an overview, one table row per revision in ascending revision
/// order, and any stage failures the run continued past.
pub fn print_summary(dataset: &Dataset) {
    println!("{}", render_summary(dataset));
}

fn add_section_header(output: &mut String, emoji: &str, title: &str) {
    let _ = writeln!(output, "{} {}", strong(emoji), strong(title).underlined());
}

pub fn render_summary(dataset: &Dataset) -> String {
    let mut output = String::new();

    add_section_header(&mut output, "📊", "Overview");
    let _ = writeln!(
        output,
        "  {} {}\n  {} {}\n  {} {}\n  {} {}\n",
        muted("Project:"),
        highlight(dataset.project),
        muted("Revisions measured:"),
        pending(dataset.len()),
        muted("Stage failures tolerated:"),
        if dataset.diagnostics.is_empty() {
            passed(0)
        } else {
            pending(dataset.diagnostics.len())
        },
        muted("Collected:"),
        muted(dataset.collected_at.format("%Y-%m-%d %H:%M UTC"))
    );

    if dataset.is_empty() {
        let _ = writeln!(output, "{}", pending("No revisions measured."));
        return output;
    }

    add_section_header(&mut output, "📈", "Revisions");
    let mut table = create_table();
    table.set_header(create_cyan_header(&[
        "Revision",
        "Line Coverage",
        "Condition Coverage",
        "Complexity",
        "Test Delay",
    ]));

    for (revision, record) in &dataset.revisions {
        table.add_row(vec![
            Cell::new(revision),
            color_coded_coverage_cell(record.coverage.line_coverage_percent),
            color_coded_coverage_cell(record.coverage.condition_coverage_percent),
            Cell::new(format!("{:.0}", record.complexity.complexity)),
            delay_cell(record.test_delay_secs),
        ]);
    }
    let _ = writeln!(output, "{table}\n");

    if !dataset.diagnostics.is_empty() {
        add_section_header(&mut output, "⚠️", "Stage Failures");
        let mut failures = create_table();
        failures.set_header(create_cyan_header(&["Revision", "Stage", "Exit", "Output"]));
        for diagnostic in &dataset.diagnostics {
            failures.add_row(vec![
                Cell::new(&diagnostic.revision),
                Cell::new(&diagnostic.stage),
                Cell::new(
                    diagnostic
                        .exit_code
                        .map_or_else(|| "signal".to_string(), |code| code.to_string()),
                )
                .fg(TableColor::Red),
                Cell::new(&diagnostic.output),
            ]);
        }
        let _ = writeln!(output, "{failures}\n");
    }

    output
}
