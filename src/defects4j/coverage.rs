use std::sync::LazyLock;

use regex::Regex;

use crate::dataset::{CoverageMeasurement, Revision};
use crate::error::{HarvestError, Result};

static COVERAGE_REPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Lines total:\s*(\d+)\s*Lines covered:\s*(\d+)\s*Conditions total:\s*(\d+)\s*Conditions covered:\s*(\d+)\s*Line coverage:\s*([\d.]+)%\s*Condition coverage:\s*([\d.]+)%",
    )
    .expect("coverage report pattern is valid")
});

/// Figures printed by the toolkit's `coverage` action.
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageReport {
    pub lines_total: u64,
    pub lines_covered: u64,
    pub conditions_total: u64,
    pub conditions_covered: u64,
    pub line_coverage: f64,
    pub condition_coverage: f64,
}

/// Finds the coverage summary anywhere in the tool output.
///
/// Returns `None` when the six fields do not appear in the expected order.
pub fn parse_coverage_report(output: &str) -> Option<CoverageReport> {
    let caps = COVERAGE_REPORT.captures(output)?;

    Some(CoverageReport {
        lines_total: caps[1].parse().ok()?,
        lines_covered: caps[2].parse().ok()?,
        conditions_total: caps[3].parse().ok()?,
        conditions_covered: caps[4].parse().ok()?,
        line_coverage: caps[5].parse().ok()?,
        condition_coverage: caps[6].parse().ok()?,
    })
}

/// Extracts the two coverage percentages for `revision`.
///
/// A report that cannot be parsed, or a percentage outside `0..=100`, is an
/// extraction error.
pub fn extract_coverage(revision: &Revision, output: &str) -> Result<CoverageMeasurement> {
    let report = parse_coverage_report(output).ok_or_else(|| HarvestError::CoverageMismatch {
        revision: revision.to_string(),
    })?;

    for value in [report.line_coverage, report.condition_coverage] {
        if !(0.0..=100.0).contains(&value) {
            return Err(HarvestError::CoverageOutOfRange {
                revision: revision.to_string(),
                value,
            });
        }
    }

    Ok(CoverageMeasurement {
        line_coverage_percent: report.line_coverage,
        condition_coverage_percent: report.condition_coverage,
    })
}
