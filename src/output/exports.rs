use anyhow::{bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::dataset::Dataset;

/// Exports the dataset for programmatic use.
///
/// - JSON: the whole dataset, diagnostics included
/// - CSV: one row per revision
pub fn export_dataset(
    dataset: &Dataset,
    format: OutputFormat,
    pretty: bool,
    output: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Json => export_json(dataset, pretty, output),
        OutputFormat::Csv => export_csv(dataset, output),
        OutputFormat::Summary => bail!("summary output is rendered, not exported"),
    }
}

fn export_json(dataset: &Dataset, pretty: bool, output: &mut dyn Write) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(dataset)?
    } else {
        serde_json::to_string(dataset)?
    };
    writeln!(output, "{json}")?;
    Ok(())
}

fn export_csv(dataset: &Dataset, output: &mut dyn Write) -> Result<()> {
    writeln!(
        output,
        "Revision,Line Coverage,Condition Coverage,Complexity,Test Delay (s)"
    )?;

    for (revision, record) in &dataset.revisions {
        writeln!(
            output,
            "{},{:.1},{:.1},{},{}",
            revision,
            record.coverage.line_coverage_percent,
            record.coverage.condition_coverage_percent,
            record.complexity.complexity,
            record
                .test_delay_secs
                .map(|secs| format!("{secs:.3}"))
                .unwrap_or_default()
        )?;
    }

    Ok(())
}

/// Time series handed to the chart renderer, one file per chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    CyclomaticComplexity,
    TestDelays,
    Coverage,
}

impl ChartKind {
    /// Stem shared by the series file and the rendered chart image.
    pub fn stem(self, project: &str) -> String {
        let suffix = match self {
            ChartKind::CyclomaticComplexity => "cyclomatic_complexity",
            ChartKind::TestDelays => "test_delays",
            ChartKind::Coverage => "coverage",
        };
        format!("{project}_{suffix}")
    }

    fn header(self) -> &'static str {
        match self {
            ChartKind::CyclomaticComplexity => "version,complexity",
            ChartKind::TestDelays => "version,delay_seconds",
            ChartKind::Coverage => "version,line_coverage,condition_coverage",
        }
    }

    fn rows(self, dataset: &Dataset) -> Vec<String> {
        dataset
            .revisions
            .iter()
            .filter_map(|(revision, record)| match self {
                ChartKind::CyclomaticComplexity => {
                    Some(format!("{revision},{}", record.complexity.complexity))
                }
                ChartKind::TestDelays => record
                    .test_delay_secs
                    .map(|secs| format!("{revision},{secs:.3}")),
                ChartKind::Coverage => Some(format!(
                    "{revision},{},{}",
                    record.coverage.line_coverage_percent,
                    record.coverage.condition_coverage_percent
                )),
            })
            .collect()
    }
}

/// Writes `<project>_<chart>.csv` series files into `dir`.
///
/// The test-delay series is only written when the run collected delays.
pub fn write_chart_series(dataset: &Dataset, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create chart directory: {}", dir.display()))?;

    let mut charts = vec![ChartKind::Coverage, ChartKind::CyclomaticComplexity];
    if dataset.collects_test_delays() {
        charts.push(ChartKind::TestDelays);
    }

    let mut written = Vec::with_capacity(charts.len());
    for chart in charts {
        let path = dir.join(format!("{}.csv", chart.stem(dataset.project.as_str())));
        let mut contents = format!("{}\n", chart.header());
        for row in chart.rows(dataset) {
            contents.push_str(&row);
            contents.push('\n');
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write chart series: {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}
