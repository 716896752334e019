mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::{export_dataset, write_chart_series};
pub use progress::{print_stages_header, StageProgress};
use styling::{muted, title};
pub use summary::{print_summary, render_summary};

/// Prints the `revharvest` banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        title("🐞 revharvest"),
        muted(env!("CARGO_PKG_VERSION")),
        muted("Coverage and complexity across benchmark bug revisions")
    );
}
