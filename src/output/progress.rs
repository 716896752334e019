use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{failed, passed, pending, strong};

/// Progress bar for one per-revision stage loop.
pub struct StageProgress {
    pb: ProgressBar,
    label: String,
}

impl StageProgress {
    pub fn start(label: impl Into<String>, total: usize) -> Self {
        let label = label.into();
        let pb = ProgressBar::new(total as u64);
        pb.set_draw_target(ProgressDrawTarget::stderr());
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {msg} [{bar:30.cyan/blue}] {pos}/{len} ({elapsed})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb.set_message(pending(&label).to_string());
        Self { pb, label }
    }

    pub fn advance(&self) {
        self.pb.inc(1);
    }

    pub fn finish(self) {
        self.pb
            .finish_with_message(passed(format!("{} ✓", self.label)).to_string());
    }

    pub fn abandon(self) {
        self.pb
            .abandon_with_message(failed(format!("{} ✗", self.label)).to_string());
    }
}

/// Prints the heading above the stage bars.
pub fn print_stages_header() {
    eprintln!("{}  {}", strong("⚙️"), strong("Stages").underlined());
}
