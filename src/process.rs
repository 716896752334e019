use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use log::debug;
use tokio::process::Command;

use crate::error::{HarvestError, Result};

/// Result of one external tool invocation.
///
/// `output` is stderr followed by stdout, which is the order the tools'
/// reports are matched against.
#[derive(Debug, Clone)]
pub struct CommandOutcome {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub output: String,
    pub elapsed: Duration,
}

impl CommandOutcome {
    /// Last few lines of output, for log messages and diagnostics.
    pub fn tail(&self, lines: usize) -> String {
        let all: Vec<&str> = self.output.lines().collect();
        let start = all.len().saturating_sub(lines);
        all[start..].join("\n")
    }
}

/// Resolves a tool executable from either its full path or its bin directory.
pub fn resolve_executable(path: &Path, name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(name)
    } else {
        path.to_path_buf()
    }
}

const SECRET_PROPERTIES: [&str; 2] = ["-Dsonar.token=", "-Dsonar.login="];

/// Joins `args` for logging with credential property values masked.
fn loggable_args(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            match SECRET_PROPERTIES
                .iter()
                .find(|prefix| arg.starts_with(**prefix))
            {
                Some(prefix) => format!("{prefix}***"),
                None => arg.clone(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Runs `program` to completion and captures its output.
///
/// Only a failure to launch is an error; a non-zero exit is reported through
/// [`CommandOutcome::success`] so the caller decides what it means.
pub async fn run(program: &Path, args: &[String], cwd: Option<&Path>) -> Result<CommandOutcome> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!("Running {} {}", program.display(), loggable_args(args));

    let start = Instant::now();
    let output = command.output().await.map_err(|source| HarvestError::Spawn {
        program: program.display().to_string(),
        source,
    })?;
    let elapsed = start.elapsed();

    let mut text = String::from_utf8_lossy(&output.stderr).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stdout));

    Ok(CommandOutcome {
        success: output.status.success(),
        exit_code: output.status.code(),
        output: text,
        elapsed,
    })
}
