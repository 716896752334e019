use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::error::Result;
use crate::process::{self, CommandOutcome};

/// Handle on the `sonar-scanner` CLI.
#[derive(Debug, Clone)]
pub struct SonarScanner {
    executable: PathBuf,
    server_url: String,
    token: Token,
}

impl SonarScanner {
    /// Accepts either the scanner's `bin` directory or the executable itself.
    pub fn new(path: &Path, server_url: &str, token: Token) -> Self {
        Self {
            executable: process::resolve_executable(path, "sonar-scanner"),
            server_url: server_url.trim_end_matches('/').to_string(),
            token,
        }
    }

    /// Analysis properties passed on the command line.
    pub fn arguments(&self, project_key: &str) -> Vec<String> {
        vec![
            format!("-Dsonar.projectKey={project_key}"),
            "-Dsonar.sources=.".to_string(),
            format!("-Dsonar.host.url={}", self.server_url),
            format!("-Dsonar.token={}", self.token.as_str()),
            "-Dsonar.java.binaries=target/classes".to_string(),
        ]
    }

    /// Scans `workspace` and uploads the analysis under `project_key`.
    pub async fn scan(&self, workspace: &Path, project_key: &str) -> Result<CommandOutcome> {
        process::run(&self.executable, &self.arguments(project_key), Some(workspace)).await
    }
}
