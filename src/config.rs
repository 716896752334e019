use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::pipeline::{FailurePolicy, OnFailure};
use crate::sonar::ProjectKey;

/// Configuration file structure for revharvest.
///
/// Every field has a default, so a run works without any file at all.
/// Command-line flags take precedence over values loaded here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Analysis server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Pipeline layout and optional stages
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Continuation decisions for non-extraction failures
    #[serde(default)]
    pub policy: PolicyConfig,

    /// Output format preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ServerConfig {
    /// Analysis server base URL
    #[serde(default = "default_server_url")]
    pub url: String,

    /// How server-side project keys are chosen
    #[serde(default)]
    pub project_key: KeyMode,

    /// Key used by every revision when `project-key = "shared"`
    #[serde(default = "default_shared_key")]
    pub shared_key: String,

    /// Pause between a scan and its measures query, in seconds
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum KeyMode {
    #[default]
    PerRevision,
    Shared,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Directory under the work dir that holds the checkouts
    #[serde(default = "default_checkout_subdir")]
    pub checkout_subdir: String,

    /// Time the toolkit's `test` action for every revision
    #[serde(default = "default_true")]
    pub collect_test_delays: bool,

    /// Project used for the toolkit self-check
    #[serde(default = "default_reference_project")]
    pub reference_project: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PolicyConfig {
    #[serde(default = "default_abort")]
    pub checkout: OnFailure,

    #[serde(default = "default_continue")]
    pub compile: OnFailure,

    #[serde(default = "default_continue")]
    pub test: OnFailure,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default output format
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,

    /// Write per-chart data series next to the report
    #[serde(default = "default_true")]
    pub charts: bool,

    /// Directory for chart series files (defaults to the current directory)
    pub chart_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Summary,
    Json,
    Csv,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: default_server_url(),
            project_key: KeyMode::default(),
            shared_key: default_shared_key(),
            settle_secs: default_settle_secs(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            checkout_subdir: default_checkout_subdir(),
            collect_test_delays: true,
            reference_project: default_reference_project(),
        }
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            checkout: OnFailure::Abort,
            compile: OnFailure::Continue,
            test: OnFailure::Continue,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Summary,
            pretty: false,
            charts: true,
            chart_dir: None,
        }
    }
}

fn default_server_url() -> String {
    "http://localhost:9000".to_string()
}

fn default_shared_key() -> String {
    "a".to_string()
}

fn default_settle_secs() -> u64 {
    5
}

fn default_checkout_subdir() -> String {
    "345".to_string()
}

fn default_reference_project() -> String {
    "Lang".to_string()
}

fn default_true() -> bool {
    true
}

fn default_abort() -> OnFailure {
    OnFailure::Abort
}

fn default_continue() -> OnFailure {
    OnFailure::Continue
}

impl ServerConfig {
    pub fn project_key(&self) -> ProjectKey {
        match self.project_key {
            KeyMode::PerRevision => ProjectKey::PerRevision,
            KeyMode::Shared => ProjectKey::Shared(self.shared_key.clone()),
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}

impl PolicyConfig {
    pub fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy {
            checkout: self.checkout,
            compile: self.compile,
            test: self.test,
        }
    }
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./revharvest.toml
    /// 3. ./revharvest.json
    /// 4. ./revharvest.yaml
    /// 5. ./revharvest.yml
    /// 6. `<user config dir>/revharvest/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "revharvest.toml",
            "revharvest.json",
            "revharvest.yaml",
            "revharvest.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(user_config) = dirs::config_dir().map(|d| d.join("revharvest").join("config.toml")) {
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}
