use anyhow::{Context, Result};
use clap::{ArgGroup, Parser};
use log::info;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::auth::{Credentials, ServerAuth, Token};
use crate::config::{Config, OutputConfig, OutputFormat};
use crate::dataset::Dataset;
use crate::defects4j::Toolkit;
use crate::output;
use crate::pipeline::{Pipeline, PipelineOptions};
use crate::sonar::{ComplexityExtractor, SonarClient, SonarScanner};
use crate::workspace::WorkRoot;

#[derive(Parser)]
#[command(name = "revharvest")]
#[command(author, version, about = "Collect coverage and complexity across benchmark bug revisions", long_about = None)]
#[command(group(ArgGroup::new("server-auth").required(true).args(["token", "username"])))]
pub struct Cli {
    /// Directory to create checkouts in
    #[arg(short = 'w', long = "work-dir")]
    work_dir: PathBuf,

    /// defects4j bin directory or executable
    #[arg(short = 'd', long = "defects4j")]
    toolkit: PathBuf,

    /// sonar-scanner bin directory or executable
    #[arg(short = 's', long = "scanner")]
    scanner: PathBuf,

    /// Benchmark project to measure
    #[arg(short = 'p', long)]
    project: String,

    /// Analysis server user token (bearer authentication)
    #[arg(short = 't', long, env = "SONAR_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Analysis server username (session-cookie authentication)
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Password for --username; prompted without echo when absent
    #[arg(long, env = "SONAR_PASSWORD", hide_env_values = true, requires = "username")]
    password: Option<String>,

    /// Token the scanner uses to upload analyses
    #[arg(short = 'k', long = "scanner-token", env = "SONAR_SCANNER_TOKEN", hide_env_values = true)]
    scanner_token: String,

    /// Configuration file (TOML, JSON or YAML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Analysis server URL
    #[arg(long)]
    server_url: Option<String>,

    /// Report format
    #[arg(short = 'f', long, value_enum)]
    format: Option<OutputFormat>,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// Do not write chart series files
    #[arg(long, default_value_t = false)]
    no_charts: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.server_url {
            config.server.url.clone_from(url);
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.pretty {
            config.output.pretty = true;
        }
        if self.no_charts {
            config.output.charts = false;
        }
    }

    /// Turns the auth flags into a server credential, logging in if needed.
    async fn resolve_auth(&self, server_url: &str) -> Result<ServerAuth> {
        if let Some(token) = &self.token {
            return Ok(ServerAuth::Bearer(Token::from(token.as_str())));
        }

        let username = self
            .username
            .clone()
            .context("either --token or --username is required")?;

        let password = match &self.password {
            Some(password) => password.clone(),
            None => {
                let term = console::Term::stderr();
                term.write_str(&format!("Password for {username}: "))?;
                term.read_secure_line()
                    .context("Failed to read password")?
            }
        };

        let credentials = Credentials {
            username,
            password: Token::from(password),
        };
        let session = SonarClient::login(server_url, &credentials).await?;
        info!("Obtained analysis server session");

        Ok(ServerAuth::Session(session))
    }

    pub async fn execute(&self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        self.apply_overrides(&mut config);

        let auth = self.resolve_auth(&config.server.url).await?;

        let complexity = ComplexityExtractor::new(
            SonarScanner::new(
                &self.scanner,
                &config.server.url,
                Token::from(self.scanner_token.as_str()),
            ),
            SonarClient::new(&config.server.url, auth)?,
            config.server.project_key(),
            config.server.settle_delay(),
        );

        let pipeline = Pipeline::new(
            Toolkit::new(&self.toolkit),
            WorkRoot::new(&self.work_dir, &config.pipeline.checkout_subdir),
            complexity,
            PipelineOptions {
                policy: config.policy.failure_policy(),
                reference_project: config.pipeline.reference_project.clone(),
                collect_test_delays: config.pipeline.collect_test_delays,
            },
        );

        info!("Collecting metrics for project: {}", self.project);
        let dataset = pipeline.run(&self.project).await?;

        report(&dataset, &config.output, self.output.as_deref())
    }
}

/// Hands the finished dataset to the report writers.
fn report(dataset: &Dataset, config: &OutputConfig, output_path: Option<&Path>) -> Result<()> {
    match (config.format, output_path) {
        (OutputFormat::Summary, None) => output::print_summary(dataset),
        (OutputFormat::Summary, Some(path)) => {
            console::set_colors_enabled(false);
            std::fs::write(path, output::render_summary(dataset))
                .with_context(|| format!("Failed to write report: {}", path.display()))?;
        }
        (format, Some(path)) => {
            let mut file = File::create(path)
                .with_context(|| format!("Failed to create report: {}", path.display()))?;
            output::export_dataset(dataset, format, config.pretty, &mut file)?;
            file.flush()?;
        }
        (format, None) => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            output::export_dataset(dataset, format, config.pretty, &mut handle)?;
        }
    }

    if let Some(path) = output_path {
        info!("Report written to: {}", path.display());
    }

    if config.charts {
        let dir = config
            .chart_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."));
        for path in output::write_chart_series(dataset, &dir)? {
            info!("Chart series saved as '{}'", path.display());
        }
    }

    Ok(())
}
