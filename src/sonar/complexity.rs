use std::path::Path;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::Mutex;

use crate::dataset::{ComplexityMeasurement, Project, Revision};
use crate::error::{HarvestError, Result};
use crate::process::CommandOutcome;

use super::client::SonarClient;
use super::scanner::SonarScanner;

/// Uploads an analysis of a workspace to the server.
#[allow(async_fn_in_trait)]
pub trait Scan {
    async fn scan(&self, workspace: &Path, project_key: &str) -> Result<CommandOutcome>;
}

/// Reads a measure back from the server.
#[allow(async_fn_in_trait)]
pub trait MeasuresSource {
    async fn complexity(&self, project_key: &str) -> Result<ComplexityMeasurement>;
}

impl Scan for SonarScanner {
    async fn scan(&self, workspace: &Path, project_key: &str) -> Result<CommandOutcome> {
        SonarScanner::scan(self, workspace, project_key).await
    }
}

impl MeasuresSource for SonarClient {
    async fn complexity(&self, project_key: &str) -> Result<ComplexityMeasurement> {
        self.fetch_complexity(project_key).await
    }
}

/// Server-side project key used for each revision's analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProjectKey {
    /// `<project>-<revision>`, unique per revision
    #[default]
    PerRevision,
    /// One key reused by every revision; later scans overwrite earlier ones
    Shared(String),
}

impl ProjectKey {
    pub fn for_revision(&self, project: Project, revision: &Revision) -> String {
        match self {
            ProjectKey::PerRevision => format!("{project}-{revision}"),
            ProjectKey::Shared(key) => key.clone(),
        }
    }
}

/// Scan-then-query complexity measurement.
///
/// The scan and the query for one revision always run inside one critical
/// section, so a query can only ever observe the scan issued right before it.
pub struct ComplexityExtractor<S, M> {
    scanner: S,
    measures: M,
    keys: ProjectKey,
    settle: Duration,
    section: Mutex<()>,
}

impl<S: Scan, M: MeasuresSource> ComplexityExtractor<S, M> {
    pub fn new(scanner: S, measures: M, keys: ProjectKey, settle: Duration) -> Self {
        Self {
            scanner,
            measures,
            keys,
            settle,
            section: Mutex::new(()),
        }
    }

    pub async fn measure(
        &self,
        project: Project,
        revision: &Revision,
        workspace: &Path,
    ) -> Result<ComplexityMeasurement> {
        let key = self.keys.for_revision(project, revision);
        let _section = self.section.lock().await;

        let outcome = self.scanner.scan(workspace, &key).await?;
        debug!("Scanner output for {revision}:\n{}", outcome.output);
        if !outcome.success {
            warn!("Scan of revision {revision} failed:\n{}", outcome.tail(20));
            return Err(HarvestError::StageFailed {
                stage: "scan".to_string(),
                revision: revision.to_string(),
                diagnostic: format!("scanner exited with {:?}", outcome.exit_code),
            });
        }

        // Server-side indexing is asynchronous.
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        self.measures.complexity(&key).await
    }
}
