use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::dataset::{Project, Revision};
use crate::error::{HarvestError, Result};
use crate::process::{self, CommandOutcome};

/// Handle on an installed benchmark toolkit (`defects4j`).
///
/// Every action is a blocking subprocess call; the ones that operate on a
/// checkout run with the workspace as current directory.
#[derive(Debug, Clone)]
pub struct Toolkit {
    executable: PathBuf,
    bin_dir: PathBuf,
}

impl Toolkit {
    /// Accepts either the toolkit's `bin` directory or the executable itself.
    pub fn new(path: &Path) -> Self {
        let executable = process::resolve_executable(path, "defects4j");
        let bin_dir = if path.is_dir() {
            path.to_path_buf()
        } else {
            path.parent().map(Path::to_path_buf).unwrap_or_default()
        };

        Self {
            executable,
            bin_dir,
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutcome> {
        let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
        process::run(&self.executable, &args, cwd).await
    }

    /// Checks that the installation answers `info` for a known project.
    pub async fn verify_installation(&self, reference_project: &str) -> Result<()> {
        let outcome = self.run(&["info", "-p", reference_project], None).await?;
        if !outcome.success {
            return Err(HarvestError::ToolInstallation(format!(
                "'{} info -p {reference_project}' exited with {:?}: {}",
                self.executable.display(),
                outcome.exit_code,
                outcome.tail(5)
            )));
        }

        info!("Toolkit at {} is usable", self.bin_dir.display());
        Ok(())
    }

    /// Materializes the buggy variant of `revision` into `dest`.
    pub async fn checkout(
        &self,
        project: Project,
        revision: &Revision,
        dest: &Path,
    ) -> Result<CommandOutcome> {
        let version = revision.buggy_version();
        let dest = dest.to_string_lossy();
        debug!("Checking out {project}-{version} into {dest}");

        self.run(
            &["checkout", "-p", project.as_str(), "-v", version.as_str(), "-w", &*dest],
            None,
        )
        .await
    }

    pub async fn coverage(&self, workspace: &Path) -> Result<CommandOutcome> {
        self.run(&["coverage"], Some(workspace)).await
    }

    pub async fn compile(&self, workspace: &Path) -> Result<CommandOutcome> {
        self.run(&["compile"], Some(workspace)).await
    }

    pub async fn test(&self, workspace: &Path) -> Result<CommandOutcome> {
        self.run(&["test"], Some(workspace)).await
    }
}
