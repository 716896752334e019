use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::dataset::{Project, Revision};
use crate::error::{HarvestError, Result};

/// Locates the per-project trigger-test records next to the toolkit's `bin`.
///
/// `<toolkit>/bin` maps to `<toolkit>/projects/<project>/trigger_tests`.
pub fn trigger_tests_dir(bin_dir: &Path, project: Project) -> Result<PathBuf> {
    if bin_dir.file_name().and_then(|n| n.to_str()) != Some("bin") {
        return Err(HarvestError::ToolInstallation(format!(
            "expected the toolkit 'bin' directory, got {}",
            bin_dir.display()
        )));
    }

    let root = bin_dir.parent().ok_or_else(|| {
        HarvestError::ToolInstallation(format!("{} has no parent", bin_dir.display()))
    })?;

    Ok(root
        .join("projects")
        .join(project.as_str())
        .join("trigger_tests"))
}

/// Lists the labeled bug revisions of `project`, one per trigger-test record.
///
/// The result is sorted in ascending revision order and free of duplicates.
pub fn discover_revisions(bin_dir: &Path, project: Project) -> Result<Vec<Revision>> {
    let dir = trigger_tests_dir(bin_dir, project)?;
    debug!("Reading trigger tests from {}", dir.display());

    let entries = fs::read_dir(&dir).map_err(|e| {
        HarvestError::ToolInstallation(format!("cannot read {}: {e}", dir.display()))
    })?;

    let mut revisions = Vec::new();
    for entry in entries {
        let name = entry?.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        revisions.push(Revision::new(name));
    }

    revisions.sort();
    revisions.dedup();

    if revisions.is_empty() {
        return Err(HarvestError::ToolInstallation(format!(
            "no revisions recorded for {project} in {}",
            dir.display()
        )));
    }

    info!("Discovered {} revisions for {project}", revisions.len());
    Ok(revisions)
}
