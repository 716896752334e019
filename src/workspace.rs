use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::dataset::Revision;
use crate::error::Result;

/// Directory holding one checkout per revision: `<work>/<subdir>/<revision>`.
#[derive(Debug, Clone)]
pub struct WorkRoot {
    root: PathBuf,
}

/// Difference between the revisions a run expects and the checkouts on disk.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Drift {
    /// Expected but not checked out
    pub missing: Vec<Revision>,
    /// Checked out but not part of this run
    pub extra: Vec<Revision>,
}

impl Drift {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

impl WorkRoot {
    pub fn new(work_dir: &Path, subdir: &str) -> Self {
        Self {
            root: work_dir.join(subdir),
        }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn workspace(&self, revision: &Revision) -> PathBuf {
        self.root.join(revision.as_str())
    }

    /// Revisions that currently have a checkout directory, in revision order.
    pub fn list(&self) -> Result<Vec<Revision>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut revisions = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                revisions.push(Revision::new(entry.file_name().to_string_lossy()));
            }
        }
        revisions.sort();
        Ok(revisions)
    }

    /// Compares the checkouts on disk with the canonical revision list.
    pub fn drift(&self, expected: &[Revision]) -> Result<Drift> {
        let on_disk: BTreeSet<Revision> = self.list()?.into_iter().collect();
        let expected_set: BTreeSet<&Revision> = expected.iter().collect();

        let missing = expected
            .iter()
            .filter(|rev| !on_disk.contains(*rev))
            .cloned()
            .collect();
        let extra = on_disk
            .into_iter()
            .filter(|rev| !expected_set.contains(rev))
            .collect();

        Ok(Drift { missing, extra })
    }
}
