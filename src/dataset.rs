use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::HarvestError;

/// Benchmark projects a run may target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Project {
    Csv,
    Jsoup,
    Mockito,
    Time,
    Math,
}

impl Project {
    pub const ALL: [Project; 5] = [
        Project::Csv,
        Project::Jsoup,
        Project::Mockito,
        Project::Time,
        Project::Math,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Project::Csv => "Csv",
            Project::Jsoup => "Jsoup",
            Project::Mockito => "Mockito",
            Project::Time => "Time",
            Project::Math => "Math",
        }
    }

    pub fn supported() -> Vec<&'static str> {
        Self::ALL.iter().map(|p| p.as_str()).collect()
    }
}

impl FromStr for Project {
    type Err = HarvestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| HarvestError::UnsupportedProject {
                project: s.to_string(),
                supported: Self::supported(),
            })
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled buggy version of a project, e.g. bug `"12"`.
///
/// Ordering is numeric when both ids are numeric, so `"2" < "10"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Toolkit version string requesting the buggy variant (`<id>b`).
    pub fn buggy_version(&self) -> String {
        format!("{}b", self.0)
    }

    fn sort_key(&self) -> (u64, &str) {
        (self.0.parse().unwrap_or(u64::MAX), &self.0)
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageMeasurement {
    pub line_coverage_percent: f64,
    pub condition_coverage_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComplexityMeasurement {
    pub complexity: f64,
}

/// Everything collected for one revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisionRecord {
    pub coverage: CoverageMeasurement,
    pub complexity: ComplexityMeasurement,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_delay_secs: Option<f64>,
}

/// A stage failure the failure policy allowed the run to continue past.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDiagnostic {
    pub revision: Revision,
    pub stage: String,
    pub exit_code: Option<i32>,
    pub output: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Dataset {
    pub project: Project,
    pub collected_at: DateTime<Utc>,
    /// Complete records keyed by revision, in ascending revision order
    pub revisions: IndexMap<Revision, RevisionRecord>,
    pub diagnostics: Vec<StageDiagnostic>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.revisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    pub fn collects_test_delays(&self) -> bool {
        self.revisions
            .values()
            .any(|record| record.test_delay_secs.is_some())
    }
}
