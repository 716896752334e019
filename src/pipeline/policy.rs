use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-revision loops of a run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Checkout,
    Coverage,
    Compile,
    Complexity,
    TestDelay,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Checkout => "checkout",
            Stage::Coverage => "coverage",
            Stage::Compile => "compile",
            Stage::Complexity => "complexity",
            Stage::TestDelay => "test",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configured reaction to a failed tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnFailure {
    Abort,
    Continue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Record a diagnostic and keep going
    Continue,
    /// Stop the run without producing a dataset
    Abort,
}

impl From<OnFailure> for Decision {
    fn from(value: OnFailure) -> Self {
        match value {
            OnFailure::Abort => Decision::Abort,
            OnFailure::Continue => Decision::Continue,
        }
    }
}

/// Continue-or-abort table for stage failures.
///
/// | stage      | decision           |
/// |------------|--------------------|
/// | checkout   | `checkout` setting |
/// | coverage   | abort              |
/// | compile    | `compile` setting  |
/// | complexity | abort              |
/// | test       | `test` setting     |
///
/// Coverage and complexity produce dataset values, so their failures are
/// never negotiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailurePolicy {
    pub checkout: OnFailure,
    pub compile: OnFailure,
    pub test: OnFailure,
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self {
            checkout: OnFailure::Abort,
            compile: OnFailure::Continue,
            test: OnFailure::Continue,
        }
    }
}

impl FailurePolicy {
    pub fn decide(&self, stage: Stage) -> Decision {
        match stage {
            Stage::Coverage | Stage::Complexity => Decision::Abort,
            Stage::Checkout => self.checkout.into(),
            Stage::Compile => self.compile.into(),
            Stage::TestDelay => self.test.into(),
        }
    }
}
