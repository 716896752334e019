use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Unsupported project '{project}' (supported: {})", .supported.join(", "))]
    UnsupportedProject {
        project: String,
        supported: Vec<&'static str>,
    },

    #[error("Invalid toolkit installation: {0}")]
    ToolInstallation(String),

    #[error("Failed to launch {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{stage} failed for revision {revision}: {diagnostic}")]
    StageFailed {
        stage: String,
        revision: String,
        diagnostic: String,
    },

    #[error("Failed to capture coverage for revision {revision}")]
    CoverageMismatch { revision: String },

    #[error("Coverage value {value} out of range for revision {revision}")]
    CoverageOutOfRange { revision: String, value: f64 },

    #[error("Analysis server request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("No complexity measure for project key '{0}'")]
    MissingMeasure(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Workspace drift under {root}: missing [{}], extra [{}]", .missing.join(", "), .extra.join(", "))]
    WorkspaceDrift {
        root: String,
        missing: Vec<String>,
        extra: Vec<String>,
    },

    #[error("Revision {revision} is missing its {measurement} measurement")]
    IncompleteRecord {
        revision: String,
        measurement: &'static str,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
