mod orchestrator;
mod policy;

pub use orchestrator::{Pipeline, PipelineOptions};
pub use policy::{FailurePolicy, OnFailure};
