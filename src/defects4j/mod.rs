mod coverage;
mod discovery;
mod toolkit;

pub use coverage::extract_coverage;
pub use discovery::discover_revisions;
pub use toolkit::Toolkit;
