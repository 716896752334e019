mod client;
mod complexity;
mod scanner;

pub use client::SonarClient;
pub use complexity::{ComplexityExtractor, MeasuresSource, ProjectKey, Scan};
pub use scanner::SonarScanner;
