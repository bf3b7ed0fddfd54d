//! Scoring Engine - frozen credit-default classifier

pub mod artifact;
pub mod engine;

pub use artifact::{ModelArtifact, ModelLoadError};
pub use engine::{categorize, EngineStatus, ScoringEngine, ScoringError};
