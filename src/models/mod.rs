//! Data models

pub mod feature;
pub mod prediction;
pub mod audit;
pub mod job;

pub use feature::*;
pub use prediction::*;
pub use audit::*;
pub use job::*;
