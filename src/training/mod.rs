//! Training loop and run metrics.

pub mod fit;
pub mod report;

pub use fit::{evaluate, fit};
pub use report::{EpochMetrics, TrainingReport};
