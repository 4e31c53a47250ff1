// Analyzer module: cooler classification and assignment-level aggregation.

pub mod cooler;
pub mod summary;

pub use cooler::{Classifier, CoolerClassifier};
pub use summary::summarize;
