// src/extractors/mod.rs
pub mod catalog;
pub mod facts;

// Re-export key extraction types for convenience
pub use catalog::{MetricCatalog, METRIC_CATALOG};
pub use facts::{DedupPolicy, FactExtractor, FactQuery};
