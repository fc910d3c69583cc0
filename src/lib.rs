//! Desserte - transit service coverage analysis
//!
//! Buffers transit stops (and optionally lines) in a metric frame, classifies
//! addresses against the served area and aggregates coverage statistics.
//! Shared by the `serve` and `analyze` binaries.

pub mod config;
pub mod coverage;
pub mod models;
pub mod reproject;
pub mod source;

pub use coverage::{compute_coverage, CoverageError, CoverageRequest, CoverageResponse, EngineOptions};
pub use models::Crs;
pub use source::{Datasets, GeoJsonFileSource, GeometrySource};
