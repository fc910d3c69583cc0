//! Transit coverage analysis.
//!
//! Pipeline stages, in order: [`buffer`] builds the served area around stops
//! (and optionally lines), [`classify`] partitions addresses against it,
//! [`stats`] aggregates the metrics and [`assemble`] packages everything for
//! display. [`compute_coverage`] runs them all against a
//! [`GeometrySource`](crate::source::GeometrySource).

pub mod assemble;
pub mod buffer;
pub mod classify;
mod engine;
mod error;
pub mod index;
pub mod stats;

pub use assemble::CoverageResponse;
pub use buffer::{build_buffer, build_line_buffer, DEFAULT_QUADRANT_SEGMENTS};
pub use classify::{Category, Classification};
pub use engine::{compute_coverage, compute_line_buffer, CoverageRequest, EngineOptions};
pub use error::{radius_from_json, validate_radius, CoverageError, ErrorKind, ErrorReport, MissingDataset};
pub use index::CoverageIndex;
pub use stats::CoverageStats;
