//! Core data models for the coverage engine.

pub mod crs;
pub mod feature;

pub use crs::{Crs, UnknownCrs};
pub use feature::{AddressFeature, AddressSet, LineFeature, StopFeature};
