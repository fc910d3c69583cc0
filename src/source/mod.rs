//! Geometry sources feeding the coverage engine.
//!
//! A source hands out a read-only snapshot of stops, lines and addresses in a
//! known metric frame. File-backed stores lend their in-memory snapshot; a
//! database-backed store would build an owned one per request.

mod geojson_file;

pub use geojson_file::{DatasetSummary, GeoJsonFileSource, SourceSummary};

use std::borrow::Cow;

use crate::coverage::CoverageError;
use crate::models::{AddressSet, Crs, LineFeature, StopFeature};

pub trait GeometrySource {
    fn datasets(&self) -> Result<Cow<'_, Datasets>, CoverageError>;
}

/// Stops are mandatory; lines and addresses may be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct Datasets {
    pub crs: Crs,
    pub stops: Vec<StopFeature>,
    pub lines: Option<Vec<LineFeature>>,
    pub addresses: Option<AddressSet>,
}

impl Datasets {
    pub fn new(crs: Crs, stops: Vec<StopFeature>) -> Self {
        Self {
            crs,
            stops,
            lines: None,
            addresses: None,
        }
    }

    pub fn with_lines(mut self, lines: Vec<LineFeature>) -> Self {
        self.lines = Some(lines);
        self
    }

    pub fn with_addresses(mut self, addresses: AddressSet) -> Self {
        self.addresses = Some(addresses);
        self
    }
}

/// An in-memory snapshot is its own source.
impl GeometrySource for Datasets {
    fn datasets(&self) -> Result<Cow<'_, Datasets>, CoverageError> {
        Ok(Cow::Borrowed(self))
    }
}
