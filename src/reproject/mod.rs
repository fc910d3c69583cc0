//! Boundary coordinate conversion between the analysis frame and WGS84.
//!
//! Used when loading geographic input and when handing results to a map
//! client. The analysis itself never runs on converted coordinates.

mod lambert;
mod mercator;

pub use lambert::LambertConic;

use geo::{Coord, MapCoords};

use crate::models::Crs;

#[derive(Debug, Clone, Copy)]
enum Frame {
    Geographic,
    Mercator,
    Lambert(LambertConic),
}

impl Frame {
    fn of(crs: Crs) -> Self {
        match crs {
            Crs::Wgs84 => Frame::Geographic,
            Crs::WebMercator => Frame::Mercator,
            Crs::QuebecLambert => Frame::Lambert(LambertConic::quebec()),
        }
    }

    fn to_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        let (x, y) = match self {
            Frame::Geographic => (c.x, c.y),
            Frame::Mercator => mercator::inverse(c.x, c.y),
            Frame::Lambert(proj) => proj.inverse(c.x, c.y),
        };
        Coord { x, y }
    }

    fn from_geographic(&self, c: Coord<f64>) -> Coord<f64> {
        let (x, y) = match self {
            Frame::Geographic => (c.x, c.y),
            Frame::Mercator => mercator::forward(c.x, c.y),
            Frame::Lambert(proj) => proj.forward(c.x, c.y),
        };
        Coord { x, y }
    }
}

/// A conversion from one reference frame to another, pivoting through WGS84.
#[derive(Debug, Clone, Copy)]
pub struct Reprojection {
    from_crs: Crs,
    to_crs: Crs,
    from: Frame,
    to: Frame,
}

impl Reprojection {
    pub fn new(from: Crs, to: Crs) -> Self {
        Self {
            from_crs: from,
            to_crs: to,
            from: Frame::of(from),
            to: Frame::of(to),
        }
    }

    pub fn source(&self) -> Crs {
        self.from_crs
    }

    pub fn target(&self) -> Crs {
        self.to_crs
    }

    pub fn is_identity(&self) -> bool {
        self.from_crs == self.to_crs
    }

    pub fn coord(&self, c: Coord<f64>) -> Coord<f64> {
        if self.is_identity() {
            return c;
        }
        self.to.from_geographic(self.from.to_geographic(c))
    }

    /// Convert every coordinate of a geometry
    pub fn apply<G>(&self, geometry: &G) -> G
    where
        G: MapCoords<f64, f64, Output = G>,
    {
        geometry.map_coords(|c| self.coord(c))
    }
}
