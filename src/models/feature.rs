//! Input features supplied by a geometry source.
//!
//! All coordinates are expressed in the source's metric frame. Features are
//! immutable once loaded.

use geo::{Euclidean, Length, MultiLineString, Point};

/// A bus stop.
#[derive(Debug, Clone, PartialEq)]
pub struct StopFeature {
    pub id: String,
    pub location: Point<f64>,
}

impl StopFeature {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            location: Point::new(x, y),
        }
    }
}

/// A bus line, possibly made of several disjoint parts.
#[derive(Debug, Clone, PartialEq)]
pub struct LineFeature {
    pub id: String,
    pub geometry: MultiLineString<f64>,
}

impl LineFeature {
    pub fn new(id: impl Into<String>, geometry: MultiLineString<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
        }
    }

    /// Planar length in frame units (meters in a metric frame)
    pub fn length(&self) -> f64 {
        Euclidean.length(&self.geometry)
    }
}

/// A street address point.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressFeature {
    pub id: String,
    pub location: Point<f64>,
    /// Residents at this address, when the dataset carries that attribute
    pub population: Option<u64>,
}

impl AddressFeature {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            location: Point::new(x, y),
            population: None,
        }
    }

    pub fn with_population(mut self, population: u64) -> Self {
        self.population = Some(population);
        self
    }
}

/// The address dataset together with what is known about its attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AddressSet {
    pub features: Vec<AddressFeature>,
    /// Whether the source data carries a population attribute at all.
    ///
    /// Distinguishes "nobody lives there" from "population unknown".
    pub has_population: bool,
}

impl AddressSet {
    /// Build a set, inferring `has_population` from the features.
    pub fn new(features: Vec<AddressFeature>) -> Self {
        let has_population = features.iter().any(|a| a.population.is_some());
        Self {
            features,
            has_population,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
