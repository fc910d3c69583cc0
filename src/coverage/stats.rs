//! Aggregate coverage metrics.
//!
//! Every value here is computed in the metric analysis frame, before any
//! conversion for display. Areas taken after reprojection to degrees would be
//! meaningless.

use geo::{Area, BooleanOps};
use serde::Serialize;

use super::classify::Classification;
use super::index::CoverageIndex;
use crate::models::{LineFeature, StopFeature};

const M2_PER_KM2: f64 = 1_000_000.0;
const M_PER_KM: f64 = 1_000.0;

/// Summary record returned with every coverage response.
///
/// Optional fields are omitted when the dataset they derive from is
/// unavailable, so "zero" and "unknown" never look alike.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageStats {
    pub total_addresses: usize,
    pub total_stops: usize,
    pub served_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_line_count: Option<usize>,
    pub unserved_count: usize,
    /// Percentage of addresses served by a stop, one decimal
    pub pct_served: f64,
    pub covered_stops: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub covered_line_length_km: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub population_covered: Option<u64>,
    pub buffer_area_m2: f64,
    /// Area of the stop buffer merged with the line buffer, when there is one
    pub served_area_km2: f64,
}

/// Round half away from zero to `decimals` places.
///
/// `round_to(6.25, 1) == 6.3`, not the banker's 6.2.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Share of `part` in `total` as a percentage with one decimal; 0 when `total` is 0.
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(100.0 * part as f64 / total as f64, 1)
}

pub fn aggregate(
    classification: &Classification<'_>,
    stops: &[StopFeature],
    stop_buffer: &CoverageIndex,
    line_buffer: Option<&CoverageIndex>,
    lines: Option<&[LineFeature]>,
    has_population: bool,
) -> CoverageStats {
    let total_addresses = classification.total();
    let served_count = classification.served_by_stop.len();

    let covered_stops = stops
        .iter()
        .filter(|stop| stop_buffer.intersects_point(&stop.location))
        .count();

    let covered_line_length_km = lines.map(|lines| {
        let meters: f64 = lines
            .iter()
            .filter(|line| stop_buffer.intersects_lines(&line.geometry))
            .map(LineFeature::length)
            .sum();
        round_to(meters / M_PER_KM, 3)
    });

    let population_covered = has_population.then(|| {
        classification
            .served_by_stop
            .iter()
            .filter_map(|a| a.population)
            .fold(0u64, u64::saturating_add)
    });

    let buffer_area_m2 = stop_buffer.area();
    let footprint_m2 = match line_buffer {
        Some(line_buffer) if !line_buffer.is_empty() && !stop_buffer.is_empty() => {
            stop_buffer.polygon().union(line_buffer.polygon()).unsigned_area()
        }
        Some(line_buffer) if stop_buffer.is_empty() => line_buffer.area(),
        _ => buffer_area_m2,
    };

    CoverageStats {
        total_addresses,
        total_stops: stops.len(),
        served_count,
        near_line_count: classification.near_line_only.as_ref().map(Vec::len),
        unserved_count: classification.unserved.len(),
        pct_served: percentage(served_count, total_addresses),
        covered_stops,
        covered_line_length_km,
        population_covered,
        buffer_area_m2,
        served_area_km2: round_to(footprint_m2 / M2_PER_KM2, 3),
    }
}
