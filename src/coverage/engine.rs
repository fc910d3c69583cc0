//! The `compute_coverage` pipeline: buffer, classify, aggregate, assemble.

use geojson::FeatureCollection;
use std::time::Instant;
use tracing::{debug, info};

use super::assemble::{assemble, buffer_collection, Assembly, CoverageResponse};
use super::buffer::{build_buffer, build_line_buffer, DEFAULT_QUADRANT_SEGMENTS};
use super::classify::classify;
use super::error::{validate_radius, CoverageError, MissingDataset};
use super::index::CoverageIndex;
use super::stats::aggregate;
use crate::models::{AddressFeature, Crs};
use crate::reproject::Reprojection;
use crate::source::{Datasets, GeometrySource};

/// Parameters of one coverage request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageRequest {
    pub radius_m: f64,
    /// Enables the two-tier classification when lines are available
    pub line_radius_m: Option<f64>,
}

impl CoverageRequest {
    pub fn new(radius_m: f64) -> Self {
        Self {
            radius_m,
            line_radius_m: None,
        }
    }

    pub fn with_line_radius(mut self, line_radius_m: f64) -> Self {
        self.line_radius_m = Some(line_radius_m);
        self
    }

    fn validate(&self) -> Result<(), CoverageError> {
        validate_radius("radius_meters", self.radius_m)?;
        if let Some(r) = self.line_radius_m {
            validate_radius("line_buffer_radius_meters", r)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    pub display_crs: Crs,
    pub quadrant_segments: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            display_crs: Crs::Wgs84,
            quadrant_segments: DEFAULT_QUADRANT_SEGMENTS,
        }
    }
}

fn metric_snapshot<'s>(
    source: &'s dyn GeometrySource,
) -> Result<std::borrow::Cow<'s, Datasets>, CoverageError> {
    let datasets = source.datasets()?;
    if !datasets.crs.is_metric() {
        return Err(CoverageError::NonMetricFrame(datasets.crs));
    }
    Ok(datasets)
}

/// Run the whole pipeline once against a snapshot of `source`.
///
/// Parameters are checked before the source is touched. Any failure aborts the
/// request; absent optional datasets only show up in `missing_datasets`.
pub fn compute_coverage(
    source: &dyn GeometrySource,
    request: &CoverageRequest,
    options: &EngineOptions,
) -> Result<CoverageResponse, CoverageError> {
    request.validate()?;
    if options.quadrant_segments == 0 {
        return Err(CoverageError::InvalidSegments);
    }

    let started = Instant::now();
    let datasets = metric_snapshot(source)?;

    let mut missing_datasets = Vec::new();
    let addresses: &[AddressFeature] = match &datasets.addresses {
        Some(set) => {
            if !set.has_population {
                missing_datasets.push(MissingDataset::Population);
            }
            set.features.as_slice()
        }
        None => {
            missing_datasets.push(MissingDataset::Addresses);
            missing_datasets.push(MissingDataset::Population);
            &[]
        }
    };
    let has_population = datasets.addresses.as_ref().is_some_and(|a| a.has_population);
    let lines = datasets.lines.as_deref();
    if lines.is_none() {
        missing_datasets.push(MissingDataset::Lines);
    }

    let stop_buffer = CoverageIndex::build(build_buffer(
        datasets.stops.iter().map(|s| s.location),
        request.radius_m,
        options.quadrant_segments,
    )?);
    debug!(
        "Stop buffer: {} parts, {:.0} m2",
        stop_buffer.len(),
        stop_buffer.area()
    );

    let line_buffer = match (request.line_radius_m, lines) {
        (Some(radius), Some(lines)) => Some(CoverageIndex::build(build_line_buffer(lines, radius)?)),
        _ => None,
    };

    let classification = classify(addresses, &stop_buffer, line_buffer.as_ref());
    let stats = aggregate(
        &classification,
        &datasets.stops,
        &stop_buffer,
        line_buffer.as_ref(),
        lines,
        has_population,
    );

    info!(
        "Coverage at {} m: {}/{} addresses served ({}%), {} stops, {:?}",
        request.radius_m,
        stats.served_count,
        stats.total_addresses,
        stats.pct_served,
        stats.total_stops,
        started.elapsed()
    );

    let display = Reprojection::new(datasets.crs, options.display_crs);
    Ok(assemble(
        Assembly {
            stop_buffer: &stop_buffer,
            line_buffer: line_buffer.as_ref(),
            classification: &classification,
            stats,
            missing_datasets,
        },
        &display,
    ))
}

/// The line proximity buffer alone, in the display frame.
///
/// Empty collection when there is no line dataset.
pub fn compute_line_buffer(
    source: &dyn GeometrySource,
    radius_m: f64,
    options: &EngineOptions,
) -> Result<FeatureCollection, CoverageError> {
    validate_radius("line_buffer_radius_meters", radius_m)?;
    let datasets = metric_snapshot(source)?;

    let lines = datasets.lines.as_deref().unwrap_or_default();
    let buffer = build_line_buffer(lines, radius_m)?;
    let display = Reprojection::new(datasets.crs, options.display_crs);

    Ok(buffer_collection(&buffer, "line_buffer", &display))
}
