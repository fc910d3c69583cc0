//! Buffer construction around stops and lines.
//!
//! Buffers are built in the metric analysis frame. Every stop contributes one
//! disk; the disks are merged with a single unary union so that classification
//! afterwards tests each address against one polygon.

use std::f64::consts::{PI, TAU};

use geo::{unary_union, Buffer, Coord, LineString, MultiPolygon, Point, Polygon};
use tracing::debug;

use super::error::{validate_radius, CoverageError};
use crate::models::LineFeature;

/// Segments per quarter circle when approximating a disk
pub const DEFAULT_QUADRANT_SEGMENTS: usize = 16;

/// Relative slack on the vertex distance so that points at exactly `radius`
/// on a tangent edge survive rounding
const TANGENT_SLACK: f64 = 1e-9;

/// Regular polygon enclosing the disk of `radius` around `center`.
///
/// Edges are tangent to the circle and vertices sit at `radius / cos(PI / n)`,
/// starting at angle 0. Every point within `radius` of the center is covered.
pub fn disk(center: Point<f64>, radius: f64, quadrant_segments: usize) -> Polygon<f64> {
    let n = 4 * quadrant_segments.max(1);
    let vertex_distance = radius / (PI / n as f64).cos() * (1.0 + TANGENT_SLACK);
    let mut ring: Vec<Coord<f64>> = (0..n)
        .map(|i| {
            let angle = TAU * i as f64 / n as f64;
            Coord {
                x: center.x() + vertex_distance * angle.cos(),
                y: center.y() + vertex_distance * angle.sin(),
            }
        })
        .collect();
    ring.push(ring[0]);

    Polygon::new(LineString::new(ring), vec![])
}

/// Union of the disks of `radius` around every point.
///
/// A zero radius or an empty point set yields the empty polygon, which
/// intersects nothing.
pub fn build_buffer(
    points: impl IntoIterator<Item = Point<f64>>,
    radius: f64,
    quadrant_segments: usize,
) -> Result<MultiPolygon<f64>, CoverageError> {
    let radius = validate_radius("radius_meters", radius)?;
    if quadrant_segments == 0 {
        return Err(CoverageError::InvalidSegments);
    }

    if radius == 0.0 {
        return Ok(MultiPolygon::new(vec![]));
    }

    let disks: Vec<Polygon<f64>> = points
        .into_iter()
        .map(|p| disk(p, radius, quadrant_segments))
        .collect();

    debug!("Merging {} disks of radius {} m", disks.len(), radius);

    Ok(match disks.len() {
        0 => MultiPolygon::new(vec![]),
        1 => MultiPolygon::new(disks),
        _ => unary_union(&disks),
    })
}

/// Union of the round-capped buffers of every line.
pub fn build_line_buffer(
    lines: &[LineFeature],
    radius: f64,
) -> Result<MultiPolygon<f64>, CoverageError> {
    let radius = validate_radius("line_buffer_radius_meters", radius)?;

    if radius == 0.0 || lines.is_empty() {
        return Ok(MultiPolygon::new(vec![]));
    }

    let parts: Vec<MultiPolygon<f64>> = lines
        .iter()
        .map(|line| line.geometry.buffer(radius))
        .collect();

    debug!("Merging {} line buffers of radius {} m", parts.len(), radius);

    Ok(unary_union(&parts))
}
