//! Spatial index over the parts of a buffer polygon.

use geo::{Area, BoundingRect, Intersects, MultiLineString, MultiPolygon, Point, Polygon};
use rstar::{RTree, RTreeObject, AABB};

/// One connected part of a unioned buffer, indexed by its envelope
struct IndexedPart {
    polygon: Polygon<f64>,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedPart {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

impl IndexedPart {
    fn new(polygon: Polygon<f64>) -> Option<Self> {
        let rect = polygon.bounding_rect()?;
        Some(Self {
            polygon,
            envelope: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
        })
    }
}

/// Boundary-inclusive intersection tests against one buffer polygon.
///
/// The R-tree only narrows candidates by envelope; the exact predicate runs
/// on the polygon part itself. An index over the empty polygon intersects
/// nothing.
pub struct CoverageIndex {
    buffer: MultiPolygon<f64>,
    tree: RTree<IndexedPart>,
}

impl CoverageIndex {
    pub fn build(buffer: MultiPolygon<f64>) -> Self {
        let parts: Vec<IndexedPart> = buffer
            .iter()
            .cloned()
            .filter_map(IndexedPart::new)
            .collect();

        Self {
            buffer,
            tree: RTree::bulk_load(parts),
        }
    }

    pub fn polygon(&self) -> &MultiPolygon<f64> {
        &self.buffer
    }

    /// Area in frame units (square meters in a metric frame)
    pub fn area(&self) -> f64 {
        self.buffer.unsigned_area()
    }

    pub fn intersects_point(&self, point: &Point<f64>) -> bool {
        let query_envelope = AABB::from_point([point.x(), point.y()]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .any(|part| part.polygon.intersects(point))
    }

    pub fn intersects_lines(&self, lines: &MultiLineString<f64>) -> bool {
        let Some(rect) = lines.bounding_rect() else {
            return false;
        };
        let query_envelope =
            AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]);

        self.tree
            .locate_in_envelope_intersecting(&query_envelope)
            .any(|part| part.polygon.intersects(lines))
    }

    /// Number of connected parts
    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
