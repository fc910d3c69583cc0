//! Packaging of buffers, classified addresses and statistics for display.
//!
//! This is the only place where geometries leave the analysis frame.

use geo::{MultiPolygon, Point};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value};
use serde::Serialize;
use serde_json::json;

use super::classify::{Category, Classification};
use super::error::MissingDataset;
use super::index::CoverageIndex;
use super::stats::CoverageStats;
use crate::models::{AddressFeature, Crs, LineFeature, StopFeature};
use crate::reproject::Reprojection;

/// Result of one coverage computation, geometries in `display_crs`.
///
/// `line_buffer` and `near_line_only` are present exactly when the two-tier
/// classification ran; the other collections are always present, possibly empty.
#[derive(Debug, Clone, Serialize)]
pub struct CoverageResponse {
    pub display_crs: Crs,
    pub stop_buffer: FeatureCollection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_buffer: Option<FeatureCollection>,
    pub served_by_stop: FeatureCollection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub near_line_only: Option<FeatureCollection>,
    pub unserved: FeatureCollection,
    /// `[lat, lon]` in WGS84 degrees of every unserved address, whatever `display_crs` is
    pub heat_points: Vec<[f64; 2]>,
    pub missing_datasets: Vec<MissingDataset>,
    pub stats: CoverageStats,
}

/// Everything the assembler needs from one pipeline run
pub struct Assembly<'a, 'b> {
    pub stop_buffer: &'b CoverageIndex,
    pub line_buffer: Option<&'b CoverageIndex>,
    pub classification: &'b Classification<'a>,
    pub stats: CoverageStats,
    pub missing_datasets: Vec<MissingDataset>,
}

pub fn assemble(parts: Assembly<'_, '_>, display: &Reprojection) -> CoverageResponse {
    let classification = parts.classification;

    let to_degrees = Reprojection::new(display.source(), Crs::Wgs84);
    let heat_points = classification
        .unserved
        .iter()
        .map(|a| {
            let p = to_degrees.apply(&a.location);
            [p.y(), p.x()]
        })
        .collect();

    CoverageResponse {
        display_crs: display.target(),
        stop_buffer: buffer_collection(parts.stop_buffer.polygon(), "stop_buffer", display),
        line_buffer: parts
            .line_buffer
            .map(|b| buffer_collection(b.polygon(), "line_buffer", display)),
        served_by_stop: address_collection(
            &classification.served_by_stop,
            Category::ServedByStop,
            display,
        ),
        near_line_only: classification
            .near_line_only
            .as_ref()
            .map(|near| address_collection(near, Category::NearLineOnly, display)),
        unserved: address_collection(&classification.unserved, Category::Unserved, display),
        heat_points,
        missing_datasets: parts.missing_datasets,
        stats: parts.stats,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn feature(id: Option<&str>, value: Value, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: id.map(|id| Id::String(id.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn point_value(point: &Point<f64>, display: &Reprojection) -> Value {
    Value::from(&display.apply(point))
}

/// A buffer as a one-feature collection; empty collection for the empty polygon.
///
/// `area_m2` is taken from the metric polygon before conversion.
pub fn buffer_collection(
    polygon: &MultiPolygon<f64>,
    layer: &str,
    display: &Reprojection,
) -> FeatureCollection {
    if polygon.0.is_empty() {
        return collection(vec![]);
    }

    use geo::Area;
    let mut properties = JsonObject::new();
    properties.insert("layer".to_string(), json!(layer));
    properties.insert("area_m2".to_string(), json!(polygon.unsigned_area()));
    properties.insert("parts".to_string(), json!(polygon.0.len()));

    let value = Value::from(&display.apply(polygon));
    collection(vec![feature(None, value, properties)])
}

pub fn address_collection(
    addresses: &[&AddressFeature],
    category: Category,
    display: &Reprojection,
) -> FeatureCollection {
    let features = addresses
        .iter()
        .map(|a| address_feature(a, Some(category), display))
        .collect();
    collection(features)
}

fn address_feature(
    address: &AddressFeature,
    category: Option<Category>,
    display: &Reprojection,
) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("id".to_string(), json!(address.id));
    if let Some(category) = category {
        properties.insert("category".to_string(), json!(category.as_str()));
    }
    if let Some(population) = address.population {
        properties.insert("population".to_string(), json!(population));
    }

    feature(
        Some(&address.id),
        point_value(&address.location, display),
        properties,
    )
}

/// Raw address layer, without classification
pub fn addresses_layer(addresses: &[AddressFeature], display: &Reprojection) -> FeatureCollection {
    collection(
        addresses
            .iter()
            .map(|a| address_feature(a, None, display))
            .collect(),
    )
}

pub fn stops_layer(stops: &[StopFeature], display: &Reprojection) -> FeatureCollection {
    collection(
        stops
            .iter()
            .map(|stop| {
                let mut properties = JsonObject::new();
                properties.insert("id".to_string(), json!(stop.id));
                feature(
                    Some(&stop.id),
                    point_value(&stop.location, display),
                    properties,
                )
            })
            .collect(),
    )
}

pub fn lines_layer(lines: &[LineFeature], display: &Reprojection) -> FeatureCollection {
    collection(
        lines
            .iter()
            .map(|line| {
                let mut properties = JsonObject::new();
                properties.insert("id".to_string(), json!(line.id));
                properties.insert("length_m".to_string(), json!(line.length()));
                feature(
                    Some(&line.id),
                    Value::from(&display.apply(&line.geometry)),
                    properties,
                )
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::buffer::{build_buffer, DEFAULT_QUADRANT_SEGMENTS};
    use crate::coverage::classify::classify;
    use crate::coverage::stats::aggregate;
    use approx::assert_abs_diff_eq;

    fn to_wgs84() -> Reprojection {
        Reprojection::new(Crs::QuebecLambert, Crs::Wgs84)
    }

    #[test]
    fn test_empty_layers_are_empty_collections() {
        let stop_buffer = CoverageIndex::build(MultiPolygon::new(vec![]));
        let classification = classify(&[], &stop_buffer, None);
        let stats = aggregate(&classification, &[], &stop_buffer, None, None, false);

        let response = assemble(
            Assembly {
                stop_buffer: &stop_buffer,
                line_buffer: None,
                classification: &classification,
                stats,
                missing_datasets: vec![MissingDataset::Addresses],
            },
            &to_wgs84(),
        );

        let body = serde_json::to_value(&response).unwrap();
        for key in ["stop_buffer", "served_by_stop", "unserved"] {
            assert_eq!(body[key]["type"], "FeatureCollection", "{key}");
            assert_eq!(body[key]["features"].as_array().unwrap().len(), 0, "{key}");
        }
        assert!(body.get("near_line_only").is_none());
        assert!(body.get("line_buffer").is_none());
        assert_eq!(body["missing_datasets"], json!(["addresses"]));
        assert_eq!(body["display_crs"], "EPSG:4326");
    }

    #[test]
    fn test_geometries_are_converted_at_the_boundary() {
        let stops = vec![StopFeature::new("s1", 0.0, 0.0)];
        let points = stops.iter().map(|s| s.location);
        let stop_buffer =
            CoverageIndex::build(build_buffer(points, 500.0, DEFAULT_QUADRANT_SEGMENTS).unwrap());
        let addresses = vec![
            AddressFeature::new("a1", 100.0, 0.0).with_population(4),
            AddressFeature::new("a2", 600.0, 0.0),
        ];
        let classification = classify(&addresses, &stop_buffer, None);
        let stats = aggregate(&classification, &stops, &stop_buffer, None, None, true);
        let metric_area = stop_buffer.area();

        let response = assemble(
            Assembly {
                stop_buffer: &stop_buffer,
                line_buffer: None,
                classification: &classification,
                stats,
                missing_datasets: vec![],
            },
            &to_wgs84(),
        );

        assert_eq!(response.stats.buffer_area_m2, metric_area);
        let buffer_feature = &response.stop_buffer.features[0];
        let area_property = buffer_feature.property("area_m2").and_then(|v| v.as_f64());
        assert_eq!(area_property, Some(metric_area));

        let served = &response.served_by_stop.features[0];
        assert_eq!(served.property("category"), Some(&json!("served_by_stop")));
        assert_eq!(served.property("population"), Some(&json!(4)));
        let Some(Geometry { value: Value::Point(coords), .. }) = &served.geometry else {
            panic!("expected a point geometry");
        };
        // Projection origin of EPSG:32198 is (-68.5, 44.0); 100 m east is a tiny shift
        assert_abs_diff_eq!(coords[0], -68.5, epsilon = 0.01);
        assert_abs_diff_eq!(coords[1], 44.0, epsilon = 0.01);

        assert_eq!(response.heat_points.len(), 1);
        assert_abs_diff_eq!(response.heat_points[0][0], 44.0, epsilon = 0.01);
        assert_abs_diff_eq!(response.heat_points[0][1], -68.5, epsilon = 0.01);
    }

    #[test]
    fn test_heat_points_are_degrees_in_any_display_frame() {
        let stops = vec![StopFeature::new("s1", 0.0, 0.0)];
        let stop_buffer = CoverageIndex::build(
            build_buffer(stops.iter().map(|s| s.location), 300.0, DEFAULT_QUADRANT_SEGMENTS).unwrap(),
        );
        let addresses = vec![AddressFeature::new("far", 800.0, 0.0)];
        let classification = classify(&addresses, &stop_buffer, None);
        let stats = aggregate(&classification, &stops, &stop_buffer, None, None, false);

        let mercator = Reprojection::new(Crs::QuebecLambert, Crs::WebMercator);
        let response = assemble(
            Assembly {
                stop_buffer: &stop_buffer,
                line_buffer: None,
                classification: &classification,
                stats,
                missing_datasets: vec![],
            },
            &mercator,
        );

        assert_eq!(response.display_crs, Crs::WebMercator);
        // Unserved layer is in metres, heat points stay in degrees
        let Some(Geometry { value: Value::Point(coords), .. }) = &response.unserved.features[0].geometry
        else {
            panic!("expected a point geometry");
        };
        assert!(coords[0].abs() > 1_000_000.0);
        assert_abs_diff_eq!(response.heat_points[0][0], 44.0, epsilon = 0.01);
        assert_abs_diff_eq!(response.heat_points[0][1], -68.49, epsilon = 0.01);
    }

    #[test]
    fn test_lines_layer_keeps_metric_length() {
        use geo::{line_string, MultiLineString};
        let lines = vec![LineFeature::new(
            "80",
            MultiLineString::new(vec![line_string![(x: 0.0, y: 0.0), (x: 0.0, y: 250.0)]]),
        )];
        let layer = lines_layer(&lines, &to_wgs84());
        assert_eq!(layer.features.len(), 1);
        assert_eq!(layer.features[0].property("length_m"), Some(&json!(250.0)));
        assert_eq!(
            layer.features[0].id,
            Some(Id::String("80".to_string()))
        );
    }
}
