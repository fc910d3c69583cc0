//! GeoJSON file-backed geometry store.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use geo::{Geometry, MultiLineString, Point};
use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, GeoJson};
use hashbrown::HashSet;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use super::{Datasets, GeometrySource};
use crate::config::DatasetConfig;
use crate::coverage::CoverageError;
use crate::models::{AddressFeature, AddressSet, Crs, LineFeature, StopFeature};
use crate::reproject::Reprojection;

/// Datasets read from GeoJSON files once, then served from memory.
///
/// Files are converted from `input_crs` into the metric `analysis_crs` at
/// load time. [`GeoJsonFileSource::reload`] swaps the snapshot only when the
/// new read succeeds.
pub struct GeoJsonFileSource {
    config: DatasetConfig,
    datasets: Datasets,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub path: String,
    pub features: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceSummary {
    pub crs: Crs,
    pub stops: DatasetSummary,
    pub lines: Option<DatasetSummary>,
    pub addresses: Option<DatasetSummary>,
    pub has_population: bool,
}

impl GeoJsonFileSource {
    pub fn load(config: DatasetConfig) -> Result<Self, CoverageError> {
        let datasets = load_datasets(&config)?;
        Ok(Self { config, datasets })
    }

    pub fn reload(&mut self) -> Result<(), CoverageError> {
        info!("Reloading datasets");
        self.datasets = load_datasets(&self.config)?;
        Ok(())
    }

    pub fn snapshot(&self) -> &Datasets {
        &self.datasets
    }

    pub fn summary(&self) -> SourceSummary {
        let describe = |path: &Path, features: usize| DatasetSummary {
            path: path.display().to_string(),
            features,
        };

        SourceSummary {
            crs: self.datasets.crs,
            stops: describe(&self.config.stops, self.datasets.stops.len()),
            lines: self
                .config
                .lines
                .as_deref()
                .zip(self.datasets.lines.as_ref())
                .map(|(path, lines)| describe(path, lines.len())),
            addresses: self
                .config
                .addresses
                .as_deref()
                .zip(self.datasets.addresses.as_ref())
                .map(|(path, addresses)| describe(path, addresses.len())),
            has_population: self
                .datasets
                .addresses
                .as_ref()
                .is_some_and(|a| a.has_population),
        }
    }
}

impl GeometrySource for GeoJsonFileSource {
    fn datasets(&self) -> Result<Cow<'_, Datasets>, CoverageError> {
        Ok(Cow::Borrowed(&self.datasets))
    }
}

fn load_datasets(config: &DatasetConfig) -> Result<Datasets, CoverageError> {
    if !config.analysis_crs.is_metric() {
        return Err(CoverageError::NonMetricFrame(config.analysis_crs));
    }
    let to_analysis = Reprojection::new(config.input_crs, config.analysis_crs);

    info!(
        "Loading datasets ({} -> {})",
        config.input_crs, config.analysis_crs
    );

    let stops = read_stops(&config.stops, config, &to_analysis)?;
    info!("Loaded {} stops from {}", stops.len(), config.stops.display());

    let lines = match &config.lines {
        Some(path) => {
            let lines = read_lines(path, config, &to_analysis)?;
            info!("Loaded {} lines from {}", lines.len(), path.display());
            Some(lines)
        }
        None => {
            warn!("No line dataset configured; line metrics will be absent");
            None
        }
    };

    let addresses = match &config.addresses {
        Some(path) => {
            let addresses = read_addresses(path, config, &to_analysis)?;
            info!(
                "Loaded {} addresses from {} (population: {})",
                addresses.len(),
                path.display(),
                addresses.has_population
            );
            Some(addresses)
        }
        None => {
            warn!("No address dataset configured; coverage counts will be zero");
            None
        }
    };

    Ok(Datasets {
        crs: config.analysis_crs,
        stops,
        lines,
        addresses,
    })
}

fn read_collection(path: &Path, dataset: &str) -> Result<FeatureCollection, CoverageError> {
    let content = fs::read_to_string(path).map_err(|source| CoverageError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let geojson: GeoJson = content
        .parse()
        .map_err(|e: geojson::Error| CoverageError::malformed(dataset, e.to_string()))?;

    match geojson {
        GeoJson::FeatureCollection(collection) => Ok(collection),
        GeoJson::Feature(feature) => Ok(FeatureCollection {
            bbox: None,
            features: vec![feature],
            foreign_members: None,
        }),
        GeoJson::Geometry(_) => Err(CoverageError::malformed(
            dataset,
            "expected a FeatureCollection, found a bare geometry",
        )),
    }
}

/// Iterate over features with geometry, paired with their resolved identifier
fn features_with_geometry<'a>(
    collection: &'a FeatureCollection,
    dataset: &'a str,
    id_property: &'a str,
) -> impl Iterator<Item = Result<(String, &'a Feature, Geometry<f64>), CoverageError>> + 'a {
    collection
        .features
        .iter()
        .enumerate()
        .filter_map(move |(index, feature)| {
            let id = feature_id(feature, id_property, dataset, index);
            let Some(geometry) = feature.geometry.clone() else {
                warn!("Skipping {} feature {} without geometry", dataset, id);
                return None;
            };
            Some(
                Geometry::<f64>::try_from(geometry)
                    .map(|g| (id.clone(), feature, g))
                    .map_err(|e| CoverageError::malformed(dataset, format!("feature {id}: {e}"))),
            )
        })
}

fn feature_id(feature: &Feature, id_property: &str, dataset: &str, index: usize) -> String {
    match &feature.id {
        Some(Id::String(s)) => s.clone(),
        Some(Id::Number(n)) => n.to_string(),
        None => match feature.property(id_property) {
            Some(JsonValue::String(s)) => s.clone(),
            Some(JsonValue::Null) | None => format!("{dataset}/{index}"),
            Some(other) => other.to_string(),
        },
    }
}

fn warn_on_duplicates<'a>(dataset: &str, ids: impl Iterator<Item = &'a str>) {
    let mut seen = HashSet::new();
    let duplicates = ids.filter(|id| !seen.insert(*id)).count();
    if duplicates > 0 {
        warn!("{} dataset has {} duplicate identifiers", dataset, duplicates);
    }
}

fn read_stops(
    path: &Path,
    config: &DatasetConfig,
    to_analysis: &Reprojection,
) -> Result<Vec<StopFeature>, CoverageError> {
    const DATASET: &str = "stops";
    let collection = read_collection(path, DATASET)?;
    let mut stops = Vec::with_capacity(collection.features.len());

    for item in features_with_geometry(&collection, DATASET, &config.id_property) {
        let (id, _, geometry) = item?;
        match geometry {
            Geometry::Point(p) => stops.push(StopFeature {
                id,
                location: to_analysis.apply(&p),
            }),
            Geometry::MultiPoint(mp) if mp.0.len() == 1 => stops.push(StopFeature {
                id,
                location: to_analysis.apply(&mp.0[0]),
            }),
            Geometry::MultiPoint(mp) => {
                for (i, p) in mp.iter().enumerate() {
                    stops.push(StopFeature {
                        id: format!("{id}#{i}"),
                        location: to_analysis.apply(p),
                    });
                }
            }
            other => {
                return Err(CoverageError::malformed(
                    DATASET,
                    format!("feature {id}: expected a point, found {}", geometry_name(&other)),
                ))
            }
        }
    }

    warn_on_duplicates(DATASET, stops.iter().map(|s| s.id.as_str()));
    Ok(stops)
}

fn read_lines(
    path: &Path,
    config: &DatasetConfig,
    to_analysis: &Reprojection,
) -> Result<Vec<LineFeature>, CoverageError> {
    const DATASET: &str = "lines";
    let collection = read_collection(path, DATASET)?;
    let mut lines = Vec::with_capacity(collection.features.len());

    for item in features_with_geometry(&collection, DATASET, &config.id_property) {
        let (id, _, geometry) = item?;
        let geometry = match geometry {
            Geometry::LineString(ls) => MultiLineString::new(vec![ls]),
            Geometry::MultiLineString(mls) => mls,
            other => {
                return Err(CoverageError::malformed(
                    DATASET,
                    format!("feature {id}: expected a line, found {}", geometry_name(&other)),
                ))
            }
        };
        lines.push(LineFeature {
            id,
            geometry: to_analysis.apply(&geometry),
        });
    }

    warn_on_duplicates(DATASET, lines.iter().map(|l| l.id.as_str()));
    Ok(lines)
}

fn read_addresses(
    path: &Path,
    config: &DatasetConfig,
    to_analysis: &Reprojection,
) -> Result<AddressSet, CoverageError> {
    const DATASET: &str = "addresses";
    let collection = read_collection(path, DATASET)?;
    let mut features = Vec::with_capacity(collection.features.len());

    for item in features_with_geometry(&collection, DATASET, &config.id_property) {
        let (id, feature, geometry) = item?;
        let location: Point<f64> = match geometry {
            Geometry::Point(p) => p,
            Geometry::MultiPoint(mp) if mp.0.len() == 1 => mp.0[0],
            other => {
                return Err(CoverageError::malformed(
                    DATASET,
                    format!("feature {id}: expected a point, found {}", geometry_name(&other)),
                ))
            }
        };

        features.push(AddressFeature {
            id,
            location: to_analysis.apply(&location),
            population: parse_population(feature.property(&config.population_property)),
        });
    }

    warn_on_duplicates(DATASET, features.iter().map(|a| a.id.as_str()));
    Ok(AddressSet::new(features))
}

/// Non-negative number, or a string holding one. Anything else is unknown.
fn parse_population(value: Option<&JsonValue>) -> Option<u64> {
    let n = match value? {
        JsonValue::Number(n) => n.as_f64()?,
        JsonValue::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    (n.is_finite() && n >= 0.0).then(|| n.round() as u64)
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
