use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coverage::{validate_radius, EngineOptions, DEFAULT_QUADRANT_SEGMENTS};
use crate::models::Crs;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    pub datasets: DatasetConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    #[serde(default = "default_display_crs")]
    pub display_crs: Crs,
    #[serde(default = "default_radius")]
    pub default_radius_m: f64,
    #[serde(default)]
    pub default_line_radius_m: Option<f64>,
    #[serde(default = "default_quadrant_segments")]
    pub quadrant_segments: usize,
}

/// Explicitly named input datasets. Nothing is discovered by filename.
#[derive(Debug, Deserialize, Clone)]
pub struct DatasetConfig {
    pub stops: PathBuf,
    #[serde(default)]
    pub lines: Option<PathBuf>,
    #[serde(default)]
    pub addresses: Option<PathBuf>,
    /// Frame the files are written in
    #[serde(default = "default_input_crs")]
    pub input_crs: Crs,
    /// Metric frame the analysis runs in
    #[serde(default = "default_analysis_crs")]
    pub analysis_crs: Crs,
    #[serde(default = "default_id_property")]
    pub id_property: String,
    #[serde(default = "default_population_property")]
    pub population_property: String,
}

fn default_listen() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_display_crs() -> Crs {
    Crs::Wgs84
}

fn default_radius() -> f64 {
    500.0
}

fn default_quadrant_segments() -> usize {
    DEFAULT_QUADRANT_SEGMENTS
}

fn default_input_crs() -> Crs {
    Crs::Wgs84
}

fn default_analysis_crs() -> Crs {
    Crs::QuebecLambert
}

fn default_id_property() -> String {
    "id".to_string()
}

fn default_population_property() -> String {
    "population".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            display_crs: default_display_crs(),
            default_radius_m: default_radius(),
            default_line_radius_m: None,
            quadrant_segments: default_quadrant_segments(),
        }
    }
}

impl DatasetConfig {
    /// Minimal configuration with only a stop file, other settings at their defaults
    pub fn new(stops: impl Into<PathBuf>) -> Self {
        Self {
            stops: stops.into(),
            lines: None,
            addresses: None,
            input_crs: default_input_crs(),
            analysis_crs: default_analysis_crs(),
            id_property: default_id_property(),
            population_property: default_population_property(),
        }
    }

    /// Anchor relative dataset paths at `base`
    fn resolve_relative_to(&mut self, base: &Path) {
        let anchor = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        anchor(&mut self.stops);
        if let Some(lines) = self.lines.as_mut() {
            anchor(lines);
        }
        if let Some(addresses) = self.addresses.as_mut() {
            anchor(addresses);
        }
    }
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).context("Failed to read config file")?;
        let mut config = Self::from_toml_str(&content)?;

        if let Some(base) = path.parent() {
            config.datasets.resolve_relative_to(base);
        }

        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.datasets.analysis_crs.is_metric() {
            anyhow::bail!(
                "analysis_crs must be a metric frame, got {}",
                self.datasets.analysis_crs
            );
        }
        if self.analysis.quadrant_segments == 0 {
            anyhow::bail!("quadrant_segments must be at least 1");
        }
        validate_radius("default_radius_m", self.analysis.default_radius_m)?;
        if let Some(r) = self.analysis.default_line_radius_m {
            validate_radius("default_line_radius_m", r)?;
        }
        Ok(())
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            display_crs: self.analysis.display_crs,
            quadrant_segments: self.analysis.quadrant_segments,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            [datasets]
            stops = "data/arrets.geojson"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:5000");
        assert_eq!(config.analysis.display_crs, Crs::Wgs84);
        assert_eq!(config.analysis.default_radius_m, 500.0);
        assert_eq!(config.analysis.default_line_radius_m, None);
        assert_eq!(config.analysis.quadrant_segments, 16);
        assert_eq!(config.datasets.input_crs, Crs::Wgs84);
        assert_eq!(config.datasets.analysis_crs, Crs::QuebecLambert);
        assert_eq!(config.datasets.population_property, "population");
        assert!(config.datasets.lines.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_toml_str(
            r#"
            [server]
            listen = "127.0.0.1:8080"

            [analysis]
            display_crs = "EPSG:4326"
            default_radius_m = 400
            default_line_radius_m = 200.0
            quadrant_segments = 8

            [datasets]
            stops = "stops.geojson"
            lines = "lignes_bus.geojson"
            addresses = "adresses.geojson"
            input_crs = "EPSG:3857"
            analysis_crs = "EPSG:3857"
            population_property = "POP"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.analysis.default_radius_m, 400.0);
        assert_eq!(config.analysis.default_line_radius_m, Some(200.0));
        assert_eq!(config.engine_options().quadrant_segments, 8);
        assert_eq!(config.datasets.analysis_crs, Crs::WebMercator);
        assert_eq!(config.datasets.population_property, "POP");
    }

    #[test]
    fn test_rejects_geographic_analysis_frame() {
        let err = Config::from_toml_str(
            r#"
            [datasets]
            stops = "stops.geojson"
            analysis_crs = "EPSG:4326"
            "#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("metric"));
    }

    #[test]
    fn test_rejects_bad_defaults() {
        assert!(Config::from_toml_str(
            r#"
            [analysis]
            default_radius_m = -50.0
            [datasets]
            stops = "stops.geojson"
            "#,
        )
        .is_err());

        assert!(Config::from_toml_str(
            r#"
            [analysis]
            quadrant_segments = 0
            [datasets]
            stops = "stops.geojson"
            "#,
        )
        .is_err());

        assert!(Config::from_toml_str(
            r#"
            [datasets]
            stops = "stops.geojson"
            input_crs = "EPSG:2950"
            "#,
        )
        .is_err());
    }

    #[test]
    fn test_relative_paths_anchor_at_config_dir() {
        let mut datasets = DatasetConfig::new("data/stops.geojson");
        datasets.addresses = Some(PathBuf::from("/abs/addresses.geojson"));
        datasets.resolve_relative_to(Path::new("/etc/desserte"));

        assert_eq!(datasets.stops, PathBuf::from("/etc/desserte/data/stops.geojson"));
        assert_eq!(datasets.addresses, Some(PathBuf::from("/abs/addresses.geojson")));
    }
}
