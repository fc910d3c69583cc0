//! Coordinate reference identifiers understood by the engine.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// A coordinate reference system, identified by its EPSG code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Crs {
    /// WGS84 longitude/latitude in degrees (EPSG:4326)
    Wgs84,
    /// Spherical Web Mercator in meters (EPSG:3857)
    WebMercator,
    /// NAD83 / Québec Lambert in meters (EPSG:32198)
    QuebecLambert,
}

impl Crs {
    pub fn epsg(&self) -> u32 {
        match self {
            Crs::Wgs84 => 4326,
            Crs::WebMercator => 3857,
            Crs::QuebecLambert => 32198,
        }
    }

    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(Crs::Wgs84),
            3857 | 900913 => Some(Crs::WebMercator),
            32198 => Some(Crs::QuebecLambert),
            _ => None,
        }
    }

    /// Whether distances and areas in this frame are expressed in meters.
    ///
    /// Buffering and area computation are only meaningful in a metric frame.
    pub fn is_metric(&self) -> bool {
        !matches!(self, Crs::Wgs84)
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported coordinate reference '{0}' (expected EPSG:4326, EPSG:3857 or EPSG:32198)")]
pub struct UnknownCrs(pub String);

impl FromStr for Crs {
    type Err = UnknownCrs;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let code = match trimmed.get(..5) {
            Some(prefix) if prefix.eq_ignore_ascii_case("epsg:") => &trimmed[5..],
            _ => trimmed,
        };

        code.parse::<u32>()
            .ok()
            .and_then(Crs::from_epsg)
            .ok_or_else(|| UnknownCrs(s.to_string()))
    }
}

impl TryFrom<String> for Crs {
    type Error = UnknownCrs;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Crs> for String {
    fn from(crs: Crs) -> Self {
        crs.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_prefixed_and_bare() {
        assert_eq!("EPSG:32198".parse::<Crs>(), Ok(Crs::QuebecLambert));
        assert_eq!("epsg:3857".parse::<Crs>(), Ok(Crs::WebMercator));
        assert_eq!(" 4326 ".parse::<Crs>(), Ok(Crs::Wgs84));
    }

    #[test]
    fn test_parse_unknown() {
        assert!("EPSG:2950".parse::<Crs>().is_err());
        assert!("mtm".parse::<Crs>().is_err());
        assert!("".parse::<Crs>().is_err());
    }

    #[test]
    fn test_metric_frames() {
        assert!(!Crs::Wgs84.is_metric());
        assert!(Crs::WebMercator.is_metric());
        assert!(Crs::QuebecLambert.is_metric());
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&Crs::QuebecLambert).unwrap();
        assert_eq!(json, "\"EPSG:32198\"");
        let back: Crs = serde_json::from_str("\"EPSG:3857\"").unwrap();
        assert_eq!(back, Crs::WebMercator);
    }
}
