//! Failure and degraded-mode outcomes of a coverage computation.

use serde::Serialize;

use crate::models::Crs;

/// Broad class of a failed computation, as reported to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidParameter,
    GeometrySourceFailure,
}

/// A computation that failed as a whole. Nothing partial is returned.
#[derive(Debug, thiserror::Error)]
pub enum CoverageError {
    #[error("{name} must be a finite number >= 0, got {value}")]
    InvalidRadius { name: &'static str, value: f64 },

    #[error("{name} must be a number, got {value}")]
    NotANumber { name: &'static str, value: String },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("quadrant_segments must be at least 1")]
    InvalidSegments,

    #[error("geometry source frame {0} is not metric; refusing to buffer in degrees")]
    NonMetricFrame(Crs),

    #[error("geometry source unavailable: {0}")]
    Source(String),

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed dataset {dataset}: {reason}")]
    Malformed { dataset: String, reason: String },
}

impl CoverageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoverageError::InvalidRadius { .. }
            | CoverageError::NotANumber { .. }
            | CoverageError::InvalidBody(_)
            | CoverageError::InvalidSegments => ErrorKind::InvalidParameter,
            CoverageError::NonMetricFrame(_)
            | CoverageError::Source(_)
            | CoverageError::Io { .. }
            | CoverageError::Malformed { .. } => ErrorKind::GeometrySourceFailure,
        }
    }

    pub fn malformed(dataset: &str, reason: impl Into<String>) -> Self {
        CoverageError::Malformed {
            dataset: dataset.to_string(),
            reason: reason.into(),
        }
    }

    /// Serializable `{kind, message}` body
    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

/// An optional dataset that was unavailable. The result is still valid;
/// the fields derived from it are absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingDataset {
    Lines,
    Addresses,
    Population,
}

/// Reject negative, NaN and infinite radii. No clamping.
pub fn validate_radius(name: &'static str, value: f64) -> Result<f64, CoverageError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(CoverageError::InvalidRadius { name, value })
    }
}

/// Radius from a loosely typed request value: a number or a numeric string.
pub fn radius_from_json(name: &'static str, value: &serde_json::Value) -> Result<f64, CoverageError> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(r) => validate_radius(name, r),
        None => Err(CoverageError::NotANumber {
            name,
            value: value.to_string(),
        }),
    }
}
