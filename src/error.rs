//! # Error Types
//!
//! Every fallible operation in the library returns [`AnhaResult`]. The grid and
//! selection variants carry enough context (axis, field, requested values) for a
//! caller to build a corrected request without looking at internals.

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Axis of a selection request or of the grid itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Latitude,
    Longitude,
    Depth,
    Row,
    Column,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
            Axis::Depth => "depth",
            Axis::Row => "row",
            Axis::Column => "column",
        };
        f.write_str(name)
    }
}

/// Errors raised while loading grids, resolving selections or reading files.
#[derive(Error, Debug)]
pub enum AnhaError {
    #[error("Shape mismatch for {field}: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        field: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },

    #[error("Depth levels are not strictly increasing at index {index}: {previous} followed by {value}")]
    NonMonotonicDepth {
        index: usize,
        previous: f64,
        value: f64,
    },

    #[error("Point ({lat}, {lon}) is outside the grid: nearest cell is {distance:.3} deg away (max {max_distance})")]
    OutOfDomain {
        lat: f64,
        lon: f64,
        distance: f64,
        max_distance: f64,
    },

    #[error("Empty selection on {axis} axis: {reason}")]
    EmptySelection { axis: Axis, reason: String },

    #[error("Variable '{variable}' does not match the grid along '{dimension}': expected {expected}, found {found}")]
    VariableShapeMismatch {
        variable: String,
        dimension: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid {axis} range: min {min} / max {max}")]
    InvalidRange { axis: Axis, min: f64, max: f64 },

    #[error("Variable '{0}' not found")]
    MissingVariable(String),

    #[error("Variable '{0}' has no valid values in the selection")]
    NoValidValues(String),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),

    #[error("Invalid run name '{0}', expected something like 'ANHA4-WJM004'")]
    InvalidRunName(String),

    #[error("Cannot parse date from filename '{0}'")]
    InvalidFilename(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for all library operations
pub type AnhaResult<T> = Result<T, AnhaError>;

impl AnhaError {
    pub(crate) fn empty(axis: Axis, reason: impl Into<String>) -> Self {
        AnhaError::EmptySelection {
            axis,
            reason: reason.into(),
        }
    }

    /// The axis this error is about, when there is one.
    pub fn axis(&self) -> Option<Axis> {
        match self {
            AnhaError::EmptySelection { axis, .. } | AnhaError::InvalidRange { axis, .. } => {
                Some(*axis)
            }
            AnhaError::NonMonotonicDepth { .. } => Some(Axis::Depth),
            _ => None,
        }
    }
}
