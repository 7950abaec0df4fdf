//! # Grid Index Store
//!
//! Holds the curvilinear coordinate fields of one model configuration: 2-D
//! latitude and longitude indexed by (row, col) and the 1-D depth levels. The
//! store is validated once at construction and never mutated afterwards, so it
//! is shared between datasets and views behind an `Arc`.

use crate::error::{AnhaError, AnhaResult, Axis};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Names of the grid axes and coordinate variables inside model files.
///
/// Defaults follow the ANHA T-grid output convention. Each coordinate has an
/// ordered list of candidates; the first one present in a file wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridDims {
    pub row_dim: String,
    pub col_dim: String,
    pub depth_dims: Vec<String>,
    pub latitude_vars: Vec<String>,
    pub longitude_vars: Vec<String>,
    pub depth_vars: Vec<String>,
}

impl Default for GridDims {
    fn default() -> Self {
        GridDims {
            row_dim: "y".to_string(),
            col_dim: "x".to_string(),
            depth_dims: vec!["deptht".to_string(), "z".to_string(), "depth".to_string()],
            latitude_vars: vec!["nav_lat_grid_T".to_string(), "nav_lat".to_string()],
            longitude_vars: vec!["nav_lon_grid_T".to_string(), "nav_lon".to_string()],
            depth_vars: vec![
                "deptht".to_string(),
                "gdept_1d".to_string(),
                "depth".to_string(),
            ],
        }
    }
}

impl GridDims {
    pub fn is_depth_dim(&self, name: &str) -> bool {
        self.depth_dims.iter().any(|d| d == name)
    }

    /// True for names that hold coordinates rather than data.
    pub fn is_coordinate(&self, name: &str) -> bool {
        self.latitude_vars.iter().any(|v| v == name)
            || self.longitude_vars.iter().any(|v| v == name)
            || self.depth_vars.iter().any(|v| v == name)
    }
}

/// Normalises a longitude in degrees east to [-180, 180).
pub fn normalize_longitude(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Immutable curvilinear coordinate fields for one model configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIndexStore {
    latitude: Array2<f64>,
    longitude: Array2<f64>,
    depth: Array1<f64>,
}

impl GridIndexStore {
    /// Validates and stores the coordinate fields.
    ///
    /// Longitudes are normalised to [-180, 180). Fails with
    /// [`AnhaError::ShapeMismatch`] when latitude and longitude differ in shape
    /// and with [`AnhaError::NonMonotonicDepth`] when depth is not strictly
    /// increasing.
    pub fn load(
        latitude: Array2<f64>,
        longitude: Array2<f64>,
        depth: Array1<f64>,
    ) -> AnhaResult<Self> {
        if latitude.dim() != longitude.dim() {
            return Err(AnhaError::ShapeMismatch {
                field: "longitude".to_string(),
                expected: latitude.shape().to_vec(),
                found: longitude.shape().to_vec(),
            });
        }
        if latitude.is_empty() {
            return Err(AnhaError::empty(Axis::Row, "grid has no cells"));
        }

        for index in 1..depth.len() {
            let (previous, value) = (depth[index - 1], depth[index]);
            // NaN fails this comparison too
            if !(value > previous) {
                return Err(AnhaError::NonMonotonicDepth {
                    index,
                    previous,
                    value,
                });
            }
        }

        Ok(GridIndexStore {
            latitude,
            longitude: longitude.mapv(normalize_longitude),
            depth,
        })
    }

    pub fn latitude(&self) -> &Array2<f64> {
        &self.latitude
    }

    pub fn longitude(&self) -> &Array2<f64> {
        &self.longitude
    }

    pub fn depth(&self) -> &Array1<f64> {
        &self.depth
    }

    /// (rows, cols) of the horizontal grid.
    pub fn shape(&self) -> (usize, usize) {
        self.latitude.dim()
    }

    pub fn rows(&self) -> usize {
        self.latitude.nrows()
    }

    pub fn cols(&self) -> usize {
        self.latitude.ncols()
    }

    pub fn depth_levels(&self) -> usize {
        self.depth.len()
    }

    /// Coordinates of one cell as (lat, lon).
    pub fn coordinate(&self, row: usize, col: usize) -> (f64, f64) {
        (self.latitude[[row, col]], self.longitude[[row, col]])
    }

    /// Finite (min, max) latitude over the whole grid.
    pub fn latitude_extent(&self) -> (f64, f64) {
        finite_extent(self.latitude.iter())
    }

    /// Finite (min, max) longitude over the whole grid.
    pub fn longitude_extent(&self) -> (f64, f64) {
        finite_extent(self.longitude.iter())
    }
}

fn finite_extent<'a>(values: impl Iterator<Item = &'a f64>) -> (f64, f64) {
    values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        })
}
