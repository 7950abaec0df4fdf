//! # Nearest-Point Resolution
//!
//! Maps a geographic coordinate to the grid cell whose (lat, lon) is closest.
//! On a curvilinear grid there is no closed form for this, so resolution is a
//! geometric search. The search sits behind the [`PointResolver`] trait so a
//! spatial index can replace the linear scan without touching range resolution.

use crate::error::{AnhaError, AnhaResult};
use crate::grid::GridIndexStore;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default maximum plausible distance (degrees) between a target and its
/// nearest cell.
pub const DEFAULT_MAX_DISTANCE: f64 = 1.0;

/// A resolved grid cell together with its distance from the target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    pub row: usize,
    pub col: usize,
    /// Planar distance in degrees
    pub distance: f64,
}

impl GridPoint {
    pub fn index(&self) -> (usize, usize) {
        (self.row, self.col)
    }
}

/// Search strategy for nearest-point resolution.
pub trait PointResolver: fmt::Debug + Send + Sync {
    /// Nearest cell to (`lat`, `lon`) with no distance limit, or `None` when
    /// the grid has no finite coordinates.
    fn nearest(&self, store: &GridIndexStore, lat: f64, lon: f64) -> Option<GridPoint>;

    /// Largest accepted distance, in degrees.
    fn max_distance(&self) -> f64;

    /// Nearest cell to (`lat`, `lon`), failing with [`AnhaError::OutOfDomain`]
    /// when it lies further than [`PointResolver::max_distance`].
    fn resolve_point(&self, store: &GridIndexStore, lat: f64, lon: f64) -> AnhaResult<GridPoint> {
        let max_distance = self.max_distance();
        match self.nearest(store, lat, lon) {
            Some(point) if point.distance <= max_distance => {
                debug!(
                    "Resolved ({}, {}) to cell ({}, {}) at {:.4} deg",
                    lat, lon, point.row, point.col, point.distance
                );
                Ok(point)
            }
            other => Err(AnhaError::OutOfDomain {
                lat,
                lon,
                distance: other.map_or(f64::INFINITY, |p| p.distance),
                max_distance,
            }),
        }
    }
}

/// Normalises a longitude difference to (-180, 180].
///
/// A difference near ±360 degrees is therefore treated as near zero.
pub fn wrap_longitude_delta(delta: f64) -> f64 {
    let wrapped = delta.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

/// Squared planar distance in degrees with longitude wrap-around.
pub fn squared_distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> f64 {
    let dlat = lat_a - lat_b;
    let dlon = wrap_longitude_delta(lon_a - lon_b);
    dlat * dlat + dlon * dlon
}

/// Full O(rows x cols) scan of the grid.
///
/// Ties go to the smallest (row, col) index: cells are visited row-major and a
/// candidate only replaces the current best when strictly closer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearScanResolver {
    pub max_distance: f64,
}

impl Default for LinearScanResolver {
    fn default() -> Self {
        LinearScanResolver {
            max_distance: DEFAULT_MAX_DISTANCE,
        }
    }
}

impl LinearScanResolver {
    pub fn new(max_distance: f64) -> Self {
        LinearScanResolver { max_distance }
    }
}

impl PointResolver for LinearScanResolver {
    fn nearest(&self, store: &GridIndexStore, lat: f64, lon: f64) -> Option<GridPoint> {
        let mut best: Option<(usize, usize, f64)> = None;

        for ((row, col), &cell_lat) in store.latitude().indexed_iter() {
            let cell_lon = store.longitude()[[row, col]];
            let d2 = squared_distance(cell_lat, cell_lon, lat, lon);
            if d2.is_nan() {
                continue;
            }
            match best {
                Some((_, _, best_d2)) if d2 >= best_d2 => {}
                _ => best = Some((row, col, d2)),
            }
        }

        best.map(|(row, col, d2)| GridPoint {
            row,
            col,
            distance: d2.sqrt(),
        })
    }

    fn max_distance(&self) -> f64 {
        self.max_distance
    }
}
