//! # Range Resolution
//!
//! Turns a geographic bounding box and a depth interval into contiguous index
//! ranges on the model grid.
//!
//! The four corners of the box are resolved independently through a
//! [`PointResolver`]; the row and column ranges are the smallest index-space
//! rectangle enclosing them. On a curvilinear grid that rectangle always
//! contains the requested box and may carry a thin margin of cells just outside
//! it. Near a grid fold the corners may not form a rectangle at all; that case
//! is flagged in [`BoxResolution::fold_suspect`], never corrected.

use crate::error::{AnhaError, AnhaResult, Axis};
use crate::grid::{normalize_longitude, GridIndexStore};
use crate::resolver::{GridPoint, PointResolver};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive index interval along one grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AxisRange {
    pub start: usize,
    pub end: usize,
}

impl AxisRange {
    pub fn new(start: usize, end: usize, axis: Axis) -> AnhaResult<Self> {
        if start > end {
            return Err(AnhaError::empty(
                axis,
                format!("start index {} is past end index {}", start, end),
            ));
        }
        Ok(AxisRange { start, end })
    }

    /// The whole axis, or `None` for an axis of length zero.
    pub fn full(len: usize) -> Option<Self> {
        len.checked_sub(1).map(|end| AxisRange { start: 0, end })
    }

    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always false: a range holds at least one index.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, index: usize) -> bool {
        self.start <= index && index <= self.end
    }

    pub fn intersect(&self, other: &AxisRange) -> Option<AxisRange> {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        (start <= end).then_some(AxisRange { start, end })
    }

    /// This range expressed relative to `parent`, which must contain it.
    pub fn relative_to(&self, parent: &AxisRange) -> AxisRange {
        AxisRange {
            start: self.start - parent.start,
            end: self.end - parent.start,
        }
    }
}

impl fmt::Display for AxisRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// Depth part of an [`IndexRange`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DepthSelection {
    /// Every level of the depth axis
    Full,
    Levels(AxisRange),
}

impl DepthSelection {
    /// Concrete levels on an axis of `levels` entries.
    pub fn resolve(&self, levels: usize) -> Option<AxisRange> {
        match self {
            DepthSelection::Full => AxisRange::full(levels),
            DepthSelection::Levels(range) => Some(*range),
        }
    }
}

/// Index bounds of a selection on the original, full grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRange {
    pub row_range: AxisRange,
    pub col_range: AxisRange,
    pub depth_range: DepthSelection,
}

impl IndexRange {
    /// The whole grid.
    pub fn full(store: &GridIndexStore) -> Self {
        let (rows, cols) = store.shape();
        IndexRange {
            row_range: AxisRange { start: 0, end: rows - 1 },
            col_range: AxisRange { start: 0, end: cols - 1 },
            depth_range: DepthSelection::Full,
        }
    }

    /// (rows, cols) covered by this range.
    pub fn spatial_shape(&self) -> (usize, usize) {
        (self.row_range.len(), self.col_range.len())
    }

    /// Overlap of two ranges on the same grid.
    ///
    /// Narrowing a selection is the intersection of what was already selected
    /// with what the new request resolves to on the full grid.
    pub fn intersect(&self, other: &IndexRange) -> AnhaResult<IndexRange> {
        let row_range = self
            .row_range
            .intersect(&other.row_range)
            .ok_or_else(|| AnhaError::empty(Axis::Row, "no overlap with current selection"))?;
        let col_range = self
            .col_range
            .intersect(&other.col_range)
            .ok_or_else(|| AnhaError::empty(Axis::Column, "no overlap with current selection"))?;
        let depth_range = match (self.depth_range, other.depth_range) {
            (DepthSelection::Full, d) | (d, DepthSelection::Full) => d,
            (DepthSelection::Levels(a), DepthSelection::Levels(b)) => DepthSelection::Levels(
                a.intersect(&b)
                    .ok_or_else(|| AnhaError::empty(Axis::Depth, "no overlap with current selection"))?,
            ),
        };
        Ok(IndexRange {
            row_range,
            col_range,
            depth_range,
        })
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rows {}, cols {}", self.row_range, self.col_range)?;
        match self.depth_range {
            DepthSelection::Full => write!(f, ", depth all"),
            DepthSelection::Levels(range) => write!(f, ", depth {}", range),
        }
    }
}

/// Geographic selection: each range is `(min, max)` and `None` means the full
/// extent on that axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionRequest {
    #[serde(default)]
    pub lat_range: Option<(f64, f64)>,
    #[serde(default)]
    pub lon_range: Option<(f64, f64)>,
    #[serde(default)]
    pub depth_range: Option<(f64, f64)>,
}

impl SelectionRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lat(mut self, min: f64, max: f64) -> Self {
        self.lat_range = Some((min, max));
        self
    }

    pub fn lon(mut self, min: f64, max: f64) -> Self {
        self.lon_range = Some((min, max));
        self
    }

    pub fn depth(mut self, min: f64, max: f64) -> Self {
        self.depth_range = Some((min, max));
        self
    }

    pub fn is_horizontal_full(&self) -> bool {
        self.lat_range.is_none() && self.lon_range.is_none()
    }
}

/// Outcome of a box resolution, kept for diagnostics and plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxResolution {
    pub index_range: IndexRange,
    /// Resolved corners in the order (lat_min, lon_min), (lat_min, lon_max),
    /// (lat_max, lon_min), (lat_max, lon_max). `None` when no horizontal range
    /// was requested.
    pub corners: Option<[GridPoint; 4]>,
    /// Axes whose requested bounds were clamped to the grid's extent
    pub clamped: Vec<Axis>,
    /// Corners disagree on orientation, as happens across a grid fold
    pub fold_suspect: bool,
    /// The longitude range wraps across the grid's own longitude seam, so the
    /// column range spans the whole grid
    #[serde(default)]
    pub seam_crossing: bool,
}

/// Resolves a request to index ranges on the full grid.
pub fn resolve_box(
    store: &GridIndexStore,
    resolver: &dyn PointResolver,
    request: &SelectionRequest,
) -> AnhaResult<IndexRange> {
    resolve_box_detailed(store, resolver, request).map(|r| r.index_range)
}

/// Like [`resolve_box`], keeping the per-corner results.
pub fn resolve_box_detailed(
    store: &GridIndexStore,
    resolver: &dyn PointResolver,
    request: &SelectionRequest,
) -> AnhaResult<BoxResolution> {
    let full = IndexRange::full(store);
    let depth_range = resolve_depth(store, request.depth_range)?;

    if request.is_horizontal_full() {
        return Ok(BoxResolution {
            index_range: IndexRange { depth_range, ..full },
            corners: None,
            clamped: Vec::new(),
            fold_suspect: false,
            seam_crossing: false,
        });
    }

    let mut clamped = Vec::new();
    let mut seam_crossing = false;
    let max_distance = resolver.max_distance();
    let (lat_min, lat_max) = horizontal_bounds(
        store,
        request,
        Axis::Latitude,
        max_distance,
        &mut clamped,
        &mut seam_crossing,
    )?;
    let (lon_min, lon_max) = horizontal_bounds(
        store,
        request,
        Axis::Longitude,
        max_distance,
        &mut clamped,
        &mut seam_crossing,
    )?;

    let targets = [
        (lat_min, lon_min),
        (lat_min, lon_max),
        (lat_max, lon_min),
        (lat_max, lon_max),
    ];
    let mut corners = [GridPoint { row: 0, col: 0, distance: 0.0 }; 4];
    for (corner, &(lat, lon)) in corners.iter_mut().zip(targets.iter()) {
        // A bound pulled onto the grid's extent may sit off a curvilinear
        // grid's footprint, so only the distance of unclamped corners is checked.
        *corner = if clamped.is_empty() {
            resolver.resolve_point(store, lat, lon)?
        } else {
            resolver
                .nearest(store, lat, lon)
                .ok_or_else(|| AnhaError::empty(Axis::Row, "grid has no finite coordinates"))?
        };
    }

    let row_range = AxisRange {
        start: corners.iter().map(|c| c.row).min().unwrap_or(0),
        end: corners.iter().map(|c| c.row).max().unwrap_or(0),
    };
    let col_range = AxisRange {
        start: corners.iter().map(|c| c.col).min().unwrap_or(0),
        end: corners.iter().map(|c| c.col).max().unwrap_or(0),
    };

    let fold_suspect = corners_disagree(&corners);
    if fold_suspect {
        warn!(
            "Corners of lat [{}, {}] lon [{}, {}] do not form an index rectangle: {:?}",
            lat_min,
            lat_max,
            lon_min,
            lon_max,
            corners.map(|c| c.index())
        );
    }

    let index_range = IndexRange {
        row_range,
        col_range,
        depth_range,
    };
    debug!("Resolved box to {}", index_range);

    Ok(BoxResolution {
        index_range,
        corners: Some(corners),
        clamped,
        fold_suspect,
        seam_crossing,
    })
}

/// Requested (min, max) on a horizontal axis, validated and clamped to the
/// grid's extent. Fails with `OutOfDomain` when there is no overlap at all.
///
/// A longitude range that wraps the dateline after normalization is split into
/// its eastern `[min, 180)` and western `[-180, max]` parts. When only one part
/// overlaps the grid, that part is kept. When both do, the range straddles the
/// grid's longitude seam and the whole longitude extent is returned with
/// `seam_crossing` set.
fn horizontal_bounds(
    store: &GridIndexStore,
    request: &SelectionRequest,
    axis: Axis,
    max_distance: f64,
    clamped: &mut Vec<Axis>,
    seam_crossing: &mut bool,
) -> AnhaResult<(f64, f64)> {
    let (requested, extent) = match axis {
        Axis::Latitude => (request.lat_range, store.latitude_extent()),
        _ => (request.lon_range, store.longitude_extent()),
    };
    let Some((min, max)) = requested else {
        clamped.push(axis);
        return Ok(extent);
    };

    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(AnhaError::InvalidRange { axis, min, max });
    }

    let (min, max) = match axis {
        Axis::Longitude => {
            if max - min >= 360.0 {
                clamped.push(axis);
                return Ok(extent);
            }
            let (nmin, nmax) = (normalize_longitude(min), normalize_longitude(max));
            if nmin > nmax {
                return wrapped_longitude_bounds(
                    store,
                    request,
                    (nmin, nmax),
                    max_distance,
                    clamped,
                    seam_crossing,
                );
            }
            (nmin, nmax)
        }
        _ => (min, max),
    };

    let (lo, hi) = extent;
    if max < lo || min > hi {
        let nearest_bound = if min > hi { min } else { max };
        let (lat, lon) = match axis {
            Axis::Latitude => (nearest_bound, midpoint(request.lon_range, store.longitude_extent())),
            _ => (midpoint(request.lat_range, store.latitude_extent()), nearest_bound),
        };
        return Err(AnhaError::OutOfDomain {
            lat,
            lon,
            distance: if min > hi { min - hi } else { lo - max },
            max_distance,
        });
    }

    if min < lo || max > hi {
        clamped.push(axis);
    }
    Ok((min.max(lo), max.min(hi)))
}

/// Bounds for a normalized longitude range with `min > max`, which covers
/// `[min, 180)` and `[-180, max]`.
fn wrapped_longitude_bounds(
    store: &GridIndexStore,
    request: &SelectionRequest,
    (min, max): (f64, f64),
    max_distance: f64,
    clamped: &mut Vec<Axis>,
    seam_crossing: &mut bool,
) -> AnhaResult<(f64, f64)> {
    let extent = store.longitude_extent();
    let (lo, hi) = extent;
    let east = hi >= min;
    let west = lo <= max;

    match (east, west) {
        (false, false) => {
            let (distance, lon) = if min - hi <= lo - max {
                (min - hi, min)
            } else {
                (lo - max, max)
            };
            Err(AnhaError::OutOfDomain {
                lat: midpoint(request.lat_range, store.latitude_extent()),
                lon,
                distance,
                max_distance,
            })
        }
        (true, false) => {
            clamped.push(Axis::Longitude);
            Ok((min.max(lo), hi))
        }
        (false, true) => {
            clamped.push(Axis::Longitude);
            Ok((lo, max.min(hi)))
        }
        (true, true) => {
            warn!(
                "Longitude range [{}, {}] crosses the grid's longitude seam, selecting all columns",
                min, max
            );
            clamped.push(Axis::Longitude);
            *seam_crossing = true;
            Ok(extent)
        }
    }
}

fn midpoint(range: Option<(f64, f64)>, extent: (f64, f64)) -> f64 {
    let (lo, hi) = range.unwrap_or(extent);
    (lo + hi) / 2.0
}

/// Depth levels bracketing `depth_range`.
///
/// The start is the deepest level at or above `min` and the end the shallowest
/// level at or below `max`, each clamped onto the axis. A range with no overlap
/// with the axis is an `EmptySelection`.
pub fn resolve_depth(
    store: &GridIndexStore,
    depth_range: Option<(f64, f64)>,
) -> AnhaResult<DepthSelection> {
    let Some((min, max)) = depth_range else {
        return Ok(DepthSelection::Full);
    };
    if !min.is_finite() || !max.is_finite() || min > max {
        return Err(AnhaError::InvalidRange {
            axis: Axis::Depth,
            min,
            max,
        });
    }

    let depth = store.depth();
    let levels = depth.len();
    if levels == 0 {
        return Err(AnhaError::empty(Axis::Depth, "grid has no depth levels"));
    }
    let (top, bottom) = (depth[0], depth[levels - 1]);
    if min > bottom || max < top {
        return Err(AnhaError::empty(
            Axis::Depth,
            format!(
                "requested {} to {} m, axis covers {} to {} m",
                min, max, top, bottom
            ),
        ));
    }

    let start = depth.iter().rposition(|&d| d <= min).unwrap_or(0);
    let end = depth.iter().position(|&d| d >= max).unwrap_or(levels - 1);
    AxisRange::new(start, end, Axis::Depth).map(DepthSelection::Levels)
}

/// True when the corners do not agree on which way rows and columns run.
///
/// On a well-behaved patch, moving from `lat_min` to `lat_max` changes the row
/// in the same direction on both the western and eastern edge, and moving from
/// `lon_min` to `lon_max` changes the column in the same direction on both the
/// southern and northern edge.
fn corners_disagree(corners: &[GridPoint; 4]) -> bool {
    let [sw, se, nw, ne] = corners;
    let direction = |a: usize, b: usize| (b as i64 - a as i64).signum();
    let opposed = |x: i64, y: i64| x != 0 && y != 0 && x != y;

    opposed(direction(sw.row, nw.row), direction(se.row, ne.row))
        || opposed(direction(sw.col, se.col), direction(nw.col, ne.col))
}
