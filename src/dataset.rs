//! # Subsetting Engine
//!
//! A [`Dataset`] is a full model output: named variables plus the shared
//! [`GridIndexStore`]. Selecting from it produces a [`DatasetView`], an owned
//! and immutable window whose coordinates and variables are cut with the same
//! index ranges.
//!
//! Views remember their [`IndexRange`] on the original grid. Selecting again
//! from a view resolves the new request against the full grid and intersects it
//! with that range, so repeated narrowing gives the same result as a single
//! combined request. Nothing a view does reaches back into its source.
//!
//! ## Example
//!
//! ```rust,no_run
//! use anhalyze::{AnhaDataset, SelectionRequest};
//!
//! let dataset = AnhaDataset::load("ANHA4-EPM111_y1998m04d05_gridT.nc", None::<&str>)?;
//! let hudson = dataset.select(&SelectionRequest::new().lat(50.0, 65.0).lon(-93.0, -75.0))?;
//! let james = hudson.select(&SelectionRequest::new().lat(51.0, 54.7).lon(-82.5, -78.5))?;
//! println!("{}", james.index_range());
//! # Ok::<(), anhalyze::AnhaError>(())
//! ```

use crate::error::{AnhaError, AnhaResult};
use crate::grid::{GridDims, GridIndexStore};
use crate::mask::{apply_mask, MaskField};
use crate::range::{
    resolve_box_detailed, AxisRange, BoxResolution, DepthSelection, IndexRange, SelectionRequest,
};
use crate::resolver::{LinearScanResolver, PointResolver};
use log::debug;
use ndarray::{s, Array1, Array2, ArrayD, Axis as ArrayAxis, Slice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A data array with named dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<String>,
    pub data: ArrayD<f64>,
    pub units: Option<String>,
}

/// Positions of the grid axes inside a variable's dimensions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridAxes {
    pub row: Option<usize>,
    pub col: Option<usize>,
    pub depth: Option<usize>,
}

impl Variable {
    pub fn new(name: &str, dims: Vec<String>, data: ArrayD<f64>) -> Self {
        Variable {
            name: name.to_string(),
            dims,
            data,
            units: None,
        }
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = Some(units.to_string());
        self
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn grid_axes(&self, dims: &GridDims) -> GridAxes {
        GridAxes {
            row: self.dims.iter().position(|d| *d == dims.row_dim),
            col: self.dims.iter().position(|d| *d == dims.col_dim),
            depth: self.dims.iter().position(|d| dims.is_depth_dim(d)),
        }
    }

    /// NaN-ignoring summary of all values.
    pub fn statistics(&self) -> AnhaResult<VariableStats> {
        VariableStats::from_values(self.data.iter().copied())
            .ok_or_else(|| AnhaError::NoValidValues(self.name.clone()))
    }
}

/// Summary statistics over the finite values of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl VariableStats {
    pub fn from_values(values: impl Iterator<Item = f64>) -> Option<Self> {
        let finite: Vec<f64> = values.filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let count = finite.len();
        let mean = finite.iter().sum::<f64>() / count as f64;
        let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;
        let (min, max) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        Some(VariableStats {
            count,
            mean,
            std: variance.sqrt(),
            min,
            max,
        })
    }
}

/// A full model output on one grid.
#[derive(Debug, Clone)]
pub struct Dataset {
    store: Arc<GridIndexStore>,
    dims: GridDims,
    variables: BTreeMap<String, Variable>,
    resolver: Arc<dyn PointResolver>,
}

impl Dataset {
    pub fn new(
        store: impl Into<Arc<GridIndexStore>>,
        dims: GridDims,
        variables: BTreeMap<String, Variable>,
    ) -> Self {
        Dataset {
            store: store.into(),
            dims,
            variables,
            resolver: Arc::new(LinearScanResolver::default()),
        }
    }

    /// Swaps the nearest-point search strategy.
    pub fn with_resolver(mut self, resolver: impl PointResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Keeps the linear scan but changes its out-of-domain threshold.
    pub fn with_max_distance(self, max_distance: f64) -> Self {
        self.with_resolver(LinearScanResolver::new(max_distance))
    }

    pub fn store(&self) -> &Arc<GridIndexStore> {
        &self.store
    }

    pub fn dims(&self) -> &GridDims {
        &self.dims
    }

    pub fn resolver(&self) -> &dyn PointResolver {
        self.resolver.as_ref()
    }

    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> AnhaResult<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| AnhaError::MissingVariable(name.to_string()))
    }

    /// A view over the whole grid.
    pub fn full_view(&self) -> AnhaResult<DatasetView> {
        self.select(&SelectionRequest::new())
    }

    /// Selects a geographic/depth sub-region.
    pub fn select(&self, request: &SelectionRequest) -> AnhaResult<DatasetView> {
        let resolution = resolve_box_detailed(&self.store, self.resolver.as_ref(), request)?;
        let source = IndexRange::full(&self.store);
        materialize(
            &self.store,
            &self.dims,
            &self.resolver,
            &self.variables,
            &source,
            resolution.index_range,
            Some(resolution),
        )
    }

    /// Builds a view from a resolution computed earlier against this
    /// dataset's grid, skipping the corner search.
    pub fn select_resolved(&self, resolution: &BoxResolution) -> AnhaResult<DatasetView> {
        let range = resolution.index_range;
        let (rows, cols) = self.store.shape();
        let levels = self.store.depth_levels();
        let depth_end = match range.depth_range {
            DepthSelection::Full => None,
            DepthSelection::Levels(d) => Some(d.end),
        };
        if range.row_range.end >= rows
            || range.col_range.end >= cols
            || depth_end.is_some_and(|end| end >= levels)
        {
            return Err(AnhaError::ShapeMismatch {
                field: "index range".to_string(),
                expected: vec![rows, cols, levels],
                found: vec![
                    range.row_range.end + 1,
                    range.col_range.end + 1,
                    depth_end.map_or(levels, |end| end + 1),
                ],
            });
        }

        let source = IndexRange::full(&self.store);
        materialize(
            &self.store,
            &self.dims,
            &self.resolver,
            &self.variables,
            &source,
            range,
            Some(resolution.clone()),
        )
    }

    /// Same as [`Dataset::select`] with positional ranges.
    pub fn sel(
        &self,
        lat_range: Option<(f64, f64)>,
        lon_range: Option<(f64, f64)>,
        depth_range: Option<(f64, f64)>,
    ) -> AnhaResult<DatasetView> {
        self.select(&SelectionRequest {
            lat_range,
            lon_range,
            depth_range,
        })
    }
}

/// An immutable window over a dataset.
#[derive(Debug, Clone)]
pub struct DatasetView {
    store: Arc<GridIndexStore>,
    dims: GridDims,
    resolver: Arc<dyn PointResolver>,
    index_range: IndexRange,
    resolution: Option<BoxResolution>,
    latitude: Array2<f64>,
    longitude: Array2<f64>,
    depth: Array1<f64>,
    variables: BTreeMap<String, Variable>,
}

impl DatasetView {
    /// Narrows this view further. Ranges are resolved on the original grid.
    pub fn select(&self, request: &SelectionRequest) -> AnhaResult<DatasetView> {
        let resolution = resolve_box_detailed(&self.store, self.resolver.as_ref(), request)?;
        let target = self.index_range.intersect(&resolution.index_range)?;
        materialize(
            &self.store,
            &self.dims,
            &self.resolver,
            &self.variables,
            &self.index_range,
            target,
            Some(resolution),
        )
    }

    pub fn sel(
        &self,
        lat_range: Option<(f64, f64)>,
        lon_range: Option<(f64, f64)>,
        depth_range: Option<(f64, f64)>,
    ) -> AnhaResult<DatasetView> {
        self.select(&SelectionRequest {
            lat_range,
            lon_range,
            depth_range,
        })
    }

    /// Masks with a field already cut to this view's shape.
    pub fn apply_mask(&self, mask: &MaskField) -> AnhaResult<DatasetView> {
        apply_mask(self, mask)
    }

    /// Masks with a field covering the whole grid.
    pub fn apply_grid_mask(&self, mask: &MaskField) -> AnhaResult<DatasetView> {
        let (rows, cols) = self.store.shape();
        let (mask_rows, mask_cols) = mask.spatial_shape();
        if (mask_rows, mask_cols) != (rows, cols) {
            return Err(AnhaError::ShapeMismatch {
                field: "mask".to_string(),
                expected: vec![rows, cols],
                found: vec![mask_rows, mask_cols],
            });
        }
        let local = mask.subset(&self.index_range, self.store.depth_levels())?;
        apply_mask(self, &local)
    }

    pub fn variables(&self) -> &BTreeMap<String, Variable> {
        &self.variables
    }

    pub(crate) fn variables_mut(&mut self) -> &mut BTreeMap<String, Variable> {
        &mut self.variables
    }

    pub fn variable(&self, name: &str) -> AnhaResult<&Variable> {
        self.variables
            .get(name)
            .ok_or_else(|| AnhaError::MissingVariable(name.to_string()))
    }

    /// (latitude, longitude, depth) cut to this view.
    pub fn coordinates(&self) -> (&Array2<f64>, &Array2<f64>, &Array1<f64>) {
        (&self.latitude, &self.longitude, &self.depth)
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

    pub fn index_range(&self) -> &IndexRange {
        &self.index_range
    }

    /// Per-corner resolution of the request that produced this view.
    pub fn resolution(&self) -> Option<&BoxResolution> {
        self.resolution.as_ref()
    }

    pub fn dims(&self) -> &GridDims {
        &self.dims
    }

    pub fn store(&self) -> &Arc<GridIndexStore> {
        &self.store
    }

    /// (rows, cols) of the selection.
    pub fn spatial_shape(&self) -> (usize, usize) {
        self.latitude.dim()
    }

    /// NaN-ignoring statistics of one variable.
    pub fn statistics(&self, name: &str) -> AnhaResult<VariableStats> {
        self.variable(name)?.statistics()
    }

    /// A copy with only the named variables.
    pub fn retain_variables(&self, names: &[String]) -> AnhaResult<DatasetView> {
        let mut view = self.clone();
        view.variables = names
            .iter()
            .map(|name| Ok((name.clone(), self.variable(name)?.clone())))
            .collect::<AnhaResult<_>>()?;
        Ok(view)
    }
}

/// Cuts coordinates from the store and variables from `variables` (which are
/// laid out over `source`) down to `target`.
fn materialize(
    store: &Arc<GridIndexStore>,
    dims: &GridDims,
    resolver: &Arc<dyn PointResolver>,
    variables: &BTreeMap<String, Variable>,
    source: &IndexRange,
    target: IndexRange,
    resolution: Option<BoxResolution>,
) -> AnhaResult<DatasetView> {
    let levels = store.depth_levels();
    let (r, c) = (target.row_range, target.col_range);
    let latitude = store
        .latitude()
        .slice(s![r.start..=r.end, c.start..=c.end])
        .to_owned();
    let longitude = store
        .longitude()
        .slice(s![r.start..=r.end, c.start..=c.end])
        .to_owned();
    let target_depth = target.depth_range.resolve(levels);
    let depth = match target_depth {
        Some(d) => store.depth().slice(s![d.start..=d.end]).to_owned(),
        None => Array1::zeros(0),
    };

    let source_depth = source.depth_range.resolve(levels);
    let mut sliced = BTreeMap::new();
    for (name, variable) in variables {
        if variable.dims.len() != variable.data.ndim() {
            return Err(AnhaError::VariableShapeMismatch {
                variable: variable.name.clone(),
                dimension: format!("[{}]", variable.dims.join(", ")),
                expected: variable.dims.len(),
                found: variable.data.ndim(),
            });
        }
        let axes = variable.grid_axes(dims);
        let mut data = variable.data.view();

        let plan = [
            (axes.row, Some(source.row_range), Some(r)),
            (axes.col, Some(source.col_range), Some(c)),
            (axes.depth, source_depth, target_depth),
        ];
        for (axis, from, to) in plan {
            let Some(axis) = axis else { continue };
            let found = data.len_of(ArrayAxis(axis));
            let expected = from.map_or(0, |f| f.len());
            let (Some(from), Some(to)) = (from, to) else {
                return Err(variable_mismatch(variable, axis, expected, found));
            };
            if found != expected {
                return Err(variable_mismatch(variable, axis, expected, found));
            }
            let local: AxisRange = to.relative_to(&from);
            data.slice_axis_inplace(ArrayAxis(axis), Slice::from(local.start..local.end + 1));
        }

        sliced.insert(
            name.clone(),
            Variable {
                name: variable.name.clone(),
                dims: variable.dims.clone(),
                data: data.to_owned(),
                units: variable.units.clone(),
            },
        );
    }

    debug!(
        "Materialized view {} with {} variables, shape {:?}",
        target,
        sliced.len(),
        latitude.dim()
    );

    Ok(DatasetView {
        store: Arc::clone(store),
        dims: dims.clone(),
        resolver: Arc::clone(resolver),
        index_range: target,
        resolution,
        latitude,
        longitude,
        depth,
        variables: sliced,
    })
}

fn variable_mismatch(variable: &Variable, axis: usize, expected: usize, found: usize) -> AnhaError {
    AnhaError::VariableShapeMismatch {
        variable: variable.name.clone(),
        dimension: variable.dims.get(axis).cloned().unwrap_or_default(),
        expected,
        found,
    }
}
