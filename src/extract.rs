//! # NetCDF Reading
//!
//! Loads grid coordinates, data variables and masks from ANHA/NEMO netCDF
//! files into in-memory arrays.
//!
//! ## Key Components
//!
//! - [`read_grid_fields`]: 2-D latitude/longitude and 1-D depth
//! - [`read_data_fields`]: every variable laid out on the horizontal grid
//! - [`read_mask_field`]: validity codes such as `tmask`
//! - [`AnhaDataset::load`]: all of the above assembled into a [`Dataset`]
//!
//! Values are read as `f64`. `_FillValue`/`missing_value` cells become NaN and
//! `scale_factor`/`add_offset` are applied.

use crate::dataset::{Dataset, Variable};
use crate::error::{AnhaError, AnhaResult, Axis};
use crate::grid::{GridDims, GridIndexStore};
use crate::mask::MaskField;
use log::{debug, info};
use ndarray::{Array1, Array2, ArrayD, Axis as ArrayAxis, Ix1, Ix2, Ix3, IxDyn};
use std::collections::BTreeMap;
use std::path::Path;

/// Entry point for loading ANHA model output.
pub struct AnhaDataset;

impl AnhaDataset {
    /// Loads every gridded variable of `data_path`.
    ///
    /// Coordinates come from `grid_path` when given, otherwise from the data
    /// file itself (ANHA output carries `nav_lat_grid_T`/`nav_lon_grid_T`).
    pub fn load<P: AsRef<Path>, G: AsRef<Path>>(
        data_path: P,
        grid_path: Option<G>,
    ) -> AnhaResult<Dataset> {
        Self::load_with(data_path, grid_path, &GridDims::default(), &[])
    }

    /// Loads with explicit axis names, restricted to `variables` unless empty.
    pub fn load_with<P: AsRef<Path>, G: AsRef<Path>>(
        data_path: P,
        grid_path: Option<G>,
        dims: &GridDims,
        variables: &[String],
    ) -> AnhaResult<Dataset> {
        let data_path = data_path.as_ref();
        let grid_path = grid_path.as_ref().map_or(data_path, |g| g.as_ref());

        info!("Loading grid from {}", grid_path.display());
        let (latitude, longitude, depth) = read_grid_fields(grid_path, dims)?;
        let store = GridIndexStore::load(latitude, longitude, depth)?;

        info!("Loading data from {}", data_path.display());
        let fields = read_data_fields(data_path, dims, variables)?;
        Ok(Dataset::new(store, dims.clone(), fields))
    }
}

/// Reads (latitude, longitude, depth) from a grid or data file.
///
/// Curvilinear coordinates may carry leading record dimensions, of which the
/// first record is used. 1-D latitude/longitude axes are expanded into 2-D
/// fields. A file without a depth variable yields an empty depth axis.
pub fn read_grid_fields<P: AsRef<Path>>(
    path: P,
    dims: &GridDims,
) -> AnhaResult<(Array2<f64>, Array2<f64>, Array1<f64>)> {
    let file = netcdf::open(path.as_ref())?;

    let (lat_name, lat) = read_first_of(&file, &dims.latitude_vars)?;
    let (lon_name, lon) = read_first_of(&file, &dims.longitude_vars)?;

    let (latitude, longitude) = if lat.ndim() == 1 && lon.ndim() == 1 {
        let lat = lat.into_dimensionality::<Ix1>()?;
        let lon = lon.into_dimensionality::<Ix1>()?;
        let latitude = Array2::from_shape_fn((lat.len(), lon.len()), |(i, _)| lat[i]);
        let longitude = Array2::from_shape_fn((lat.len(), lon.len()), |(_, j)| lon[j]);
        (latitude, longitude)
    } else {
        (to_2d(lat, &lat_name)?, to_2d(lon, &lon_name)?)
    };

    let depth = match read_first_of(&file, &dims.depth_vars) {
        Ok((name, depth)) => {
            debug!("Depth axis from '{}'", name);
            first_record(depth).into_dimensionality::<Ix1>()?
        }
        Err(AnhaError::MissingVariable(_)) => Array1::zeros(0),
        Err(e) => return Err(e),
    };

    debug!(
        "Grid '{}'/'{}' shape {:?}, {} depth levels",
        lat_name,
        lon_name,
        latitude.dim(),
        depth.len()
    );
    file.close()?;
    Ok((latitude, longitude, depth))
}

/// Reads the data variables laid out on the horizontal grid.
///
/// Coordinate variables are skipped. With a non-empty `names`, only those
/// variables are read and each one must exist.
pub fn read_data_fields<P: AsRef<Path>>(
    path: P,
    dims: &GridDims,
    names: &[String],
) -> AnhaResult<BTreeMap<String, Variable>> {
    let file = netcdf::open(path.as_ref())?;
    let mut fields = BTreeMap::new();

    for name in names {
        if file.variable(name).is_none() {
            return Err(AnhaError::MissingVariable(name.clone()));
        }
    }

    for var in file.variables() {
        let name = var.name().to_string();
        if dims.is_coordinate(&name) || (!names.is_empty() && !names.contains(&name)) {
            continue;
        }
        let var_dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        let on_grid = var_dims.contains(&dims.row_dim) && var_dims.contains(&dims.col_dim);
        if !on_grid {
            continue;
        }

        let data = read_f64(&var)?;
        debug!("Read '{}' {:?} {:?}", name, var_dims, data.shape());
        let mut variable = Variable::new(&name, var_dims, data);
        variable.units = string_attribute(&var, "units");
        fields.insert(name, variable);
    }

    file.close()?;
    Ok(fields)
}

/// Reads a mask variable, dropping leading record dimensions.
///
/// With `level = Some(k)` a 3-D mask is reduced to its layer `k` and applied
/// at every depth; with `None` the full depth-dependent mask is kept.
pub fn read_mask_field<P: AsRef<Path>>(
    path: P,
    variable: &str,
    level: Option<usize>,
    valid_codes: &[i32],
) -> AnhaResult<MaskField> {
    let file = netcdf::open(path.as_ref())?;
    let var = file
        .variable(variable)
        .ok_or_else(|| AnhaError::MissingVariable(variable.to_string()))?;

    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let values = var.get_values::<i32, _>(..)?;
    let mut codes = ArrayD::from_shape_vec(IxDyn(&shape), values)?;
    while codes.ndim() > 3 {
        codes = codes.index_axis_move(ArrayAxis(0), 0);
    }

    let mask = match codes.ndim() {
        2 => MaskField::surface(codes.into_dimensionality::<Ix2>()?),
        3 => {
            let codes = codes.into_dimensionality::<Ix3>()?;
            match level {
                Some(k) if k < codes.dim().0 => {
                    MaskField::surface(codes.index_axis_move(ArrayAxis(0), k))
                }
                Some(k) => {
                    return Err(AnhaError::empty(
                        Axis::Depth,
                        format!("mask has {} levels, level {} requested", codes.dim().0, k),
                    ));
                }
                None => MaskField::volume(codes),
            }
        }
        _ => {
            return Err(AnhaError::ShapeMismatch {
                field: variable.to_string(),
                expected: vec![0, 0],
                found: shape,
            });
        }
    };

    file.close()?;
    Ok(mask.with_valid_codes(valid_codes.to_vec()))
}

fn read_first_of(file: &netcdf::File, candidates: &[String]) -> AnhaResult<(String, ArrayD<f64>)> {
    for name in candidates {
        if let Some(var) = file.variable(name) {
            return Ok((name.clone(), read_f64(&var)?));
        }
    }
    Err(AnhaError::MissingVariable(candidates.join(" | ")))
}

/// Reads a variable as `f64` with fill values and packing resolved.
fn read_f64(var: &netcdf::Variable) -> AnhaResult<ArrayD<f64>> {
    let shape: Vec<usize> = var.dimensions().iter().map(|d| d.len()).collect();
    let raw = var.get_values::<f64, _>(..)?;

    let fill = numeric_attribute(var, "_FillValue").or_else(|| numeric_attribute(var, "missing_value"));
    let scale = numeric_attribute(var, "scale_factor").unwrap_or(1.0);
    let offset = numeric_attribute(var, "add_offset").unwrap_or(0.0);

    let values: Vec<f64> = raw
        .into_iter()
        .map(|v| match fill {
            Some(f) if v == f => f64::NAN,
            _ => v * scale + offset,
        })
        .collect();
    Ok(ArrayD::from_shape_vec(IxDyn(&shape), values)?)
}

fn to_2d(data: ArrayD<f64>, name: &str) -> AnhaResult<Array2<f64>> {
    if data.ndim() < 2 {
        return Err(AnhaError::ShapeMismatch {
            field: name.to_string(),
            expected: vec![0, 0],
            found: data.shape().to_vec(),
        });
    }
    let mut data = data;
    while data.ndim() > 2 {
        data = data.index_axis_move(ArrayAxis(0), 0);
    }
    Ok(data.into_dimensionality::<Ix2>()?)
}

fn first_record(data: ArrayD<f64>) -> ArrayD<f64> {
    let mut data = data;
    while data.ndim() > 1 {
        data = data.index_axis_move(ArrayAxis(0), 0);
    }
    data
}

fn numeric_attribute(var: &netcdf::Variable, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            _ => None,
        })
}

fn string_attribute(var: &netcdf::Variable, name: &str) -> Option<String> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Str(s) => Some(s),
            _ => None,
        })
}
