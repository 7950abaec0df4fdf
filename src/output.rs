//! # Output Module
//!
//! Writes selections back out, either as a self-describing netCDF subset or
//! flattened into a Polars DataFrame and saved as Parquet.
//!
//! ## Features
//!
//! - **NetCDF subsets**: coordinates, variables and the producing index range
//! - **Tabular export**: one row per cell with grid indices and coordinates
//! - **Format by extension**: `.nc` or `.parquet`

use crate::dataset::DatasetView;
use crate::error::{AnhaError, AnhaResult};
use log::debug;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Writes a view to `path`, choosing the format from the extension.
///
/// Parquet output holds a single variable, so `variable` is required for it
/// unless the view has exactly one.
pub fn write_view<P: AsRef<Path>>(
    view: &DatasetView,
    path: P,
    variable: Option<&str>,
) -> AnhaResult<()> {
    let path = path.as_ref();
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => {
            let name = match variable {
                Some(name) => name.to_string(),
                None if view.variables().len() == 1 => {
                    view.variables().keys().next().cloned().unwrap_or_default()
                }
                None => {
                    return Err(AnhaError::Config(
                        "Parquet output needs exactly one variable, use --variable".to_string(),
                    ));
                }
            };
            let mut df = view_to_dataframe(view, &name)?;
            write_dataframe_to_parquet(&mut df, path)
        }
        Some("nc") | Some("nc4") => write_view_netcdf(view, path),
        other => Err(AnhaError::Config(format!(
            "Unsupported output extension {:?}, expected .nc or .parquet",
            other
        ))),
    }
}

/// Writes the view's coordinates and variables to a new netCDF file.
///
/// The producing index range on the original grid is kept as global
/// attributes so the subset can be located again.
pub fn write_view_netcdf<P: AsRef<Path>>(view: &DatasetView, path: P) -> AnhaResult<()> {
    let dims = view.dims();
    let (rows, cols) = view.spatial_shape();
    let mut file = netcdf::create(path.as_ref())?;

    let depth_dim = view
        .variables()
        .values()
        .flat_map(|v| v.dims.iter())
        .find(|d| dims.is_depth_dim(d))
        .cloned()
        .or_else(|| dims.depth_dims.first().cloned())
        .unwrap_or_else(|| "depth".to_string());

    let mut lengths: HashMap<String, usize> = HashMap::new();
    lengths.insert(dims.row_dim.clone(), rows);
    lengths.insert(dims.col_dim.clone(), cols);
    if !view.depth().is_empty() {
        lengths.insert(depth_dim.clone(), view.depth().len());
    }
    for variable in view.variables().values() {
        for (dim, &len) in variable.dims.iter().zip(variable.shape()) {
            match lengths.get(dim) {
                Some(&known) if known != len => {
                    return Err(AnhaError::ShapeMismatch {
                        field: format!("{} dimension '{}'", variable.name, dim),
                        expected: vec![known],
                        found: vec![len],
                    });
                }
                Some(_) => {}
                None => {
                    lengths.insert(dim.clone(), len);
                }
            }
        }
    }

    let mut ordered: Vec<(&String, &usize)> = lengths.iter().collect();
    ordered.sort();
    for (name, &len) in ordered {
        file.add_dimension(name, len)?;
    }

    let range = view.index_range();
    file.add_attribute("row_start", range.row_range.start as i32)?;
    file.add_attribute("row_end", range.row_range.end as i32)?;
    file.add_attribute("col_start", range.col_range.start as i32)?;
    file.add_attribute("col_end", range.col_range.end as i32)?;
    file.add_attribute("index_range", range.to_string().as_str())?;

    let grid_dims = [dims.row_dim.as_str(), dims.col_dim.as_str()];
    let lat_name = dims.latitude_vars.first().map_or("nav_lat", |s| s.as_str());
    let lon_name = dims.longitude_vars.first().map_or("nav_lon", |s| s.as_str());
    {
        let mut lat = file.add_variable::<f64>(lat_name, &grid_dims)?;
        lat.put_attribute("units", "degrees_north")?;
        lat.put_attribute("standard_name", "latitude")?;
        lat.put_values(&view.latitude().iter().copied().collect::<Vec<f64>>(), ..)?;
    }
    {
        let mut lon = file.add_variable::<f64>(lon_name, &grid_dims)?;
        lon.put_attribute("units", "degrees_east")?;
        lon.put_attribute("standard_name", "longitude")?;
        lon.put_values(&view.longitude().iter().copied().collect::<Vec<f64>>(), ..)?;
    }
    if !view.depth().is_empty() {
        let depth_name = dims.depth_vars.first().map_or("depth", |s| s.as_str());
        let mut depth = file.add_variable::<f64>(depth_name, &[depth_dim.as_str()])?;
        depth.put_attribute("units", "m")?;
        depth.put_attribute("positive", "down")?;
        depth.put_values(&view.depth().to_vec(), ..)?;
    }

    for variable in view.variables().values() {
        let var_dims: Vec<&str> = variable.dims.iter().map(|d| d.as_str()).collect();
        let mut var = file.add_variable::<f64>(&variable.name, &var_dims)?;
        if let Some(units) = &variable.units {
            var.put_attribute("units", units.as_str())?;
        }
        var.put_values(&variable.data.iter().copied().collect::<Vec<f64>>(), ..)?;
        debug!("Wrote '{}' {:?}", variable.name, variable.shape());
    }

    file.close()?;
    Ok(())
}

/// Flattens one variable of a view into a DataFrame.
///
/// Columns: one original-grid index per dimension (named after it),
/// `nav_lat`, `nav_lon`, `depth_m` when the variable has a depth axis, and
/// the values under the variable's name.
pub fn view_to_dataframe(view: &DatasetView, name: &str) -> AnhaResult<DataFrame> {
    let variable = view.variable(name)?;
    let axes = variable.grid_axes(view.dims());
    let range = view.index_range();
    let depth_offset = range
        .depth_range
        .resolve(view.store().depth_levels())
        .map_or(0, |d| d.start);

    let mut index_columns: Vec<Vec<u32>> = vec![Vec::new(); variable.dims.len()];
    let mut lat_values = Vec::new();
    let mut lon_values = Vec::new();
    let mut depth_values = Vec::new();
    let mut values = Vec::new();

    for (index, &value) in variable.data.indexed_iter() {
        for (axis, column) in index_columns.iter_mut().enumerate() {
            let offset = if Some(axis) == axes.row {
                range.row_range.start
            } else if Some(axis) == axes.col {
                range.col_range.start
            } else if Some(axis) == axes.depth {
                depth_offset
            } else {
                0
            };
            column.push((index[axis] + offset) as u32);
        }
        if let (Some(r), Some(c)) = (axes.row, axes.col) {
            lat_values.push(view.latitude()[[index[r], index[c]]]);
            lon_values.push(view.longitude()[[index[r], index[c]]]);
        }
        if let Some(d) = axes.depth {
            depth_values.push(view.depth()[index[d]]);
        }
        values.push(value);
    }

    let mut columns = Vec::new();
    for (dim_name, column) in variable.dims.iter().zip(index_columns) {
        columns.push(Series::new(dim_name.as_str().into(), column).into());
    }
    if !lat_values.is_empty() {
        columns.push(Series::new("nav_lat".into(), lat_values).into());
        columns.push(Series::new("nav_lon".into(), lon_values).into());
    }
    if !depth_values.is_empty() {
        columns.push(Series::new("depth_m".into(), depth_values).into());
    }
    columns.push(Series::new(name.into(), values).into());

    Ok(DataFrame::new(columns)?)
}

/// Writes a DataFrame to a Parquet file.
pub fn write_dataframe_to_parquet<P: AsRef<Path>>(df: &mut DataFrame, output_path: P) -> AnhaResult<()> {
    let output_path = output_path.as_ref();
    debug!("Writing DataFrame to parquet file: {}", output_path.display());
    debug!("DataFrame shape: {:?}", df.shape());
    debug!("DataFrame schema:\n{:?}", df.schema());

    let file = File::create(output_path)?;
    ParquetWriter::new(file).finish(df)?;

    debug!("Successfully wrote parquet file: {}", output_path.display());
    Ok(())
}
