//! # Grid Information Module
//!
//! Summarises a model or grid file: the horizontal grid shape, the coordinate
//! extents and the variables laid out on the grid.

use crate::extract::read_grid_fields;
use crate::grid::{GridDims, GridIndexStore};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Information about a netCDF dimension
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

/// Information about a netCDF variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub units: Option<String>,
    /// Whether the variable spans both horizontal grid axes
    pub on_grid: bool,
}

/// Grid summary of one file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridInfo {
    pub path: String,
    pub file_size: Option<u64>,
    pub rows: usize,
    pub cols: usize,
    pub depth_levels: usize,
    pub latitude_extent: (f64, f64),
    pub longitude_extent: (f64, f64),
    pub depth_extent: Option<(f64, f64)>,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
}

/// Reads the grid summary of `path`.
pub fn grid_info<P: AsRef<Path>>(path: P, dims: &GridDims) -> Result<GridInfo> {
    let path = path.as_ref();
    debug!("Inspecting {}", path.display());

    let (latitude, longitude, depth) = read_grid_fields(path, dims)
        .with_context(|| format!("Failed to read grid coordinates from {}", path.display()))?;
    let store = GridIndexStore::load(latitude, longitude, depth)
        .with_context(|| format!("Invalid grid in {}", path.display()))?;

    let file = netcdf::open(path)
        .with_context(|| format!("Failed to open NetCDF file: {}", path.display()))?;

    let dimensions = file
        .dimensions()
        .map(|dim| DimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        let var_dims: Vec<String> = var.dimensions().iter().map(|d| d.name().to_string()).collect();
        let units = var
            .attribute_value("units")
            .and_then(|r| r.ok())
            .and_then(|v| match v {
                netcdf::AttributeValue::Str(s) => Some(s),
                _ => None,
            });
        variables.push(VariableInfo {
            name: var.name().to_string(),
            on_grid: var_dims.contains(&dims.row_dim) && var_dims.contains(&dims.col_dim),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            dimensions: var_dims,
            units,
        });
    }
    file.close().context("Failed to close NetCDF file")?;

    let depth_extent = match (store.depth().first(), store.depth().last()) {
        (Some(&top), Some(&bottom)) => Some((top, bottom)),
        _ => None,
    };

    Ok(GridInfo {
        path: path.display().to_string(),
        file_size: fs::metadata(path).ok().map(|m| m.len()),
        rows: store.rows(),
        cols: store.cols(),
        depth_levels: store.depth_levels(),
        latitude_extent: store.latitude_extent(),
        longitude_extent: store.longitude_extent(),
        depth_extent,
        dimensions,
        variables,
    })
}

/// Print grid info in human-readable format
pub fn print_grid_info_human(info: &GridInfo) {
    println!("Grid Information:");
    println!("  Path: {}", info.path);
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!(
        "  Horizontal grid: {} rows x {} cols, {} depth levels",
        info.rows, info.cols, info.depth_levels
    );
    println!(
        "  Latitude:  {:.3} to {:.3}",
        info.latitude_extent.0, info.latitude_extent.1
    );
    println!(
        "  Longitude: {:.3} to {:.3}",
        info.longitude_extent.0, info.longitude_extent.1
    );
    if let Some((top, bottom)) = info.depth_extent {
        println!("  Depth:     {:.2} to {:.2} m", top, bottom);
    }
    println!("  Dimensions:");
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables:");
    for var in &info.variables {
        println!(
            "    {}{} - dimensions: [{}]{}",
            var.name,
            var.units.as_ref().map_or(String::new(), |u| format!(" [{}]", u)),
            var.dimensions.join(", "),
            if var.on_grid { "" } else { " (off grid)" }
        );
    }
}

/// Print grid info in JSON format
pub fn print_grid_info_json(info: &GridInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

/// Print grid info in YAML format
pub fn print_grid_info_yaml(info: &GridInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize grid info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print grid info in CSV format (variables only)
pub fn print_grid_info_csv(info: &GridInfo) {
    println!("variable_name,dimensions,shape,units,on_grid");
    for var in &info.variables {
        let shape: Vec<String> = var.shape.iter().map(|s| s.to_string()).collect();
        println!(
            "{},\"{}\",\"{}\",{},{}",
            var.name,
            var.dimensions.join(";"),
            shape.join(";"),
            var.units.as_deref().unwrap_or(""),
            var.on_grid
        );
    }
}
