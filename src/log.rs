use crate::dataset::{DatasetView, VariableStats};
use crate::input::SelectionConfig;
use crate::resolver::GridPoint;
use std::time::Duration;

pub fn show_greeting(source: &str) {
    println!("=== ANHA Grid Subsetter ===");
    println!("Loading selection from: {}", source);
}

fn show_range(label: &str, range: Option<(f64, f64)>) {
    match range {
        Some((min, max)) => println!("  {}: {} to {}", label, min, max),
        None => println!("  {}: full", label),
    }
}

pub fn config_echo(config: &SelectionConfig) {
    println!("\nConfiguration:");
    println!("  Data: {}", config.data_path.display());
    if let Some(grid) = &config.grid_path {
        println!("  Grid: {}", grid.display());
    }
    if let Some(mask) = &config.mask_path {
        println!(
            "  Mask: {} ('{}', valid codes {:?})",
            mask.display(),
            config.mask_variable,
            config.mask_valid_codes
        );
    }
    if let Some(region) = &config.region {
        println!("  Region: {}", region);
    }
    show_range("Latitude", config.lat_range);
    show_range("Longitude", config.lon_range);
    show_range("Depth", config.depth_range);
    if config.variables.is_empty() {
        println!("  Variables: all");
    } else {
        println!("  Variables: {}", config.variables.join(", "));
    }
    if let Some(output) = &config.output_path {
        println!("  Output: {}", output.display());
    }
}

pub fn show_selection_summary(view: &DatasetView) {
    let (rows, cols) = view.spatial_shape();
    println!("\nSelection:");
    println!("  Index range: {}", view.index_range());
    println!("  Shape: {} rows x {} cols, {} depth levels", rows, cols, view.depth().len());
    if let Some(resolution) = view.resolution() {
        if let Some(corners) = &resolution.corners {
            for corner in corners {
                println!(
                    "    corner ({}, {}) at {:.4} deg",
                    corner.row, corner.col, corner.distance
                );
            }
        }
        if !resolution.clamped.is_empty() {
            let clamped: Vec<String> = resolution.clamped.iter().map(|a| a.to_string()).collect();
            println!("  Clamped to grid extent: {}", clamped.join(", "));
        }
        if resolution.fold_suspect {
            println!("  Warning: corners straddle a grid fold, check the selection");
        }
        if resolution.seam_crossing {
            println!("  Warning: longitude range crosses the grid seam, all columns selected");
        }
    }
    for variable in view.variables().values() {
        println!("  {} {:?}", variable.name, variable.shape());
    }
}

pub fn show_point(lat: f64, lon: f64, point: &GridPoint, coordinate: (f64, f64)) {
    println!("\nNearest grid point to ({}, {}):", lat, lon);
    println!("  Index: row {}, col {}", point.row, point.col);
    println!("  Cell: ({:.4}, {:.4})", coordinate.0, coordinate.1);
    println!("  Distance: {:.4} deg", point.distance);
}

pub fn show_statistics(name: &str, stats: &VariableStats) {
    println!("\nStatistics of '{}':", name);
    println!("  Valid cells: {}", stats.count);
    println!("  Mean: {:.4}", stats.mean);
    println!("  Std:  {:.4}", stats.std);
    println!("  Min:  {:.4}", stats.min);
    println!("  Max:  {:.4}", stats.max);
}

pub fn show_farewell_with_timing(elapsed: Duration) {
    println!("\n=== Done in {:.2?} ===", elapsed);
}
