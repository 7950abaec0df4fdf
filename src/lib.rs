//! # anhalyze
//!
//! Geographic and depth subsetting of ANHA/NEMO ocean-model output on
//! curvilinear grids.
//!
//! Model grids are indexed by (row, col) while users ask for latitude/longitude
//! boxes. The crate maps such a box onto the smallest enclosing index
//! rectangle, cuts coordinates and variables consistently, and overlays
//! land/ocean masks.
//!
//! ## Features
//!
//! - **Nearest-point resolution**: pluggable [`PointResolver`] strategies with a
//!   deterministic linear scan by default
//! - **Box selection**: lat/lon/depth requests resolved to an [`IndexRange`],
//!   with clamping to the grid extent and fold detection
//! - **Chained selection**: narrowing a [`DatasetView`] equals one combined request
//! - **Masks**: surface or depth-dependent validity codes
//! - **I/O**: netCDF input, netCDF or Parquet output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anhalyze::{run_selection, input::SelectionConfig};
//!
//! let config = SelectionConfig::from_file("james_bay.yaml")?;
//! let view = run_selection(&config)?;
//! println!("{}", view.index_range());
//! # Ok::<(), anhalyze::AnhaError>(())
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! data_path: ANHA4-EPM111_y1998m04d05_gridT.nc
//! mask_path: ANHA4_mask.nc
//! region: JamesBay
//! depth_range: [0.0, 50.0]
//! variables: [votemper]
//! output_path: james_bay.nc
//! ```

pub mod catalog;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod extract;
pub mod grid;
pub mod info;
pub mod input;
pub mod log;
pub mod mask;
pub mod output;
pub mod range;
pub mod regions;
pub mod resolver;
pub mod timeseries;

#[cfg(test)]
mod cli_tests;

pub use dataset::{Dataset, DatasetView, Variable, VariableStats};
pub use error::{AnhaError, AnhaResult, Axis};
pub use extract::AnhaDataset;
pub use grid::{GridDims, GridIndexStore};
pub use mask::{apply_mask, MaskField};
pub use range::{
    resolve_box, resolve_box_detailed, AxisRange, BoxResolution, DepthSelection, IndexRange,
    SelectionRequest,
};
pub use resolver::{GridPoint, LinearScanResolver, PointResolver};

use crate::extract::read_mask_field;
use crate::input::SelectionConfig;
use crate::output::write_view;
use ::log::info;

/// Runs a selection job end to end.
///
/// 1. Loads the grid and the requested variables
/// 2. Resolves the geographic/depth request to an index range
/// 3. Applies the mask, when one is configured
/// 4. Writes the result, when an output path is configured
///
/// Returns the final view.
///
/// # Errors
///
/// Any loading, resolution, masking or writing failure, see [`AnhaError`].
pub fn run_selection(config: &SelectionConfig) -> AnhaResult<DatasetView> {
    let dims = config.dims();
    let dataset = AnhaDataset::load_with(
        &config.data_path,
        config.grid_path.as_ref(),
        &dims,
        &config.variables,
    )?
    .with_max_distance(config.max_distance);

    let mut view = dataset.select(&config.request()?)?;

    if let Some(mask_path) = &config.mask_path {
        let mask = read_mask_field(
            mask_path,
            &config.mask_variable,
            config.mask_level,
            &config.mask_valid_codes,
        )?;
        view = view.apply_grid_mask(&mask)?;
        info!("Applied mask '{}' from {}", config.mask_variable, mask_path.display());
    }

    if let Some(output_path) = &config.output_path {
        let single = match config.variables.as_slice() {
            [name] => Some(name.as_str()),
            _ => None,
        };
        write_view(&view, output_path, single)?;
        info!("Wrote selection to {}", output_path.display());
    }

    Ok(view)
}
