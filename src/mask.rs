//! # Mask Overlay
//!
//! A mask is a field of integer codes aligned with the model grid, either one
//! horizontal layer or one layer per depth level. Cells whose code is not in
//! the mask's valid set (land, in the usual ANHA `tmask` where ocean is `1`)
//! are replaced with NaN when the mask is applied. Masks are never modified by
//! being applied.

use crate::dataset::DatasetView;
use crate::error::{AnhaError, AnhaResult, Axis};
use crate::range::IndexRange;
use log::debug;
use ndarray::{s, Array2, Array3, Axis as ArrayAxis};

/// Code marking an ocean cell in ANHA mask files.
pub const OCEAN_CODE: i32 = 1;

/// Validity codes on the grid, shaped (levels, rows, cols).
#[derive(Debug, Clone, PartialEq)]
pub struct MaskField {
    codes: Array3<i32>,
    depth_dependent: bool,
    valid_codes: Vec<i32>,
}

impl MaskField {
    /// A single-layer mask applied at every depth level.
    pub fn surface(codes: Array2<i32>) -> Self {
        MaskField {
            codes: codes.insert_axis(ArrayAxis(0)),
            depth_dependent: false,
            valid_codes: vec![OCEAN_CODE],
        }
    }

    /// One layer per depth level.
    pub fn volume(codes: Array3<i32>) -> Self {
        MaskField {
            codes,
            depth_dependent: true,
            valid_codes: vec![OCEAN_CODE],
        }
    }

    /// Replaces the set of codes treated as valid.
    pub fn with_valid_codes(mut self, valid_codes: Vec<i32>) -> Self {
        self.valid_codes = valid_codes;
        self
    }

    /// Keeps only the cells of one named sub-region code.
    pub fn region(self, code: i32) -> Self {
        self.with_valid_codes(vec![code])
    }

    pub fn valid_codes(&self) -> &[i32] {
        &self.valid_codes
    }

    pub fn codes(&self) -> &Array3<i32> {
        &self.codes
    }

    pub fn is_depth_dependent(&self) -> bool {
        self.depth_dependent
    }

    /// (rows, cols)
    pub fn spatial_shape(&self) -> (usize, usize) {
        let (_, rows, cols) = self.codes.dim();
        (rows, cols)
    }

    pub fn levels(&self) -> usize {
        self.codes.dim().0
    }

    /// Whether the cell passes the mask. `level` is ignored by surface masks;
    /// data without a depth axis is checked against the top layer.
    pub fn is_valid(&self, level: Option<usize>, row: usize, col: usize) -> bool {
        let layer = if self.depth_dependent { level.unwrap_or(0) } else { 0 };
        self.valid_codes.contains(&self.codes[[layer, row, col]])
    }

    /// Number of valid cells.
    pub fn valid_count(&self) -> usize {
        self.codes
            .iter()
            .filter(|&&c| self.valid_codes.contains(&c))
            .count()
    }

    /// Cuts a full-grid mask down to `range`. `depth_levels` is the length of
    /// the grid's depth axis, used to resolve a full depth selection.
    pub fn subset(&self, range: &IndexRange, depth_levels: usize) -> AnhaResult<MaskField> {
        let (rows, cols) = self.spatial_shape();
        if range.row_range.end >= rows || range.col_range.end >= cols {
            return Err(AnhaError::ShapeMismatch {
                field: "mask".to_string(),
                expected: vec![range.row_range.end + 1, range.col_range.end + 1],
                found: vec![rows, cols],
            });
        }

        let (r, c) = (range.row_range, range.col_range);
        let codes = if self.depth_dependent {
            if self.levels() != depth_levels {
                return Err(AnhaError::ShapeMismatch {
                    field: "mask depth".to_string(),
                    expected: vec![depth_levels],
                    found: vec![self.levels()],
                });
            }
            let d = range
                .depth_range
                .resolve(depth_levels)
                .ok_or_else(|| AnhaError::empty(Axis::Depth, "grid has no depth levels"))?;
            self.codes
                .slice(s![d.start..=d.end, r.start..=r.end, c.start..=c.end])
                .to_owned()
        } else {
            self.codes
                .slice(s![.., r.start..=r.end, c.start..=c.end])
                .to_owned()
        };

        Ok(MaskField {
            codes,
            depth_dependent: self.depth_dependent,
            valid_codes: self.valid_codes.clone(),
        })
    }
}

/// Replaces every value at an invalid mask position with NaN.
///
/// The mask's horizontal shape must equal the view's selected shape, and a
/// depth-dependent mask must have one layer per selected depth level.
/// Variables without both horizontal axes pass through untouched.
pub fn apply_mask(view: &DatasetView, mask: &MaskField) -> AnhaResult<DatasetView> {
    let view_shape = view.spatial_shape();
    if mask.spatial_shape() != view_shape {
        let (rows, cols) = mask.spatial_shape();
        return Err(AnhaError::ShapeMismatch {
            field: "mask".to_string(),
            expected: vec![view_shape.0, view_shape.1],
            found: vec![rows, cols],
        });
    }
    if mask.is_depth_dependent() && mask.levels() != view.depth().len() {
        return Err(AnhaError::ShapeMismatch {
            field: "mask depth".to_string(),
            expected: vec![view.depth().len()],
            found: vec![mask.levels()],
        });
    }

    let mut masked = view.clone();
    let dims = view.dims().clone();
    for variable in masked.variables_mut().values_mut() {
        let axes = variable.grid_axes(&dims);
        let (Some(row_axis), Some(col_axis)) = (axes.row, axes.col) else {
            continue;
        };

        let mut hidden = 0usize;
        for (index, value) in variable.data.indexed_iter_mut() {
            let level = axes.depth.map(|a| index[a]);
            if !mask.is_valid(level, index[row_axis], index[col_axis]) {
                *value = f64::NAN;
                hidden += 1;
            }
        }
        debug!("Masked {} values of '{}'", hidden, variable.name);
    }

    Ok(masked)
}
