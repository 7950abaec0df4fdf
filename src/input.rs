//! # Input Configuration Module
//!
//! Parses selection jobs from JSON or YAML files. A job names the model output
//! to read, the region to cut and an optional mask and output destination.
//!
//! ## Example Usage
//!
//! ```rust
//! use anhalyze::input::SelectionConfig;
//!
//! let json = r#"
//! {
//!   "data_path": "ANHA4-EPM111_y1998m04d05_gridT.nc",
//!   "variables": ["votemper"],
//!   "lat_range": [51.0, 54.7],
//!   "lon_range": [-82.5, -78.5],
//!   "depth_range": [0.0, 50.0]
//! }"#;
//! let config = SelectionConfig::from_json(json)?;
//! assert_eq!(config.variables, vec!["votemper".to_string()]);
//! # Ok::<(), anhalyze::AnhaError>(())
//! ```

use crate::error::{AnhaError, AnhaResult};
use crate::grid::GridDims;
use crate::mask::OCEAN_CODE;
use crate::range::SelectionRequest;
use crate::regions::Location;
use crate::resolver::DEFAULT_MAX_DISTANCE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_mask_variable() -> String {
    "tmask".to_string()
}

fn default_valid_codes() -> Vec<i32> {
    vec![OCEAN_CODE]
}

fn default_max_distance() -> f64 {
    DEFAULT_MAX_DISTANCE
}

/// A complete selection job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Model output file to subset
    pub data_path: PathBuf,
    /// File holding the grid coordinates, when not the data file itself
    #[serde(default)]
    pub grid_path: Option<PathBuf>,
    /// Mask file, e.g. `ANHA4_mask.nc`
    #[serde(default)]
    pub mask_path: Option<PathBuf>,
    #[serde(default = "default_mask_variable")]
    pub mask_variable: String,
    /// Mask codes kept as valid (ocean is `1`)
    #[serde(default = "default_valid_codes")]
    pub mask_valid_codes: Vec<i32>,
    /// Depth level of a 3-D mask to apply everywhere; the full mask when unset
    #[serde(default)]
    pub mask_level: Option<usize>,
    /// Variables to keep; all gridded variables when empty
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub lat_range: Option<(f64, f64)>,
    #[serde(default)]
    pub lon_range: Option<(f64, f64)>,
    #[serde(default)]
    pub depth_range: Option<(f64, f64)>,
    /// Named region preset, overridden by explicit lat/lon ranges
    #[serde(default)]
    pub region: Option<String>,
    /// Out-of-domain threshold in degrees
    #[serde(default = "default_max_distance")]
    pub max_distance: f64,
    #[serde(default)]
    pub grid_dims: Option<GridDims>,
    /// `.nc` or `.parquet` destination
    #[serde(default)]
    pub output_path: Option<PathBuf>,
}

impl SelectionConfig {
    pub fn new<P: Into<PathBuf>>(data_path: P) -> Self {
        SelectionConfig {
            data_path: data_path.into(),
            grid_path: None,
            mask_path: None,
            mask_variable: default_mask_variable(),
            mask_valid_codes: default_valid_codes(),
            mask_level: None,
            variables: Vec::new(),
            lat_range: None,
            lon_range: None,
            depth_range: None,
            region: None,
            max_distance: default_max_distance(),
            grid_dims: None,
            output_path: None,
        }
    }

    /// Loads a job from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> AnhaResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    pub fn from_json(json_str: &str) -> AnhaResult<Self> {
        serde_json::from_str(json_str).map_err(|e| AnhaError::Config(e.to_string()))
    }

    pub fn from_yaml(yaml_str: &str) -> AnhaResult<Self> {
        serde_yaml::from_str(yaml_str).map_err(|e| AnhaError::Config(e.to_string()))
    }

    pub fn to_json(&self) -> AnhaResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| AnhaError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> AnhaResult<String> {
        serde_yaml::to_string(self).map_err(|e| AnhaError::Config(e.to_string()))
    }

    pub fn dims(&self) -> GridDims {
        self.grid_dims.clone().unwrap_or_default()
    }

    /// The geographic request, with the region preset filling in any range
    /// not given explicitly.
    pub fn request(&self) -> AnhaResult<SelectionRequest> {
        let preset = match &self.region {
            Some(name) => Some(Location::by_name(name)?),
            None => None,
        };
        Ok(SelectionRequest {
            lat_range: self.lat_range.or(preset.as_ref().map(|l| l.lat_range)),
            lon_range: self.lon_range.or(preset.as_ref().map(|l| l.lon_range)),
            depth_range: self.depth_range,
        })
    }
}
