//! Named study regions with their map projection hints.

use crate::error::{AnhaError, AnhaResult};
use serde::{Deserialize, Serialize};

/// A geographic study region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub region: String,
    /// (south, north)
    pub lat_range: (f64, f64),
    /// (west, east)
    pub lon_range: (f64, f64),
    /// Lambert conformal standard parallels for maps of the region
    pub standard_parallels: (f64, f64),
    pub central_longitude: f64,
}

impl Location {
    pub fn hudson_bay() -> Self {
        Location {
            region: "HudsonBay".to_string(),
            lat_range: (50.0, 65.0),
            lon_range: (-93.0, -75.0),
            standard_parallels: (52.5, 62.5),
            central_longitude: -80.0,
        }
    }

    pub fn james_bay() -> Self {
        Location {
            region: "JamesBay".to_string(),
            lat_range: (51.0, 54.7),
            lon_range: (-82.5, -78.5),
            standard_parallels: (52.0, 53.0),
            central_longitude: -80.0,
        }
    }

    /// All presets.
    pub fn presets() -> Vec<Location> {
        vec![Self::hudson_bay(), Self::james_bay()]
    }

    /// Looks a preset up by name, ignoring case, spaces, `-` and `_`
    /// ("hudson-bay", "HudsonBay", "James Bay").
    pub fn by_name(name: &str) -> AnhaResult<Self> {
        let key = squash(name);
        Self::presets()
            .into_iter()
            .find(|l| squash(&l.region) == key)
            .ok_or_else(|| AnhaError::Config(format!("Unknown region '{}'", name)))
    }
}

fn squash(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
