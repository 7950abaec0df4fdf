//! # CLI Module
//!
//! Command-line interface for anhalyze:
//! - Argument parsing with clap
//! - Selection jobs from JSON/YAML files, overridden by flags
//! - `ANHALYZE_` environment fallbacks for every selection flag
//! - Subcommands for selection, point diagnostics, statistics, time series,
//!   inspection and shell completions

use crate::catalog::FileQuery;
use crate::input::SelectionConfig;
use crate::timeseries::Event;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Geographic and depth subsetting of ANHA/NEMO ocean-model output
#[derive(Parser, Debug)]
#[command(name = "anhalyze")]
#[command(about = "Subset ANHA/NEMO curvilinear model output by latitude, longitude and depth")]
#[command(version)]
#[command(long_about = "
anhalyze maps latitude/longitude/depth boxes onto the (row, col) index space of
ANHA/NEMO curvilinear grids, cuts every variable consistently and overlays
land/ocean masks.

EXAMPLES:
  # James Bay, top 50 m of temperature, masked, written to netCDF
  anhalyze select ANHA4-EPM111_y1998m04d05_gridT.nc --region james-bay \\
    --depth 0:50 -n votemper --mask ANHA4_mask.nc -o james_bay.nc

  # Nearest grid point diagnostics
  anhalyze resolve ANHA4-EPM111_y1998m04d05_gridT.nc --lat 55.3 --lon -77.7

  # Regional statistics
  anhalyze stats ANHA4-EPM111_y1998m04d05_gridT.nc -n votemper --region hudson-bay

  # Time series from $DATA_PATH
  anhalyze timeseries --years 1998,1999 -n votemper --region james-bay -o ts.parquet

  # Grid inspection
  anhalyze info ANHA4_mesh_mask.nc --output-format json
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output format for structured data
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Human)]
    pub output_format: OutputFormat,

    /// Selection file path (JSON or YAML)
    #[arg(short, long, global = true, env = "ANHALYZE_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Region, mask and variable flags shared by `select` and `stats`.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct SelectionArgs {
    /// Model output file
    #[arg(value_name = "DATA", env = "ANHALYZE_DATA")]
    pub data: Option<PathBuf>,

    /// File holding the grid coordinates, when not the data file
    #[arg(long, env = "ANHALYZE_GRID")]
    pub grid: Option<PathBuf>,

    /// Latitude range: min:max
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true, env = "ANHALYZE_LAT")]
    pub lat: Option<RangeArg>,

    /// Longitude range: min:max
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true, env = "ANHALYZE_LON")]
    pub lon: Option<RangeArg>,

    /// Depth range in metres: min:max
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true, env = "ANHALYZE_DEPTH")]
    pub depth: Option<RangeArg>,

    /// Named region preset (hudson-bay, james-bay)
    #[arg(long, env = "ANHALYZE_REGION")]
    pub region: Option<String>,

    /// Variable to keep (can be used multiple times)
    #[arg(short = 'n', long = "variable")]
    pub variables: Vec<String>,

    /// Mask file, e.g. ANHA4_mask.nc
    #[arg(long, env = "ANHALYZE_MASK")]
    pub mask: Option<PathBuf>,

    /// Mask variable name
    #[arg(long)]
    pub mask_variable: Option<String>,

    /// Apply one level of a 3-D mask at every depth
    #[arg(long)]
    pub mask_level: Option<usize>,

    /// Out-of-domain threshold in degrees
    #[arg(long, env = "ANHALYZE_MAX_DISTANCE")]
    pub max_distance: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Select a region and optionally write it out
    #[command(long_about = "
Select a latitude/longitude/depth box from a model output file.

The box is mapped to the smallest index rectangle containing its four
corners. Ranges partly outside the grid are clamped; ranges wholly outside are
an error. Flags override values from --config.

EXAMPLES:
  anhalyze select data.nc --lat 51:54.7 --lon -82.5:-78.5
  anhalyze select data.nc --region hudson-bay --depth 0:100 -o hudson.parquet -n votemper
  anhalyze select --config james_bay.yaml --dry-run
")]
    Select {
        #[command(flatten)]
        selection: SelectionArgs,

        /// Output path (.nc or .parquet)
        #[arg(short, long, env = "ANHALYZE_OUTPUT")]
        output: Option<PathBuf>,

        /// Validate and print the job without running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Find the grid cell nearest to a point
    Resolve {
        /// Model output or grid file
        file: PathBuf,

        /// Latitude in degrees north
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in degrees east
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Out-of-domain threshold in degrees
        #[arg(long)]
        max_distance: Option<f64>,
    },

    /// Masked statistics of one variable over a region
    Stats {
        #[command(flatten)]
        selection: SelectionArgs,
    },

    /// Regional statistics over a run's output files
    #[command(long_about = "
Build a time series of regional statistics, one row per output file.

Files are looked up in $DATA_PATH by year and grid; the mask defaults to
$MASK_PATH/<configuration>_mask.nc when --run is given and --mask is not.

EXAMPLES:
  anhalyze timeseries --years 1998 -n votemper --region james-bay -o ts.parquet
  anhalyze timeseries --years 1998,1999 --months 6,7,8 --one-per-month \\
    -n votemper --lat 51:54.7 --lon -82.5:-78.5 --extremes -o summer.parquet
")]
    Timeseries {
        /// Years to include
        #[arg(long, value_delimiter = ',', required = true)]
        years: Vec<i32>,

        /// Grid letter of the output files
        #[arg(long, default_value = "T")]
        grid_type: String,

        /// Months to include (all when omitted)
        #[arg(long, value_delimiter = ',')]
        months: Vec<u32>,

        /// Keep only the first file of each month
        #[arg(long)]
        one_per_month: bool,

        /// Run name such as ANHA4-EPM111
        #[arg(long, env = "ANHALYZE_RUN")]
        run: Option<String>,

        /// Variable to reduce
        #[arg(short = 'n', long)]
        variable: String,

        #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
        lat: Option<RangeArg>,

        #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
        lon: Option<RangeArg>,

        #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
        depth: Option<RangeArg>,

        #[arg(long)]
        region: Option<String>,

        /// Mask file
        #[arg(long)]
        mask: Option<PathBuf>,

        /// Add min and max columns
        #[arg(long)]
        extremes: bool,

        /// Add day-of-year climatology and category thresholds for an event
        #[arg(long, value_enum)]
        climatology: Option<Event>,

        /// Output Parquet file (prints the table when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show grid information about a netCDF file
    Info {
        /// NetCDF file path
        file: PathBuf,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish and PowerShell.

EXAMPLES:
  anhalyze completions bash > ~/.bash_completion.d/anhalyze
  anhalyze completions zsh -o _anhalyze
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
    /// CSV output (where applicable)
    Csv,
}

/// A `min:max` pair from the command line
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RangeArg {
    pub min: f64,
    pub max: f64,
}

impl From<RangeArg> for (f64, f64) {
    fn from(arg: RangeArg) -> Self {
        (arg.min, arg.max)
    }
}

/// Parse a range from a command line argument
/// Format: min:max, with min <= max
pub fn parse_range(s: &str) -> Result<RangeArg, String> {
    let parts: Vec<&str> = s.split(':').collect();
    if parts.len() != 2 {
        return Err("Range must be in format 'min:max'".to_string());
    }

    let min = parts[0]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid minimum value in range")?;
    let max = parts[1]
        .trim()
        .parse::<f64>()
        .map_err(|_| "Invalid maximum value in range")?;

    if min.is_nan() || max.is_nan() {
        return Err("Range bounds must be numbers".to_string());
    }
    if min > max {
        return Err("Minimum value must not exceed maximum value".to_string());
    }

    Ok(RangeArg { min, max })
}

impl SelectionArgs {
    /// Builds the selection job: the config file (if any) first, then every
    /// flag given on the command line on top of it.
    pub fn to_config(&self, config_file: Option<&Path>) -> Result<SelectionConfig, String> {
        let mut config = match config_file {
            Some(path) => SelectionConfig::from_file(path)
                .map_err(|e| format!("Failed to load {}: {}", path.display(), e))?,
            None => {
                let data = self
                    .data
                    .clone()
                    .ok_or("A data file is required, either as argument or in --config")?;
                SelectionConfig::new(data)
            }
        };

        if let Some(data) = &self.data {
            config.data_path = data.clone();
        }
        if let Some(grid) = &self.grid {
            config.grid_path = Some(grid.clone());
        }
        if let Some(lat) = self.lat {
            config.lat_range = Some(lat.into());
        }
        if let Some(lon) = self.lon {
            config.lon_range = Some(lon.into());
        }
        if let Some(depth) = self.depth {
            config.depth_range = Some(depth.into());
        }
        if let Some(region) = &self.region {
            config.region = Some(region.clone());
        }
        if !self.variables.is_empty() {
            config.variables = self.variables.clone();
        }
        if let Some(mask) = &self.mask {
            config.mask_path = Some(mask.clone());
        }
        if let Some(variable) = &self.mask_variable {
            config.mask_variable = variable.clone();
        }
        if let Some(level) = self.mask_level {
            config.mask_level = Some(level);
        }
        if let Some(max_distance) = self.max_distance {
            if !(max_distance > 0.0) {
                return Err("--max-distance must be positive".to_string());
            }
            config.max_distance = max_distance;
        }

        Ok(config)
    }
}

/// File query of the `timeseries` command.
pub fn file_query(years: &[i32], grid: &str, months: &[u32], one_per_month: bool) -> Result<FileQuery, String> {
    if let Some(month) = months.iter().find(|m| !(1..=12).contains(*m)) {
        return Err(format!("Invalid month {}", month));
    }
    Ok(FileQuery {
        years: years.to_vec(),
        grid: grid.to_string(),
        months: months.to_vec(),
        one_per_month,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_range() {
        let range = parse_range("51:54.7").unwrap();
        assert_eq!(range.min, 51.0);
        assert_eq!(range.max, 54.7);

        let range = parse_range("-82.5:-78.5").unwrap();
        assert_eq!((range.min, range.max), (-82.5, -78.5));

        // Degenerate ranges are a single point
        assert!(parse_range("10:10").is_ok());

        assert!(parse_range("10").is_err());
        assert!(parse_range("1:2:3").is_err());
        assert!(parse_range("abc:10").is_err());
        assert!(parse_range("20:10").is_err());
        assert!(parse_range("NaN:10").is_err());
    }

    #[test]
    fn test_to_config_requires_data() {
        let args = SelectionArgs::default();
        assert!(args.to_config(None).is_err());
    }

    #[test]
    fn test_to_config_from_flags() {
        let args = SelectionArgs {
            data: Some(PathBuf::from("data.nc")),
            lat: Some(RangeArg { min: 51.0, max: 54.7 }),
            depth: Some(RangeArg { min: 0.0, max: 50.0 }),
            variables: vec!["votemper".to_string()],
            max_distance: Some(0.5),
            ..Default::default()
        };
        let config = args.to_config(None).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data.nc"));
        assert_eq!(config.lat_range, Some((51.0, 54.7)));
        assert_eq!(config.lon_range, None);
        assert_eq!(config.depth_range, Some((0.0, 50.0)));
        assert_eq!(config.variables, vec!["votemper".to_string()]);
        assert_eq!(config.max_distance, 0.5);
        assert_eq!(config.mask_variable, "tmask");
    }

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "data_path: from_file.nc\nlat_range: [50.0, 65.0]\nlon_range: [-93.0, -75.0]\nvariables: [vosaline]"
        )
        .unwrap();

        let args = SelectionArgs {
            lat: Some(RangeArg { min: 51.0, max: 54.7 }),
            ..Default::default()
        };
        let config = args.to_config(Some(file.path())).unwrap();
        assert_eq!(config.data_path, PathBuf::from("from_file.nc"));
        assert_eq!(config.lat_range, Some((51.0, 54.7)));
        assert_eq!(config.lon_range, Some((-93.0, -75.0)));
        assert_eq!(config.variables, vec!["vosaline".to_string()]);
    }

    #[test]
    fn test_invalid_max_distance() {
        let args = SelectionArgs {
            data: Some(PathBuf::from("data.nc")),
            max_distance: Some(0.0),
            ..Default::default()
        };
        assert!(args.to_config(None).is_err());
    }

    #[test]
    fn test_file_query_months() {
        let query = file_query(&[1998], "T", &[6, 7], true).unwrap();
        assert_eq!(query.months, vec![6, 7]);
        assert!(query.one_per_month);
        assert!(file_query(&[1998], "T", &[13], false).is_err());
    }
}
