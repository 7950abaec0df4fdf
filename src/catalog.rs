//! # Run Catalog
//!
//! Locates ANHA model output on disk. Output files follow the pattern
//! `ANHA4-EPM111_y1998m04d05_gridT.nc`: run name, a date stamp and the grid
//! the variables live on.

use crate::error::{AnhaError, AnhaResult};
use chrono::{Datelike, NaiveDate};
use log::{debug, warn};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable naming the model output directory.
pub const DATA_PATH_ENV: &str = "DATA_PATH";
/// Environment variable naming the mask directory.
pub const MASK_PATH_ENV: &str = "MASK_PATH";

/// Standard data and mask directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub data_path: PathBuf,
    pub mask_path: PathBuf,
}

impl DataPaths {
    /// Reads `DATA_PATH` and `MASK_PATH`.
    pub fn from_env() -> AnhaResult<Self> {
        let read = |key: &str| {
            env::var(key)
                .map(PathBuf::from)
                .map_err(|_| AnhaError::MissingEnv(key.to_string()))
        };
        Ok(DataPaths {
            data_path: read(DATA_PATH_ENV)?,
            mask_path: read(MASK_PATH_ENV)?,
        })
    }

    /// The configuration-wide mask file, e.g. `<MASK_PATH>/ANHA4_mask.nc`.
    pub fn mask_file(&self, configuration: &str) -> PathBuf {
        self.mask_path.join(format!("{}_mask.nc", configuration))
    }
}

/// A simulation name such as `ANHA4-WJM004`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunName {
    name: String,
}

impl RunName {
    pub fn parse(name: &str) -> AnhaResult<Self> {
        let valid = name.contains('-') && name.contains("ANHA") && name.len() == "ANHA4-WJM000".len();
        if !valid {
            return Err(AnhaError::InvalidRunName(name.to_string()));
        }
        Ok(RunName {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// Model configuration, e.g. `ANHA4`.
    pub fn configuration(&self) -> &str {
        self.name.split('-').next().unwrap_or_default()
    }

    /// Experiment code, e.g. `WJM004`.
    pub fn experiment(&self) -> &str {
        self.name.split('-').nth(1).unwrap_or_default()
    }

    /// Initials of the experiment's author, e.g. `JM`.
    pub fn user_initials(&self) -> String {
        self.experiment().chars().skip(1).take(2).collect::<String>().to_uppercase()
    }
}

/// The raw date stamp of an output file, e.g. `y1998m04d05`.
pub fn date_stamp(filename: &str) -> AnhaResult<&str> {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename);
    let parts: Vec<&str> = base.split('_').collect();
    if parts.len() < 2 {
        return Err(AnhaError::InvalidFilename(filename.to_string()));
    }
    Ok(parts[parts.len() - 2])
}

/// Parses the date of an output file from its name.
pub fn file_date(filename: &str) -> AnhaResult<NaiveDate> {
    let stamp = date_stamp(filename)?;
    let invalid = || AnhaError::InvalidFilename(filename.to_string());
    let field = |range: std::ops::Range<usize>| -> AnhaResult<u32> {
        stamp
            .get(range)
            .and_then(|s| s.parse().ok())
            .ok_or_else(invalid)
    };

    if !stamp.starts_with('y') || stamp.len() != "y1998m04d05".len() {
        return Err(invalid());
    }
    let (year, month, day) = (field(1..5)?, field(6..8)?, field(9..11)?);
    NaiveDate::from_ymd_opt(year as i32, month, day).ok_or_else(invalid)
}

/// Partial access to a file date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatePart {
    /// `yyyymmdd` as one number, e.g. `19980405`
    Ymd,
    Year,
    Month,
}

impl DatePart {
    pub fn of(self, filename: &str) -> AnhaResult<u32> {
        let date = file_date(filename)?;
        Ok(match self {
            DatePart::Ymd => date.year() as u32 * 10_000 + date.month() * 100 + date.day(),
            DatePart::Year => date.year() as u32,
            DatePart::Month => date.month(),
        })
    }
}

/// Selects output files by year, grid and month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    pub years: Vec<i32>,
    /// Grid letter: `T`, `U`, `V`, `B`...
    pub grid: String,
    /// Months to keep; every month when empty
    pub months: Vec<u32>,
    /// Keep only the first file of each month
    pub one_per_month: bool,
}

impl Default for FileQuery {
    fn default() -> Self {
        FileQuery {
            years: vec![1998],
            grid: "T".to_string(),
            months: Vec::new(),
            one_per_month: false,
        }
    }
}

impl FileQuery {
    /// Matching files in `dir`, sorted by name within each year.
    pub fn list<P: AsRef<Path>>(&self, dir: P) -> AnhaResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        let mut names = Vec::new();
        for entry in fs::read_dir(dir)? {
            if let Some(name) = entry?.file_name().to_str() {
                names.push(name.to_string());
            }
        }

        let grid_tag = format!("_grid{}", self.grid);
        let mut selected = Vec::new();
        for year in &self.years {
            let year_tag = format!("_y{}", year);
            let mut matching: Vec<&String> = names
                .iter()
                .filter(|n| n.contains(&year_tag) && n.contains(&grid_tag))
                .collect();
            matching.sort();
            selected.extend(matching.into_iter().cloned());
        }

        let selected = if self.one_per_month {
            self.first_of_each_month(&selected)
        } else if !self.months.is_empty() {
            selected
                .into_iter()
                .filter(|name| {
                    self.years.iter().any(|&y| {
                        self.months
                            .iter()
                            .any(|&m| name.contains(&month_stamp(y, m)))
                    })
                })
                .collect()
        } else {
            selected
        };

        debug!("{} files match {:?} in {}", selected.len(), self, dir.display());
        Ok(selected.into_iter().map(|name| dir.join(name)).collect())
    }

    fn first_of_each_month(&self, selected: &[String]) -> Vec<String> {
        let months = if self.months.is_empty() {
            let mut seen = Vec::new();
            for name in selected {
                if let Ok(date) = file_date(name) {
                    if !seen.contains(&date.month()) {
                        seen.push(date.month());
                    }
                }
            }
            seen
        } else {
            self.months.clone()
        };

        let mut firsts = Vec::new();
        for &year in &self.years {
            for &month in &months {
                let stamp = month_stamp(year, month);
                match selected.iter().find(|name| name.contains(&stamp)) {
                    Some(name) => firsts.push(name.clone()),
                    None => warn!("No file for {}", stamp),
                }
            }
        }
        firsts
    }
}

fn month_stamp(year: i32, month: u32) -> String {
    format!("y{}m{:02}", year, month)
}
