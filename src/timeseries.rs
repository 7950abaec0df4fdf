//! # Regional Time Series
//!
//! Reduces a sequence of model output files to one row per file: the date
//! parsed from the file name and summary statistics of one variable over a
//! fixed region. The grid is read and the region resolved once, then shared
//! by every file.
//!
//! [`climatology`] extends a multi-year series with day-of-year means,
//! percentiles and the marine heat wave / cold spell category thresholds.

use crate::catalog::file_date;
use crate::dataset::Dataset;
use crate::error::{AnhaError, AnhaResult};
use crate::extract::{read_data_fields, read_grid_fields};
use crate::grid::{GridDims, GridIndexStore};
use crate::mask::MaskField;
use crate::range::{resolve_box_detailed, SelectionRequest};
use crate::resolver::LinearScanResolver;
use chrono::{Datelike, NaiveDate};
use clap::ValueEnum;
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// What to reduce and how.
#[derive(Debug, Clone)]
pub struct TimeseriesOptions {
    pub variable: String,
    pub request: SelectionRequest,
    pub dims: GridDims,
    /// Full-grid mask applied before reducing
    pub mask: Option<MaskField>,
    /// Adds `var_min` and `var_max` columns
    pub with_extremes: bool,
    pub max_distance: f64,
    pub show_progress: bool,
}

impl TimeseriesOptions {
    pub fn new(variable: &str, request: SelectionRequest) -> Self {
        TimeseriesOptions {
            variable: variable.to_string(),
            request,
            dims: GridDims::default(),
            mask: None,
            with_extremes: false,
            max_distance: crate::resolver::DEFAULT_MAX_DISTANCE,
            show_progress: false,
        }
    }
}

/// Builds a DataFrame with columns `date` (`YYYY-MM-DD`), `var_mean`,
/// `var_std` and optionally `var_min`, `var_max`, one row per file in the
/// order of `files`.
///
/// Coordinates come from `grid_path`, or from the first file when `None`.
pub fn build_timeseries(
    files: &[PathBuf],
    grid_path: Option<&Path>,
    options: &TimeseriesOptions,
) -> AnhaResult<DataFrame> {
    let first = files
        .first()
        .ok_or_else(|| AnhaError::Config("No input files for the time series".to_string()))?;
    let grid_path = grid_path.unwrap_or(first.as_path());

    info!("Loading grid from {}", grid_path.display());
    let (latitude, longitude, depth) = read_grid_fields(grid_path, &options.dims)?;
    let store = Arc::new(GridIndexStore::load(latitude, longitude, depth)?);
    let resolver = LinearScanResolver::new(options.max_distance);
    let resolution = resolve_box_detailed(&store, &resolver, &options.request)?;
    debug!("Time series region is {}", resolution.index_range);

    let progress = if options.show_progress {
        let bar = ProgressBar::new(files.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("##-"),
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let variables = [options.variable.clone()];
    let mut dates = Vec::with_capacity(files.len());
    let mut means = Vec::with_capacity(files.len());
    let mut stds = Vec::with_capacity(files.len());
    let mut mins = Vec::with_capacity(files.len());
    let mut maxs = Vec::with_capacity(files.len());

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        progress.set_message(name.to_string());
        let date = file_date(name)?;

        let fields = read_data_fields(path, &options.dims, &variables)?;
        let dataset = Dataset::new(Arc::clone(&store), options.dims.clone(), fields)
            .with_resolver(resolver);
        let mut view = dataset.select_resolved(&resolution)?;
        if let Some(mask) = &options.mask {
            view = view.apply_grid_mask(mask)?;
        }
        let stats = view.statistics(&options.variable)?;
        debug!("{}: mean {:.4} over {} values", date, stats.mean, stats.count);

        dates.push(date.format("%Y-%m-%d").to_string());
        means.push(stats.mean);
        stds.push(stats.std);
        mins.push(stats.min);
        maxs.push(stats.max);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let mut columns: Vec<Column> = vec![
        Series::new("date".into(), dates).into(),
        Series::new("var_mean".into(), means).into(),
        Series::new("var_std".into(), stds).into(),
    ];
    if options.with_extremes {
        columns.push(Series::new("var_min".into(), mins).into());
        columns.push(Series::new("var_max".into(), maxs).into());
    }
    info!("Built time series of '{}' over {} files", options.variable, files.len());
    Ok(DataFrame::new(columns)?)
}

/// Extreme event whose category thresholds [`climatology`] derives.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Event {
    /// Warm extremes, thresholds above the 90th percentile
    HeatWave,
    /// Cold extremes, thresholds below the 10th percentile
    ColdSpell,
}

impl Event {
    pub fn quantile(self) -> f64 {
        match self {
            Event::HeatWave => 0.9,
            Event::ColdSpell => 0.1,
        }
    }
}

/// Multiples of the percentile distance used as event categories.
pub const EVENT_CATEGORIES: [u32; 3] = [2, 3, 4];

/// Adds a day-of-year climatology and event thresholds to a time series
/// built by [`build_timeseries`].
///
/// Every date is folded onto the leap year 2000 as `wrap_day` (`2000-MM-DD`),
/// and alongside `year`, `month` and `day` the result gains, per `wrap_day`
/// over all years:
///
/// - `var_mean_mean`: mean of `var_mean`
/// - `var_mean_quantile`: the event's percentile of `var_mean`, linearly
///   interpolated
/// - `var_mean_{n}T` for n in [`EVENT_CATEGORIES`]: `n` times the distance
///   between the two, above the mean for heat waves and below it for cold
///   spells
///
/// Rows keep their input order.
pub fn climatology(df: &DataFrame, event: Event) -> AnhaResult<DataFrame> {
    let dates = df.column("date")?.as_materialized_series().str()?;

    let mut years = Vec::with_capacity(df.height());
    let mut months = Vec::with_capacity(df.height());
    let mut days = Vec::with_capacity(df.height());
    let mut wrap_days = Vec::with_capacity(df.height());
    for value in dates.into_iter() {
        let text = value.ok_or_else(|| AnhaError::Config("Time series has a missing date".to_string()))?;
        let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .map_err(|e| AnhaError::Config(format!("Invalid date '{}' in time series: {}", text, e)))?;
        years.push(date.year());
        months.push(date.month());
        days.push(date.day());
        wrap_days.push(format!("2000-{:02}-{:02}", date.month(), date.day()));
    }

    let mut frame = df.clone();
    frame.with_column(Series::new("year".into(), years))?;
    frame.with_column(Series::new("month".into(), months))?;
    frame.with_column(Series::new("day".into(), days))?;
    frame.with_column(Series::new("wrap_day".into(), wrap_days.clone()))?;

    let grouped = frame
        .clone()
        .lazy()
        .group_by([col("wrap_day")])
        .agg([
            col("var_mean").mean().alias("var_mean_mean"),
            col("var_mean")
                .quantile(lit(event.quantile()), QuantileMethod::Linear)
                .alias("var_mean_quantile"),
        ])
        .collect()?;
    debug!("Climatology over {} days of the year", grouped.height());

    let keys = grouped.column("wrap_day")?.as_materialized_series().str()?;
    let means = grouped.column("var_mean_mean")?.as_materialized_series().f64()?;
    let quantiles = grouped.column("var_mean_quantile")?.as_materialized_series().f64()?;
    let by_day: HashMap<&str, (Option<f64>, Option<f64>)> = keys
        .into_iter()
        .zip(means.into_iter().zip(quantiles.into_iter()))
        .filter_map(|(key, values)| key.map(|key| (key, values)))
        .collect();

    let lookup = |pick: fn(&(Option<f64>, Option<f64>)) -> Option<f64>| -> Vec<Option<f64>> {
        wrap_days
            .iter()
            .map(|day| by_day.get(day.as_str()).and_then(pick))
            .collect()
    };
    frame.with_column(Series::new("var_mean_mean".into(), lookup(|v| v.0)))?;
    frame.with_column(Series::new("var_mean_quantile".into(), lookup(|v| v.1)))?;

    let (delta, sign) = match event {
        Event::HeatWave => (col("var_mean_quantile") - col("var_mean_mean"), 1.0),
        Event::ColdSpell => (col("var_mean_mean") - col("var_mean_quantile"), -1.0),
    };
    let thresholds: Vec<Expr> = EVENT_CATEGORIES
        .iter()
        .map(|&n| {
            (col("var_mean_mean") + lit(sign * n as f64) * delta.clone())
                .alias(format!("var_mean_{}T", n))
        })
        .collect();

    info!("Computed {:?} climatology over {} rows", event, frame.height());
    Ok(frame.lazy().with_columns(thresholds).collect()?)
}
