use anhalyze::catalog::{DataPaths, RunName};
use anhalyze::cli::{file_query, Cli, Commands, OutputFormat, SelectionArgs};
use anhalyze::info::{grid_info, print_grid_info_csv, print_grid_info_human, print_grid_info_json, print_grid_info_yaml};
use anhalyze::log::{
    config_echo, show_farewell_with_timing, show_greeting, show_point, show_selection_summary,
    show_statistics,
};
use anhalyze::extract::read_mask_field;
use anhalyze::output::write_dataframe_to_parquet;
use anhalyze::timeseries::{build_timeseries, climatology, Event, TimeseriesOptions};
use anhalyze::regions::Location;
use anhalyze::{run_selection, GridDims, LinearScanResolver, PointResolver, SelectionRequest};
use anyhow::{anyhow, bail, Context, Result};
use clap::{CommandFactory, Parser};
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    match &cli.command {
        Commands::Select {
            selection,
            output,
            dry_run,
        } => run_select(&cli, selection, output.as_ref(), *dry_run),
        Commands::Resolve {
            file,
            lat,
            lon,
            max_distance,
        } => run_resolve(&cli, file, *lat, *lon, *max_distance),
        Commands::Stats { selection } => run_stats(&cli, selection),
        Commands::Timeseries {
            years,
            grid_type,
            months,
            one_per_month,
            run,
            variable,
            lat,
            lon,
            depth,
            region,
            mask,
            extremes,
            climatology,
            output,
        } => {
            let query = file_query(years, grid_type, months, *one_per_month).map_err(|e| anyhow!(e))?;
            let preset = region.as_deref().map(Location::by_name).transpose()?;
            let request = SelectionRequest {
                lat_range: lat.map(|r| (r.min, r.max)).or(preset.as_ref().map(|l| l.lat_range)),
                lon_range: lon.map(|r| (r.min, r.max)).or(preset.as_ref().map(|l| l.lon_range)),
                depth_range: depth.map(|r| (r.min, r.max)),
            };
            run_timeseries(
                &cli,
                query,
                run.as_deref(),
                variable,
                request,
                mask.as_ref(),
                *extremes,
                *climatology,
                output.as_ref(),
            )
        }
        Commands::Info { file } => run_info(&cli, file),
        Commands::Completions { shell, output } => {
            let mut command = Cli::command();
            match output {
                Some(path) => {
                    let mut file = File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    clap_complete::generate(*shell, &mut command, "anhalyze", &mut file);
                }
                None => clap_complete::generate(*shell, &mut command, "anhalyze", &mut io::stdout()),
            }
            Ok(())
        }
    }
}

fn init_logging(cli: &Cli) {
    let level = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn human(cli: &Cli) -> bool {
    !cli.quiet && cli.output_format == OutputFormat::Human
}

fn run_select(cli: &Cli, selection: &SelectionArgs, output: Option<&PathBuf>, dry_run: bool) -> Result<()> {
    let start_time = Instant::now();
    let mut config = selection
        .to_config(cli.config.as_deref())
        .map_err(|e| anyhow!(e))?;
    if let Some(output) = output {
        config.output_path = Some(output.clone());
    }

    if human(cli) {
        show_greeting(
            &cli.config
                .as_ref()
                .map_or_else(|| "command line".to_string(), |p| p.display().to_string()),
        );
        config_echo(&config);
    }
    if dry_run {
        config.request().context("Invalid selection")?;
        info!("Dry run, selection not executed");
        return Ok(());
    }

    let view = run_selection(&config).context("Selection failed")?;

    match cli.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view.resolution())?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&view.resolution())?),
        OutputFormat::Csv => {
            let r = view.index_range();
            println!("row_start,row_end,col_start,col_end");
            println!(
                "{},{},{},{}",
                r.row_range.start, r.row_range.end, r.col_range.start, r.col_range.end
            );
        }
        OutputFormat::Human if !cli.quiet => {
            show_selection_summary(&view);
            show_farewell_with_timing(start_time.elapsed());
        }
        OutputFormat::Human => {}
    }
    Ok(())
}

fn run_resolve(cli: &Cli, file: &Path, lat: f64, lon: f64, max_distance: Option<f64>) -> Result<()> {
    let dims = GridDims::default();
    let (latitude, longitude, depth) = anhalyze::extract::read_grid_fields(file, &dims)
        .with_context(|| format!("Failed to read grid from {}", file.display()))?;
    let store = anhalyze::GridIndexStore::load(latitude, longitude, depth)?;
    let resolver = LinearScanResolver::new(max_distance.unwrap_or(anhalyze::resolver::DEFAULT_MAX_DISTANCE));
    let point = resolver.resolve_point(&store, lat, lon)?;
    let coordinate = store.coordinate(point.row, point.col);

    match cli.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&point)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&point)?),
        OutputFormat::Csv => {
            println!("row,col,nav_lat,nav_lon,distance");
            println!(
                "{},{},{},{},{}",
                point.row, point.col, coordinate.0, coordinate.1, point.distance
            );
        }
        OutputFormat::Human => show_point(lat, lon, &point, coordinate),
    }
    Ok(())
}

fn run_stats(cli: &Cli, selection: &SelectionArgs) -> Result<()> {
    let config = selection
        .to_config(cli.config.as_deref())
        .map_err(|e| anyhow!(e))?;
    let [name] = config.variables.as_slice() else {
        bail!("stats needs exactly one variable, use -n");
    };
    let name = name.clone();

    let mut config = config;
    config.output_path = None;
    let view = run_selection(&config).context("Selection failed")?;
    let stats = view.statistics(&name)?;

    match cli.output_format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&stats)?),
        OutputFormat::Csv => {
            println!("variable,count,mean,std,min,max");
            println!(
                "{},{},{},{},{},{}",
                name, stats.count, stats.mean, stats.std, stats.min, stats.max
            );
        }
        OutputFormat::Human => show_statistics(&name, &stats),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_timeseries(
    cli: &Cli,
    query: anhalyze::catalog::FileQuery,
    run: Option<&str>,
    variable: &str,
    request: SelectionRequest,
    mask: Option<&PathBuf>,
    with_extremes: bool,
    event: Option<Event>,
    output: Option<&PathBuf>,
) -> Result<()> {
    let start_time = Instant::now();
    let paths = DataPaths::from_env()?;
    let files = query.list(&paths.data_path)?;
    if files.is_empty() {
        bail!("No files match {:?} in {}", query, paths.data_path.display());
    }
    debug!("{} files selected", files.len());

    let mask_path = match (mask, run) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(run)) => Some(paths.mask_file(RunName::parse(run)?.configuration())),
        (None, None) => None,
    };
    let mut options = TimeseriesOptions::new(variable, request);
    options.with_extremes = with_extremes;
    options.show_progress = human(cli);
    if let Some(path) = &mask_path {
        options.mask = Some(
            read_mask_field(path, "tmask", None, &[anhalyze::mask::OCEAN_CODE])
                .with_context(|| format!("Failed to read mask {}", path.display()))?,
        );
    }

    let mut df = build_timeseries(&files, None, &options)?;
    if let Some(event) = event {
        df = climatology(&df, event)?;
    }
    match output {
        Some(path) => {
            write_dataframe_to_parquet(&mut df, path)?;
            info!("Wrote {} rows to {}", df.height(), path.display());
        }
        None => println!("{}", df),
    }
    if human(cli) {
        show_farewell_with_timing(start_time.elapsed());
    }
    Ok(())
}

fn run_info(cli: &Cli, file: &Path) -> Result<()> {
    let info = grid_info(file, &GridDims::default())?;
    match cli.output_format {
        OutputFormat::Human => print_grid_info_human(&info),
        OutputFormat::Json => print_grid_info_json(&info)?,
        OutputFormat::Yaml => print_grid_info_yaml(&info)?,
        OutputFormat::Csv => print_grid_info_csv(&info),
    }
    Ok(())
}
