//! # CLI Integration Tests
//!
//! Argument parsing for every subcommand, global flags and the validation
//! errors clap reports before anything is run.

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap_complete::Shell;
    use std::path::PathBuf;

    use crate::cli::{Cli, Commands, OutputFormat, RangeArg};
    use crate::timeseries::Event;

    #[test]
    fn test_cli_help() {
        let result = Cli::try_parse_from(["anhalyze", "--help"]);
        assert!(result.is_err()); // --help exits early

        let error = result.unwrap_err();
        assert!(error
            .to_string()
            .contains("Subset ANHA/NEMO curvilinear model output"));
    }

    #[test]
    fn test_cli_version() {
        let result = Cli::try_parse_from(["anhalyze", "--version"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "anhalyze",
            "--verbose",
            "--output-format",
            "json",
            "--config",
            "/path/to/james_bay.yaml",
            "info",
            "ANHA4_mesh_mask.nc",
        ]);

        assert!(cli.verbose);
        assert!(!cli.quiet);
        assert_eq!(cli.output_format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/james_bay.yaml")));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["anhalyze", "info", "grid.nc", "--quiet", "--output-format", "yaml"]);
        assert!(cli.quiet);
        assert_eq!(cli.output_format, OutputFormat::Yaml);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = Cli::try_parse_from(["anhalyze", "-v", "-q", "info", "grid.nc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_output_format() {
        let result = Cli::try_parse_from(["anhalyze", "--output-format", "xml", "info", "grid.nc"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_select_command_basic() {
        let cli = Cli::parse_from([
            "anhalyze",
            "select",
            "ANHA4-EPM111_y1998m04d05_gridT.nc",
            "--lat",
            "51:54.7",
            "--lon",
            "-82.5:-78.5",
            "-n",
            "votemper",
            "-n",
            "vosaline",
            "-o",
            "james_bay.nc",
        ]);

        if let Commands::Select {
            selection,
            output,
            dry_run,
        } = &cli.command
        {
            assert_eq!(
                selection.data,
                Some(PathBuf::from("ANHA4-EPM111_y1998m04d05_gridT.nc"))
            );
            assert_eq!(selection.lat, Some(RangeArg { min: 51.0, max: 54.7 }));
            assert_eq!(selection.lon, Some(RangeArg { min: -82.5, max: -78.5 }));
            assert_eq!(selection.depth, None);
            assert_eq!(selection.variables, vec!["votemper", "vosaline"]);
            assert_eq!(output, &Some(PathBuf::from("james_bay.nc")));
            assert!(!dry_run);
        } else {
            panic!("Expected Select command");
        }
    }

    #[test]
    fn test_select_command_with_mask() {
        let cli = Cli::parse_from([
            "anhalyze",
            "select",
            "data.nc",
            "--region",
            "james-bay",
            "--depth",
            "0:50",
            "--mask",
            "ANHA4_mask.nc",
            "--mask-variable",
            "umask",
            "--mask-level",
            "0",
            "--max-distance",
            "0.25",
            "--dry-run",
        ]);

        if let Commands::Select {
            selection, dry_run, ..
        } = &cli.command
        {
            assert_eq!(selection.region.as_deref(), Some("james-bay"));
            assert_eq!(selection.depth, Some(RangeArg { min: 0.0, max: 50.0 }));
            assert_eq!(selection.mask, Some(PathBuf::from("ANHA4_mask.nc")));
            assert_eq!(selection.mask_variable.as_deref(), Some("umask"));
            assert_eq!(selection.mask_level, Some(0));
            assert_eq!(selection.max_distance, Some(0.25));
            assert!(*dry_run);

            let config = selection.to_config(None).unwrap();
            assert_eq!(config.request().unwrap().lat_range, Some((51.0, 54.7)));
        } else {
            panic!("Expected Select command");
        }
    }

    #[test]
    fn test_select_range_validation() {
        for bad in ["60:50", "abc", "1:2:3", "north:south"] {
            let result = Cli::try_parse_from(["anhalyze", "select", "data.nc", "--lat", bad]);
            assert!(result.is_err(), "'{}' should be rejected", bad);
        }
    }

    #[test]
    fn test_resolve_command() {
        let cli = Cli::parse_from([
            "anhalyze",
            "resolve",
            "grid.nc",
            "--lat",
            "55.3",
            "--lon",
            "-77.7",
        ]);

        if let Commands::Resolve {
            file,
            lat,
            lon,
            max_distance,
        } = &cli.command
        {
            assert_eq!(file, &PathBuf::from("grid.nc"));
            assert_eq!(*lat, 55.3);
            assert_eq!(*lon, -77.7);
            assert_eq!(*max_distance, None);
        } else {
            panic!("Expected Resolve command");
        }
    }

    #[test]
    fn test_resolve_requires_coordinates() {
        let result = Cli::try_parse_from(["anhalyze", "resolve", "grid.nc", "--lat", "55.3"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_stats_command() {
        let cli = Cli::parse_from([
            "anhalyze",
            "stats",
            "data.nc",
            "-n",
            "votemper",
            "--region",
            "hudson-bay",
        ]);

        if let Commands::Stats { selection } = &cli.command {
            assert_eq!(selection.variables, vec!["votemper"]);
            assert_eq!(selection.region.as_deref(), Some("hudson-bay"));
        } else {
            panic!("Expected Stats command");
        }
    }

    #[test]
    fn test_timeseries_command() {
        let cli = Cli::parse_from([
            "anhalyze",
            "timeseries",
            "--years",
            "1998,1999",
            "--months",
            "6,7,8",
            "--one-per-month",
            "--run",
            "ANHA4-EPM111",
            "-n",
            "votemper",
            "--lat",
            "51:54.7",
            "--extremes",
            "-o",
            "summer.parquet",
        ]);

        if let Commands::Timeseries {
            years,
            grid_type,
            months,
            one_per_month,
            run,
            variable,
            lat,
            lon,
            extremes,
            climatology,
            output,
            ..
        } = &cli.command
        {
            assert_eq!(years, &vec![1998, 1999]);
            assert_eq!(grid_type, "T");
            assert_eq!(months, &vec![6, 7, 8]);
            assert!(*one_per_month);
            assert_eq!(run.as_deref(), Some("ANHA4-EPM111"));
            assert_eq!(variable, "votemper");
            assert_eq!(lat, &Some(RangeArg { min: 51.0, max: 54.7 }));
            assert_eq!(lon, &None);
            assert!(*extremes);
            assert_eq!(climatology, &None);
            assert_eq!(output, &Some(PathBuf::from("summer.parquet")));
        } else {
            panic!("Expected Timeseries command");
        }
    }

    #[test]
    fn test_timeseries_climatology() {
        let cli = Cli::parse_from([
            "anhalyze", "timeseries", "--years", "2000,2001", "-n", "votemper", "--climatology", "cold-spell",
        ]);
        if let Commands::Timeseries { climatology, .. } = &cli.command {
            assert_eq!(climatology, &Some(Event::ColdSpell));
        } else {
            panic!("Expected Timeseries command");
        }

        let result = Cli::try_parse_from([
            "anhalyze", "timeseries", "--years", "2000", "-n", "votemper", "--climatology", "monsoon",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_timeseries_requires_years_and_variable() {
        let result = Cli::try_parse_from(["anhalyze", "timeseries", "-n", "votemper"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["anhalyze", "timeseries", "--years", "1998"]);
        assert!(result.is_err());

        let result = Cli::try_parse_from(["anhalyze", "timeseries", "--years", "nineteen", "-n", "votemper"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_info_command() {
        let cli = Cli::parse_from(["anhalyze", "info", "ANHA4_mesh_mask.nc"]);
        if let Commands::Info { file } = &cli.command {
            assert_eq!(file, &PathBuf::from("ANHA4_mesh_mask.nc"));
        } else {
            panic!("Expected Info command");
        }
    }

    #[test]
    fn test_completions_command() {
        let cli = Cli::parse_from(["anhalyze", "completions", "zsh", "-o", "_anhalyze"]);
        if let Commands::Completions { shell, output } = &cli.command {
            assert_eq!(*shell, Shell::Zsh);
            assert_eq!(output, &Some(PathBuf::from("_anhalyze")));
        } else {
            panic!("Expected Completions command");
        }

        let result = Cli::try_parse_from(["anhalyze", "completions", "tcsh"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_subcommand() {
        let result = Cli::try_parse_from(["anhalyze"]);
        assert!(result.is_err());
    }
}
