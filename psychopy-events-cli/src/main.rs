//! PsychoPy Events CLI Application
//!
//! Command-line interface around the psychopy-events library:
//! - Reads a PsychoPy log
//! - Converts it into BIDS events and runs the protocol checks
//! - Writes `events.tsv` only if every check passed

use anyhow::{Context, Result};
use clap::Parser;
use psychopy_events::{BidsEventsWriter, EventConverter, PsychopyLogReader};
use std::path::PathBuf;

mod config;

/// Convert a PsychoPy log file to BIDS-compatible event data
#[derive(Parser, Debug)]
#[command(name = "psychopy2events")]
#[command(about = "Convert a PsychoPy log file to BIDS-compatible event data", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the input PsychoPy log file
    #[arg(short, long, value_name = "FILE")]
    input: PathBuf,

    /// Path to the output BIDS-compatible event file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Path to a protocol file (TOML) overriding the built-in tables
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Write the events even if a protocol check fails
    #[arg(long)]
    skip_validation: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);
    run(&args)
}

/// Convert `args.input` and write `args.output`; nothing is written on error
fn run(args: &Args) -> Result<()> {
    log::info!("psychopy2events v{}", env!("CARGO_PKG_VERSION"));
    log::debug!("Using psychopy-events library v{}", psychopy_events::VERSION);

    let app_config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => config::AppConfig::default(),
    };
    let skip_validation = args.skip_validation || app_config.output.skip_validation;

    let converter = EventConverter::new(app_config.protocol)
        .context("Failed to build converter from protocol configuration")?;

    let lines = PsychopyLogReader::parse(&args.input)
        .with_context(|| format!("Failed to read log file: {:?}", args.input))?;

    let events = if skip_validation {
        log::warn!("Protocol checks disabled");
        converter.convert_unchecked(&lines)?
    } else {
        converter.convert_lines(&lines)?
    };

    BidsEventsWriter::write(&args.output, &events)
        .with_context(|| format!("Failed to write events file: {:?}", args.output))?;

    log::info!("Wrote {} events to {:?}", events.len(), args.output);
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_args() {
        let args = Args::try_parse_from([
            "psychopy2events",
            "-i",
            "run.log",
            "--output",
            "events.tsv",
            "-vv",
        ])
        .unwrap();

        assert_eq!(args.input, PathBuf::from("run.log"));
        assert_eq!(args.output, PathBuf::from("events.tsv"));
        assert_eq!(args.verbose, 2);
        assert!(!args.skip_validation);
    }

    #[test]
    fn test_output_is_required() {
        assert!(Args::try_parse_from(["psychopy2events", "-i", "run.log"]).is_err());
    }

    /// A grating shown for 3.3s, outside the 3.0s +/- 0.2s window
    const LONG_GRATING_LOG: &str = "\
10.0\tDATA\tKeypress: s
10.5\tEXP\tgrating: autoDraw = True
13.8\tEXP\tgrating: autoDraw = False
";

    fn args_for(dir: &std::path::Path, extra: &[&str]) -> Args {
        let input = dir.join("run.log");
        std::fs::write(&input, LONG_GRATING_LOG).unwrap();
        let output = dir.join("events.tsv");

        let mut argv = vec![
            "psychopy2events".to_string(),
            "-i".to_string(),
            input.display().to_string(),
            "-o".to_string(),
            output.display().to_string(),
        ];
        argv.extend(extra.iter().map(|a| a.to_string()));
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_failed_validation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(dir.path(), &[]);

        let err = run(&args).unwrap_err();
        assert!(err.to_string().contains("'vis'"));
        assert!(!args.output.exists());
    }

    #[test]
    fn test_skip_validation_writes_events() {
        let dir = tempfile::tempdir().unwrap();
        let args = args_for(dir.path(), &["--skip-validation"]);

        run(&args).unwrap();

        let written = std::fs::read_to_string(&args.output).unwrap();
        let rows: Vec<&str> = written.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "onset\tduration\ttrial_type\tvalue");
        assert_eq!(rows[1], "0.50000\t3.30000\tvis\tn/a");
    }

    #[test]
    fn test_skip_validation_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("protocol.toml");
        std::fs::write(&config, "[output]\nskip_validation = true\n").unwrap();
        let args = args_for(dir.path(), &["-c", config.to_str().unwrap()]);

        run(&args).unwrap();
        assert!(args.output.exists());
    }
}
