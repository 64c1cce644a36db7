use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgGroup, Parser};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nc2geojson::config::ConversionConfig;
use nc2geojson::convert::convert_file;
use nc2geojson::error::ConversionError;

#[derive(Parser, Debug)]
#[command(
    name = "nc2geojson",
    about = "Convert CF-compliant NetCDF files with vector attributes to GeoJSON",
    group = ArgGroup::new("input").required(true).args(["input_file", "input_dir"])
)]
struct Args {
    /// Configuration file
    #[arg(short, long)]
    config_file: PathBuf,

    /// Input file
    #[arg(short, long)]
    input_file: Option<PathBuf>,

    /// Directory containing input files
    #[arg(short = 'd', long)]
    input_dir: Option<PathBuf>,

    /// Maximum number of records to process
    #[arg(short, long)]
    max_records: Option<usize>,

    /// Output directory
    #[arg(short, long, default_value = "./output")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match ConversionConfig::from_file(&args.config_file) {
        Ok(config) => config,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(input_dir) = &args.input_dir {
        convert_directory(&config, input_dir, &args.output_dir, args.max_records)
    } else if let Some(input_file) = &args.input_file {
        match convert_file(&config, input_file, &args.output_dir, args.max_records) {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{err}");
                ExitCode::FAILURE
            }
        }
    } else {
        // The clap input group guarantees one of the two is present
        ExitCode::FAILURE
    }
}

/// Converts every .nc file in the directory, sorted by filename. Files are
/// isolated from each other; failures are collected and summarized rather
/// than halting the batch.
fn convert_directory(
    config: &ConversionConfig,
    input_dir: &Path,
    output_dir: &Path,
    max_records: Option<usize>,
) -> ExitCode {
    let mut inputs = match list_netcdf_files(input_dir) {
        Ok(inputs) => inputs,
        Err(err) => {
            error!("failed to read {}: {}", input_dir.display(), err);
            return ExitCode::FAILURE;
        }
    };
    inputs.sort();

    if inputs.is_empty() {
        warn!("no .nc files found in {}", input_dir.display());
        return ExitCode::SUCCESS;
    }

    let mut failures: Vec<(&PathBuf, ConversionError)> = Vec::new();
    for input in &inputs {
        if let Err(err) = convert_file(config, input, output_dir, max_records) {
            warn!(input = %input.display(), "conversion failed: {err}");
            failures.push((input, err));
        }
    }

    if failures.is_empty() {
        info!("converted {} files", inputs.len());
    } else {
        warn!(
            "{} of {} files failed to convert:",
            failures.len(),
            inputs.len()
        );
        for (input, err) in &failures {
            warn!("  {}: {}", input.display(), err);
        }
    }

    ExitCode::SUCCESS
}

fn list_netcdf_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().map(|ext| ext == "nc").unwrap_or(false) {
            files.push(path);
        }
    }
    Ok(files)
}
