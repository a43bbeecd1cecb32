//! pdfstamp - fill PDF certificate templates from CSV records
//!
//! Locates `#Token` placeholders in an annotated template, then writes one
//! stamped copy of the blank template per CSV row.

use clap::{ArgAction, Parser};
use pdfstamp::{StampConfig, StampError};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "pdfstamp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML file with run settings; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Template showing the placeholder tokens (only scanned)
    #[arg(long)]
    annotated: Option<PathBuf>,

    /// Placeholder-free template every output starts from
    #[arg(long)]
    template: Option<PathBuf>,

    /// CSV file with one record per row
    #[arg(long)]
    records: Option<PathBuf>,

    /// Directory receiving the stamped documents
    #[arg(short, long = "output-dir")]
    output_dir: Option<PathBuf>,

    /// Worker threads (0 = one per CPU)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Photo download timeout in seconds
    #[arg(long = "timeout-secs")]
    timeout_secs: Option<u64>,

    /// Write a JSON-lines run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn into_config(self) -> Result<StampConfig, StampError> {
        let mut config = match &self.config {
            Some(path) => StampConfig::load(path)?,
            None => StampConfig::default(),
        };
        if let Some(path) = self.annotated {
            config.annotated_template = path;
        }
        if let Some(path) = self.template {
            config.template = path;
        }
        if let Some(path) = self.records {
            config.records = path;
        }
        if let Some(path) = self.output_dir {
            config.output_dir = path;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(secs) = self.timeout_secs {
            config.fetch_timeout_secs = secs;
        }
        if let Some(path) = self.report {
            config.report = Some(path);
        }
        Ok(config)
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let level = match args.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match args.into_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("pdfstamp: {}", err);
            return ExitCode::FAILURE;
        }
    };

    match pdfstamp::run(&config) {
        Ok(summary) => {
            println!(
                "{} written, {} failed, {} without photo -> {}",
                summary.written,
                summary.failed,
                summary.images_missing,
                config.output_dir.display()
            );
            for failure in summary.failures() {
                eprintln!(
                    "row {}: {}",
                    failure.row + 1,
                    failure.error.as_deref().unwrap_or("unknown error")
                );
            }
            if summary.failed > 0 {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
        Err(err) => {
            eprintln!("pdfstamp: {}", err);
            ExitCode::FAILURE
        }
    }
}
