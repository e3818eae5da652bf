use std::{path::PathBuf, process::exit};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use log::*;
use purchase_pipeline::{load_inputs, run_pipeline, PipelineConfig};

mod formatting;

use crate::formatting::{format_input_counts, format_summary};

#[derive(Parser, Debug)]
#[command(version, about = "Run and check the purchase reconciliation and metrics pipeline")]
pub struct Arguments {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    #[clap(name = "run", about = "Run the full pipeline and write the reports")]
    Run(RunParams),
    #[clap(name = "check", about = "Load and validate the input files without writing anything")]
    Check(CheckParams),
}

#[derive(Debug, Args)]
pub struct RunParams {
    /// The directory holding the input CSV files. Overrides GBP_DATA_DIR
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,
    /// The directory the reports are written to. Overrides GBP_REPORTS_DIR
    #[arg(short = 'r', long = "reports-dir")]
    reports_dir: Option<PathBuf>,
    /// The reconciliation match window, in minutes. Overrides GBP_MATCH_TOLERANCE_MINS
    #[arg(short = 't', long = "tolerance-mins")]
    tolerance_mins: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CheckParams {
    /// The directory holding the input CSV files. Overrides GBP_DATA_DIR
    #[arg(short = 'd', long = "data-dir")]
    data_dir: Option<PathBuf>,
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();
    let cli = Arguments::parse();
    let code = match cli.command {
        Command::Run(params) => run(params),
        Command::Check(params) => check(params),
    };
    exit(code);
}

fn run(params: RunParams) -> i32 {
    let mut config = PipelineConfig::from_env_or_default();
    if let Some(dir) = params.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = params.reports_dir {
        config.reports_dir = dir;
    }
    if let Some(mins) = params.tolerance_mins {
        config.options = config.options.with_tolerance_mins(i64::from(mins));
    }
    match run_pipeline(&config) {
        Ok(summary) => {
            println!("{}", format_summary(&summary));
            println!("Pipeline OK - reports written to {}", config.reports_dir.display());
            0
        },
        Err(e) => {
            error!("💥️ {e}");
            eprintln!("{e}");
            e.exit_code()
        },
    }
}

fn check(params: CheckParams) -> i32 {
    match check_inputs(params) {
        Ok(()) => 0,
        Err(e) => {
            error!("💥️ {e:#}");
            eprintln!("Input check failed: {e:#}");
            2
        },
    }
}

fn check_inputs(params: CheckParams) -> anyhow::Result<()> {
    let mut config = PipelineConfig::from_env_or_default();
    if let Some(dir) = params.data_dir {
        config.data_dir = dir;
    }
    let batch = load_inputs(&config.data_dir)
        .with_context(|| format!("Could not load the inputs in {}", config.data_dir.display()))?;
    println!("{}", format_input_counts(&batch));
    println!("Inputs OK - {}", config.data_dir.display());
    Ok(())
}
