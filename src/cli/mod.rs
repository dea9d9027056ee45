//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    catalog::{Field, Model, RunHour, LEVEL_COUNT, MEMBER_COUNT},
    enumerate::DEFAULT_BASE_URL,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Downloads ICON-D2 grib files from the DWD open data server
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Log as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download one day of ICON-D2 files
    Download(DownloadArgs),
    /// Download a single URL into an existing directory
    Fetch {
        url: String,
        /// Directory to save into, must exist
        #[arg(long, default_value = ".")]
        dir: PathBuf,
        /// Per-request timeout in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,
    },
    /// Decompress a downloaded .bz2 file next to the original
    Extract { file: PathBuf },
    /// Dump a grib file to JSON with grib_dump
    Dump {
        file: PathBuf,
        #[arg(long, env = "ICOND2_GRIB_DUMP", default_value = "grib_dump")]
        program: String,
        /// Extra argument passed to the tool before `-j` (repeatable)
        #[arg(long = "tool-arg", allow_hyphen_values = true)]
        tool_args: Vec<String>,
        /// Write the dump here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Flatten a grib_dump JSON file into `<name>_new.json`
    Flatten { file: PathBuf },
}

#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// Run date as YYYY-MM-DD, defaults to today (UTC)
    #[arg(long)]
    pub date: Option<NaiveDate>,

    /// Destination root; `<run_hour>/<field>` directories must already exist below it
    #[arg(long, env = "ICOND2_DEST")]
    pub dest: Option<PathBuf>,

    #[arg(long, env = "ICOND2_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Only these models (repeatable)
    #[arg(long)]
    pub model: Vec<Model>,

    /// Only these run hours (repeatable)
    #[arg(long)]
    pub run_hour: Vec<RunHour>,

    /// Only these fields (repeatable)
    #[arg(long)]
    pub field: Vec<Field>,

    /// Number of ensemble members
    #[arg(long, default_value_t = MEMBER_COUNT, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub members: u8,

    /// Number of levels, counted from the top of the level table
    #[arg(long, default_value_t = LEVEL_COUNT, value_parser = clap::value_parser!(u8).range(1..=LEVEL_COUNT as i64))]
    pub levels: u8,

    /// Downloads in flight at once
    #[arg(long, env = "ICOND2_CONCURRENCY", default_value_t = 4)]
    pub concurrency: usize,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout: u64,

    /// Consecutive disk errors before giving up
    #[arg(long, default_value_t = 10)]
    pub max_io_errors: usize,

    /// Print the plan without downloading
    #[arg(long)]
    pub dry_run: bool,
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    ProgressBar::new(size).with_message(message).with_style(
        ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .expect("static progress template")
            .progress_chars("##-"),
    )
}

// -- Tests -------------------------------------------------------------------
