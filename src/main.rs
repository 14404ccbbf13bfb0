//! # basic-cleaning entry point
//!
//! ```bash
//! basic-cleaning upload sample.csv
//! basic-cleaning clean \
//!     --input_artifact sample.csv:latest \
//!     --output_artifact clean_sample.csv \
//!     --output_type clean_sample \
//!     --output_description "Data with outliers and null values removed" \
//!     --min_price 10 --max_price 350
//! ```
//!
//! Any error is reported and the process exits with a non-zero status.

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in the binary

mod cli;

use anyhow::Result;
use clap::Parser as _;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    // Configuration errors surface before the log directory is created.
    let task = cli.command.into_task()?;
    basic_cleaning::logging::init(cli.log_dir.as_deref())?;

    cli::run_task(&cli.store, task).inspect_err(|err| tracing::error!("{err:#}"))
}
