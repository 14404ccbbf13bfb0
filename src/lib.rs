//! # basic-cleaning
//!
//! Fetches a raw listings dataset from an artifact store, cleans it and
//! publishes the result as a new artifact version.
//!
//! ## Quick Start
//!
//! ```no_run
//! use basic_cleaning::config::{JobConfig, CleaningConfig};
//! use basic_cleaning::job::run_job;
//! use basic_cleaning::run::RunStore;
//! use basic_cleaning::store::LocalArtifactStore;
//! use std::path::PathBuf;
//!
//! # fn example() -> basic_cleaning::error::Result<()> {
//! let root = PathBuf::from("artifacts-store");
//! let store = LocalArtifactStore::new(root.clone())?;
//! let runs = RunStore::new(&root)?;
//!
//! let config = JobConfig {
//!     input_artifact: "sample.csv:latest".to_owned(),
//!     output_artifact: "clean_sample.csv".to_owned(),
//!     output_type: "clean_sample".to_owned(),
//!     output_description: "Data with outliers and null values removed".to_owned(),
//!     cleaning: CleaningConfig::new(10.0, 350.0),
//! };
//! let outcome = run_job(&store, &runs, &config)?;
//! println!("published {}", outcome.output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`pipeline`]: the pure cleaning transform and its stages
//! - [`config`]: run configuration and validation
//! - [`store`]: name+version artifact storage
//! - [`run`]: run records with artifact lineage
//! - [`job`]: fetch, clean, publish
//! - [`io`]: CSV loading and saving
//! - [`error`]: error types
//! - [`logging`]: tracing setup for the binary

#![warn(clippy::all, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod io;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod run;
pub mod store;
