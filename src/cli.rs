use anyhow::{Context as _, Result};
use basic_cleaning::config::{JobConfig, PartialJobConfig, TimestampPolicy};
use basic_cleaning::job::run_job;
use basic_cleaning::run::{RunStatus, RunStore};
use basic_cleaning::store::{ArtifactStore as _, LocalArtifactStore};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "basic-cleaning",
    about = "Download a raw dataset artifact, apply basic data cleaning and publish the result"
)]
pub struct Cli {
    /// Root directory of the artifact store
    #[arg(
        long,
        global = true,
        env = "BASIC_CLEANING_STORE",
        default_value = "artifacts-store"
    )]
    pub store: PathBuf,

    /// Directory for log files. Defaults to the platform data directory.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clean an input artifact and publish the result as a new artifact
    Clean(CleanArgs),
    /// Publish a local file as an artifact
    Upload {
        /// File to publish
        file: PathBuf,

        /// Artifact name. Defaults to the file name.
        #[arg(long)]
        name: Option<String>,

        /// Artifact type
        #[arg(long = "type", default_value = "raw_data")]
        artifact_type: String,

        /// Artifact description
        #[arg(long, default_value = "")]
        description: String,
    },
    /// List recorded runs, newest first
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args)]
pub struct CleanArgs {
    /// Name and version of the input artifact (e.g. sample.csv:latest)
    #[arg(long = "input_artifact")]
    pub input_artifact: Option<String>,

    /// Name of the output artifact
    #[arg(long = "output_artifact")]
    pub output_artifact: Option<String>,

    /// Type of the output
    #[arg(long = "output_type")]
    pub output_type: Option<String>,

    /// Description of the output artifact
    #[arg(long = "output_description")]
    pub output_description: Option<String>,

    /// Minimum price to keep (inclusive)
    #[arg(long = "min_price", allow_negative_numbers = true)]
    pub min_price: Option<f64>,

    /// Maximum price to keep (inclusive)
    #[arg(long = "max_price", allow_negative_numbers = true)]
    pub max_price: Option<f64>,

    /// How last_review is normalized [default: numeric-with-imputation]
    #[arg(long = "timestamp_policy", value_enum)]
    pub timestamp_policy: Option<TimestampPolicy>,

    /// JSON file supplying any of the values above; flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl CleanArgs {
    fn to_partial(&self) -> PartialJobConfig {
        PartialJobConfig {
            input_artifact: self.input_artifact.clone(),
            output_artifact: self.output_artifact.clone(),
            output_type: self.output_type.clone(),
            output_description: self.output_description.clone(),
            min_price: self.min_price,
            max_price: self.max_price,
            timestamp_policy: self.timestamp_policy,
        }
    }
}

/// A parsed command with its configuration fully resolved.
pub enum Task {
    Clean(JobConfig),
    Upload {
        file: PathBuf,
        name: Option<String>,
        artifact_type: String,
        description: String,
    },
    Runs {
        limit: usize,
    },
}

impl Commands {
    /// Resolves the `clean` configuration (file plus flags). Reads at most
    /// the `--config` file and writes nothing.
    pub fn into_task(self) -> Result<Task> {
        Ok(match self {
            Self::Clean(args) => {
                let from_file = match &args.config {
                    Some(path) => PartialJobConfig::from_json_file(path)?,
                    None => PartialJobConfig::default(),
                };
                Task::Clean(from_file.merge(args.to_partial()).resolve()?)
            }
            Self::Upload {
                file,
                name,
                artifact_type,
                description,
            } => Task::Upload {
                file,
                name,
                artifact_type,
                description,
            },
            Self::Runs { limit } => Task::Runs { limit },
        })
    }
}

pub fn run_task(store_root: &Path, task: Task) -> Result<()> {
    match task {
        Task::Clean(config) => handle_clean(store_root, &config),
        Task::Upload {
            file,
            name,
            artifact_type,
            description,
        } => handle_upload(store_root, &file, name, &artifact_type, &description),
        Task::Runs { limit } => handle_runs(store_root, limit),
    }
}

fn handle_clean(store_root: &Path, config: &JobConfig) -> Result<()> {
    let store = LocalArtifactStore::new(store_root.to_path_buf())
        .context("Failed to open artifact store")?;
    let runs = RunStore::new(store_root)?;

    let outcome = run_job(&store, &runs, config)?;
    println!(
        "Published {} ({} of {} rows kept, {} values imputed) in run {}",
        outcome.output,
        outcome.report.rows_out,
        outcome.report.rows_in,
        outcome.report.values_imputed(),
        outcome.run_id
    );
    Ok(())
}

fn handle_upload(
    store_root: &Path,
    file: &Path,
    name: Option<String>,
    artifact_type: &str,
    description: &str,
) -> Result<()> {
    let name = match name {
        Some(n) => n,
        None => file
            .file_name()
            .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", file.display()))?
            .to_string_lossy()
            .to_string(),
    };

    let store = LocalArtifactStore::new(store_root.to_path_buf())
        .context("Failed to open artifact store")?;
    let id = store.publish(&name, artifact_type, description, file)?;
    println!("Published {id}");
    Ok(())
}

fn handle_runs(store_root: &Path, limit: usize) -> Result<()> {
    let runs = RunStore::new(store_root)?;
    for run in runs.list()?.into_iter().take(limit) {
        let status = match &run.status {
            RunStatus::Running => "running".to_owned(),
            RunStatus::Finished => "finished".to_owned(),
            RunStatus::Failed(msg) => format!("failed: {msg}"),
        };
        let inputs: Vec<String> = run.used_artifacts.iter().map(|a| a.id.to_string()).collect();
        let outputs: Vec<String> = run
            .logged_artifacts
            .iter()
            .map(|a| a.id.to_string())
            .collect();
        println!(
            "{} {} {} [{}] -> [{}] {status}",
            run.started_at.format("%Y-%m-%d %H:%M:%S"),
            run.id,
            run.job_type,
            inputs.join(", "),
            outputs.join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory as _;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_clean_flags_parse() {
        let cli = Cli::try_parse_from([
            "basic-cleaning",
            "clean",
            "--input_artifact",
            "sample.csv:latest",
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "Data with outliers and null values removed",
            "--min_price",
            "10",
            "--max_price",
            "350",
            "--timestamp_policy",
            "datetime-only",
        ])
        .unwrap();

        let Task::Clean(config) = cli.command.into_task().unwrap() else {
            panic!("expected clean task");
        };
        assert_eq!(config.input_artifact, "sample.csv:latest");
        assert_eq!(config.cleaning.max_price, 350.0);
        assert_eq!(config.cleaning.timestamp_policy, TimestampPolicy::DatetimeOnly);
    }

    #[test]
    fn test_inverted_bounds_rejected_without_store_access() {
        let temp = tempfile::TempDir::new().unwrap();
        let store = temp.path().join("store");
        let cli = Cli::try_parse_from([
            "basic-cleaning",
            "clean",
            "--store",
            store.to_str().unwrap(),
            "--input_artifact",
            "sample.csv:latest",
            "--output_artifact",
            "clean_sample.csv",
            "--output_type",
            "clean_sample",
            "--output_description",
            "",
            "--min_price",
            "50",
            "--max_price",
            "10",
        ])
        .unwrap();

        let err = cli.command.into_task().err().unwrap();
        assert!(err.to_string().contains("min_price"), "got {err:#}");
        assert!(!store.exists());
    }

    #[test]
    fn test_missing_flags_are_all_reported() {
        let cli = Cli::try_parse_from(["basic-cleaning", "clean", "--min_price", "10"]).unwrap();
        let err = cli.command.into_task().err().unwrap().to_string();
        for key in ["input_artifact", "output_type", "max_price"] {
            assert!(err.contains(key), "{key} not reported in {err}");
        }
    }
}
