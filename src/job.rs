//! The cleaning job: fetch, clean, publish.

use crate::config::JobConfig;
use crate::error::{CleaningError, Result, ResultExt as _};
use crate::io::{load_csv, save_csv};
use crate::pipeline::{self, CleaningReport};
use crate::run::{RunContext, RunStore};
use crate::store::{ArtifactId, ArtifactStore};
use tempfile::TempDir;
use uuid::Uuid;

pub const JOB_TYPE: &str = "basic_cleaning";

/// File name the cleaned data is published under.
pub const OUTPUT_FILE_NAME: &str = "clean_sample.csv";

/// What a successful job produced.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub run_id: Uuid,
    pub output: ArtifactId,
    pub report: CleaningReport,
}

/// Runs the cleaning job end to end.
///
/// The configuration is validated before the store is touched. The run
/// record is saved whether the job succeeds or fails.
///
/// # Errors
///
/// Configuration, validation, store and I/O errors are returned as-is.
pub fn run_job(
    store: &dyn ArtifactStore,
    runs: &RunStore,
    config: &JobConfig,
) -> Result<JobOutcome> {
    config.validate()?;

    let mut run = RunContext::new(JOB_TYPE, config)?;
    tracing::info!(run_id = %run.id, "Starting {JOB_TYPE} run");

    let result = execute(&mut run, store, config);
    match &result {
        Ok(report) => run.finish(report.clone()),
        Err(err) => run.fail(err),
    }
    runs.save(&run)?;

    let report = result?;
    let output = run
        .logged_artifacts
        .last()
        .map(|record| record.id.clone())
        .ok_or_else(|| CleaningError::Other("no artifact was logged".to_owned()))?;

    Ok(JobOutcome {
        run_id: run.id,
        output,
        report,
    })
}

fn execute(
    run: &mut RunContext,
    store: &dyn ArtifactStore,
    config: &JobConfig,
) -> Result<CleaningReport> {
    tracing::info!("Downloading input artifact {}", config.input_artifact);
    let input_path = run.use_artifact(store, &config.input_artifact)?;
    let df = load_csv(&input_path)?;

    tracing::info!(
        rows = df.height(),
        policy = config.cleaning.timestamp_policy.as_str(),
        "Cleaning dataset"
    );
    let mut output = pipeline::clean(df, &config.cleaning)?;
    for stage in &output.report.stages {
        tracing::info!(
            "{}: {} -> {} rows ({} values affected)",
            stage.stage.as_str(),
            stage.rows_before,
            stage.rows_after,
            stage.values_affected
        );
    }

    let staging = staging_dir()?;
    let staged_file = staging.path().join(OUTPUT_FILE_NAME);
    save_csv(&mut output.data, &staged_file)?;

    tracing::info!("Logging artifact {}", config.output_artifact);
    run.log_artifact(
        store,
        &config.output_artifact,
        &config.output_type,
        &config.output_description,
        &staged_file,
    )?;

    Ok(output.report)
}

/// Uniquely named temporary directory for the output file, removed when
/// dropped.
fn staging_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix(&format!("{JOB_TYPE}-"))
        .tempdir()
        .context("Failed to create staging directory")
}
