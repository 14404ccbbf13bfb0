//! CSV loading and saving.

use crate::error::{Result, ResultExt as _};
use polars::prelude::*;
use std::path::Path;

/// Rows sampled for dtype inference.
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Reads a CSV file with a header row. Empty fields load as null.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or parsed.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .with_context(|| format!("Failed to open CSV: {}", path.display()))?
        .finish()
        .with_context(|| format!("Failed to read CSV: {}", path.display()))?;

    tracing::debug!(
        rows = df.height(),
        columns = df.width(),
        "Loaded {}",
        path.display()
    );
    Ok(df)
}

/// Writes `df` as CSV with a header row, without an index column.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(df)
        .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
    Ok(())
}
