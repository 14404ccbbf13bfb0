//! Error handling for the cleaning step.
//!
//! Library code returns [`Result<T>`], whose error side is [`CleaningError`].
//! The binary wraps these in `anyhow` at the command boundary.
//!
//! ## Categories
//!
//! ```
//! use basic_cleaning::error::CleaningError;
//!
//! fn exit_reason(err: &CleaningError) -> &'static str {
//!     match err {
//!         CleaningError::Config(_) => "bad configuration",
//!         CleaningError::Validation { .. } => "input is missing columns",
//!         CleaningError::ArtifactNotFound(_) => "unknown artifact",
//!         _ => "processing failure",
//!     }
//! }
//! ```
//!
//! ## Adding context
//!
//! ```no_run
//! use basic_cleaning::error::ResultExt as _;
//! use std::fs;
//!
//! fn read_manifest() -> basic_cleaning::error::Result<String> {
//!     let text = fs::read_to_string("manifest.json").context("Failed to read manifest")?;
//!     Ok(text)
//! }
//! ```

/// Main error type for cleaning operations.
#[derive(Debug, thiserror::Error)]
pub enum CleaningError {
    /// Invalid or incomplete configuration (e.g. `min_price > max_price`).
    #[error("Configuration error: {0}")]
    Config(String),

    /// The input dataset lacks one or more required columns.
    #[error("Validation error: missing required column(s): {}", .missing.join(", "))]
    Validation {
        /// Every required column that was absent.
        missing: Vec<String>,
    },

    /// No artifact matches the requested name or version.
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    /// The artifact store rejected an operation.
    #[error("Artifact store error: {0}")]
    Store(String),

    /// Dataframe processing errors (Polars, CSV parsing).
    #[error("Data processing error: {0}")]
    DataProcessing(String),

    /// Manifest or run record (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors (file operations).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context.
    #[error("{0}")]
    Other(String),
}

impl From<polars::error::PolarsError> for CleaningError {
    fn from(err: polars::error::PolarsError) -> Self {
        Self::DataProcessing(err.to_string())
    }
}

impl From<serde_json::Error> for CleaningError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for cleaning operations.
pub type Result<T> = std::result::Result<T, CleaningError>;

/// Extension trait to add context to results.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, msg: impl Into<String>) -> Result<T>;

    /// Add context using a closure (lazy evaluation).
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CleaningError>,
{
    fn context(self, msg: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let err: CleaningError = e.into();
            CleaningError::Other(format!("{}: {}", msg.into(), err))
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let err: CleaningError = e.into();
            CleaningError::Other(format!("{}: {}", f(), err))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_lists_columns() {
        let err = CleaningError::Validation {
            missing: vec!["price".to_owned(), "latitude".to_owned()],
        };
        assert_eq!(
            err.to_string(),
            "Validation error: missing required column(s): price, latitude"
        );
    }

    #[test]
    fn test_config_error_display() {
        let err = CleaningError::Config("min_price (50) is greater than max_price (10)".to_owned());
        assert!(err.to_string().starts_with("Configuration error:"));
    }

    #[test]
    fn test_result_context() {
        let result: std::result::Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file.txt",
        ));

        let result: Result<()> = result.context("Failed to read file");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read file")
        );
    }
}
