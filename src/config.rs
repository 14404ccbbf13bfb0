//! Run configuration for the cleaning step.
//!
//! A [`JobConfig`] is assembled from an optional JSON file and the command
//! line (flags win), then validated before any artifact is touched.

use crate::error::{CleaningError, Result, ResultExt as _};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How `last_review` is represented after normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TimestampPolicy {
    /// Seconds since the Unix epoch as `Float64`, imputed per group.
    #[default]
    NumericWithImputation,
    /// A `Datetime` column; never imputed.
    DatetimeOnly,
}

impl TimestampPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NumericWithImputation => "numeric-with-imputation",
            Self::DatetimeOnly => "datetime-only",
        }
    }

    pub fn imputes_timestamps(&self) -> bool {
        matches!(self, Self::NumericWithImputation)
    }
}

/// Parameters of the pure cleaning transform.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    pub min_price: f64,
    pub max_price: f64,
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
}

impl CleaningConfig {
    pub fn new(min_price: f64, max_price: f64) -> Self {
        Self {
            min_price,
            max_price,
            timestamp_policy: TimestampPolicy::default(),
        }
    }

    pub fn with_timestamp_policy(mut self, policy: TimestampPolicy) -> Self {
        self.timestamp_policy = policy;
        self
    }

    /// Checks the price bounds.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::Config`] if a bound is not finite or
    /// `min_price > max_price`.
    pub fn validate(&self) -> Result<()> {
        if !self.min_price.is_finite() || !self.max_price.is_finite() {
            return Err(CleaningError::Config(format!(
                "price bounds must be finite numbers (min_price={}, max_price={})",
                self.min_price, self.max_price
            )));
        }
        if self.min_price > self.max_price {
            return Err(CleaningError::Config(format!(
                "min_price ({}) is greater than max_price ({})",
                self.min_price, self.max_price
            )));
        }
        Ok(())
    }
}

/// Everything one cleaning run needs: where to read, where to publish, and
/// the transform parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    #[serde(flatten)]
    pub cleaning: CleaningConfig,
}

impl JobConfig {
    /// # Errors
    ///
    /// Same as [`CleaningConfig::validate`], plus [`CleaningError::Config`]
    /// for blank artifact names or type.
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("input_artifact", &self.input_artifact),
            ("output_artifact", &self.output_artifact),
            ("output_type", &self.output_type),
        ] {
            if value.trim().is_empty() {
                return Err(CleaningError::Config(format!("{key} must not be empty")));
            }
        }
        self.cleaning.validate()
    }
}

/// A possibly incomplete [`JobConfig`], as read from a file or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialJobConfig {
    pub input_artifact: Option<String>,
    pub output_artifact: Option<String>,
    pub output_type: Option<String>,
    pub output_description: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub timestamp_policy: Option<TimestampPolicy>,
}

impl PartialJobConfig {
    /// Reads a JSON config file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// this shape.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| CleaningError::Config(format!("{}: {e}", path.display())))
    }

    /// Values set in `overrides` replace the ones in `self`.
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            input_artifact: overrides.input_artifact.or(self.input_artifact),
            output_artifact: overrides.output_artifact.or(self.output_artifact),
            output_type: overrides.output_type.or(self.output_type),
            output_description: overrides.output_description.or(self.output_description),
            min_price: overrides.min_price.or(self.min_price),
            max_price: overrides.max_price.or(self.max_price),
            timestamp_policy: overrides.timestamp_policy.or(self.timestamp_policy),
        }
    }

    /// Turns the partial config into a validated [`JobConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::Config`] naming every missing required key,
    /// or any error from [`JobConfig::validate`].
    pub fn resolve(self) -> Result<JobConfig> {
        let mut missing = Vec::new();
        if self.input_artifact.is_none() {
            missing.push("input_artifact");
        }
        if self.output_artifact.is_none() {
            missing.push("output_artifact");
        }
        if self.output_type.is_none() {
            missing.push("output_type");
        }
        if self.output_description.is_none() {
            missing.push("output_description");
        }
        if self.min_price.is_none() {
            missing.push("min_price");
        }
        if self.max_price.is_none() {
            missing.push("max_price");
        }

        let (
            Some(input_artifact),
            Some(output_artifact),
            Some(output_type),
            Some(output_description),
            Some(min_price),
            Some(max_price),
        ) = (
            self.input_artifact,
            self.output_artifact,
            self.output_type,
            self.output_description,
            self.min_price,
            self.max_price,
        )
        else {
            return Err(CleaningError::Config(format!(
                "missing required value(s): {}",
                missing.join(", ")
            )));
        };

        let config = JobConfig {
            input_artifact,
            output_artifact,
            output_type,
            output_description,
            cleaning: CleaningConfig {
                min_price,
                max_price,
                timestamp_policy: self.timestamp_policy.unwrap_or_default(),
            },
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn complete() -> PartialJobConfig {
        PartialJobConfig {
            input_artifact: Some("sample.csv:latest".to_owned()),
            output_artifact: Some("clean_sample.csv".to_owned()),
            output_type: Some("clean_sample".to_owned()),
            output_description: Some("Data with outliers and null values removed".to_owned()),
            min_price: Some(10.0),
            max_price: Some(350.0),
            timestamp_policy: None,
        }
    }

    #[test]
    fn test_inverted_price_bounds_rejected() {
        let err = CleaningConfig::new(50.0, 10.0).validate().unwrap_err();
        assert!(matches!(err, CleaningError::Config(_)));
    }

    #[test]
    fn test_equal_price_bounds_accepted() {
        assert!(CleaningConfig::new(10.0, 10.0).validate().is_ok());
    }

    #[test]
    fn test_nan_bound_rejected() {
        assert!(CleaningConfig::new(f64::NAN, 10.0).validate().is_err());
    }

    #[test]
    fn test_resolve_reports_every_missing_key() {
        let partial = PartialJobConfig {
            min_price: Some(1.0),
            ..Default::default()
        };
        let msg = partial.resolve().unwrap_err().to_string();
        assert!(msg.contains("input_artifact"));
        assert!(msg.contains("output_description"));
        assert!(msg.contains("max_price"));
        assert!(!msg.contains("min_price"));
    }

    #[test]
    fn test_resolve_defaults_to_numeric_policy() {
        let config = complete().resolve().unwrap();
        assert_eq!(
            config.cleaning.timestamp_policy,
            TimestampPolicy::NumericWithImputation
        );
    }

    #[test]
    fn test_flags_override_file_values() {
        let from_file = complete();
        let flags = PartialJobConfig {
            max_price: Some(500.0),
            timestamp_policy: Some(TimestampPolicy::DatetimeOnly),
            ..Default::default()
        };
        let config = from_file.merge(flags).resolve().unwrap();
        assert_eq!(config.cleaning.max_price, 500.0);
        assert_eq!(config.cleaning.min_price, 10.0);
        assert_eq!(config.cleaning.timestamp_policy, TimestampPolicy::DatetimeOnly);
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"input_artifact": "sample.csv:v0", "min_price": 10, "timestamp_policy": "datetime-only"}}"#
        )
        .unwrap();
        file.flush().unwrap();

        let partial = PartialJobConfig::from_json_file(file.path()).unwrap();
        assert_eq!(partial.input_artifact.as_deref(), Some("sample.csv:v0"));
        assert_eq!(partial.min_price, Some(10.0));
        assert_eq!(partial.timestamp_policy, Some(TimestampPolicy::DatetimeOnly));
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"min_prise": 10}}"#).unwrap();
        file.flush().unwrap();

        let err = PartialJobConfig::from_json_file(file.path()).unwrap_err();
        assert!(matches!(err, CleaningError::Config(_)));
    }
}
