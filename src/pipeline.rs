//! The cleaning pipeline.
//!
//! [`CleaningPipeline`] applies a fixed sequence of stages to a listings
//! dataframe:
//!
//! 1. **Price filter**: keep `price` within `[min_price, max_price]`
//! 2. **Timestamp normalization**: parse `last_review`, bad values become null
//! 3. **Required fields**: drop rows without `name` or `host_name`
//! 4. **Grouped imputation**: fill nulls with the `neighbourhood_group` mean
//! 5. **Geofence**: keep rows inside the NYC bounding box
//!
//! Order matters: imputation means are computed over the rows that survived
//! the earlier filters, and the timestamp policy decides whether
//! `last_review` takes part in imputation at all.
//!
//! ```no_run
//! use basic_cleaning::config::CleaningConfig;
//! use basic_cleaning::pipeline::clean;
//!
//! # fn example(df: polars::prelude::DataFrame) -> basic_cleaning::error::Result<()> {
//! let output = clean(df, &CleaningConfig::new(10.0, 350.0))?;
//! println!("kept {} of {} rows", output.report.rows_out, output.report.rows_in);
//! # Ok(())
//! # }
//! ```

pub mod stages;
pub mod timestamps;

use crate::config::CleaningConfig;
use crate::error::{CleaningError, Result};
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use stages::{
    CleaningStage, Geofence, GroupedImputation, PriceFilter, RequiredFields, StageKind,
    TimestampNormalization,
};

/// Column names the pipeline reads.
pub mod columns {
    pub const PRICE: &str = "price";
    pub const LAST_REVIEW: &str = "last_review";
    pub const NAME: &str = "name";
    pub const HOST_NAME: &str = "host_name";
    pub const NEIGHBOURHOOD_GROUP: &str = "neighbourhood_group";
    pub const REVIEWS_PER_MONTH: &str = "reviews_per_month";
    pub const LONGITUDE: &str = "longitude";
    pub const LATITUDE: &str = "latitude";

    pub const REQUIRED: [&str; 8] = [
        PRICE,
        LAST_REVIEW,
        NAME,
        HOST_NAME,
        NEIGHBOURHOOD_GROUP,
        REVIEWS_PER_MONTH,
        LONGITUDE,
        LATITUDE,
    ];
}

/// Row counts around a single stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageKind,
    pub rows_before: usize,
    pub rows_after: usize,
    pub values_affected: usize,
}

impl StageReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_before.saturating_sub(self.rows_after)
    }
}

/// Summary counts for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub rows_out: usize,
    pub stages: Vec<StageReport>,
}

impl CleaningReport {
    pub fn rows_dropped(&self) -> usize {
        self.rows_in.saturating_sub(self.rows_out)
    }

    pub fn stage(&self, kind: StageKind) -> Option<&StageReport> {
        self.stages.iter().find(|s| s.stage == kind)
    }

    /// `last_review` values that could not be parsed.
    pub fn timestamps_unparsed(&self) -> usize {
        self.stage(StageKind::TimestampNormalization)
            .map_or(0, |s| s.values_affected)
    }

    pub fn values_imputed(&self) -> usize {
        self.stage(StageKind::GroupedImputation)
            .map_or(0, |s| s.values_affected)
    }
}

/// A cleaned dataframe together with its summary.
#[derive(Debug)]
pub struct CleanOutput {
    pub data: DataFrame,
    pub report: CleaningReport,
}

/// Ordered set of cleaning stages built from a [`CleaningConfig`].
pub struct CleaningPipeline {
    stages: Vec<Box<dyn CleaningStage>>,
}

impl CleaningPipeline {
    /// # Errors
    ///
    /// Returns [`CleaningError::Config`] if the price bounds are invalid.
    pub fn new(config: &CleaningConfig) -> Result<Self> {
        config.validate()?;

        let stages: Vec<Box<dyn CleaningStage>> = vec![
            Box::new(PriceFilter {
                min_price: config.min_price,
                max_price: config.max_price,
            }),
            Box::new(TimestampNormalization {
                policy: config.timestamp_policy,
            }),
            Box::new(RequiredFields),
            Box::new(GroupedImputation {
                policy: config.timestamp_policy,
            }),
            Box::new(Geofence::NYC),
        ];

        Ok(Self { stages })
    }

    pub fn stage_kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|s| s.kind()).collect()
    }

    /// Runs every stage in order.
    ///
    /// # Errors
    ///
    /// Returns [`CleaningError::Validation`] if required columns are missing,
    /// or [`CleaningError::DataProcessing`] if Polars fails.
    pub fn run(&self, df: DataFrame) -> Result<CleanOutput> {
        validate_columns(&df)?;

        let rows_in = df.height();
        let mut df = df;
        let mut reports = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            tracing::debug!("{}", stage.description());
            let rows_before = df.height();
            let output = stage.apply(df)?;
            df = output.df;

            let report = StageReport {
                stage: stage.kind(),
                rows_before,
                rows_after: df.height(),
                values_affected: output.values_affected,
            };
            tracing::debug!(
                stage = report.stage.as_str(),
                rows_before = report.rows_before,
                rows_after = report.rows_after,
                values_affected = report.values_affected,
                "stage complete"
            );
            reports.push(report);
        }

        Ok(CleanOutput {
            report: CleaningReport {
                rows_in,
                rows_out: df.height(),
                stages: reports,
            },
            data: df,
        })
    }
}

/// Cleans `dataset` with the given configuration.
///
/// # Errors
///
/// [`CleaningError::Config`] for invalid price bounds (checked first),
/// [`CleaningError::Validation`] for missing columns.
pub fn clean(dataset: DataFrame, config: &CleaningConfig) -> Result<CleanOutput> {
    CleaningPipeline::new(config)?.run(dataset)
}

/// Checks that every column in [`columns::REQUIRED`] is present.
///
/// # Errors
///
/// Returns [`CleaningError::Validation`] listing all missing columns.
pub fn validate_columns(df: &DataFrame) -> Result<()> {
    let missing: Vec<String> = columns::REQUIRED
        .iter()
        .filter(|name| df.get_column_index(name).is_none())
        .map(|name| (*name).to_owned())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CleaningError::Validation { missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimestampPolicy;
    use polars::prelude::*;

    fn listings() -> DataFrame {
        df!(
            "id" => [1_i64, 2, 3, 4],
            "price" => [80_i64, 120, 5, 90],
            "last_review" => [Some(""), Some("2019-05-21"), Some("2019-01-01"), None],
            "name" => [Some("A"), Some("Cozy loft"), Some("Cheap"), None],
            "host_name" => ["B", "Maria", "Tom", "Ann"],
            "neighbourhood_group" => ["X", "X", "X", "Y"],
            "reviews_per_month" => [None, Some(2.0), Some(9.0), Some(1.0)],
            "longitude" => [-74.0, -73.95, -73.9, -73.9],
            "latitude" => [40.8, 40.75, 40.7, 40.7]
        )
        .unwrap()
    }

    #[test]
    fn test_stage_order() {
        let pipeline = CleaningPipeline::new(&CleaningConfig::new(10.0, 350.0)).unwrap();
        assert_eq!(
            pipeline.stage_kinds(),
            vec![
                StageKind::PriceFilter,
                StageKind::TimestampNormalization,
                StageKind::RequiredFields,
                StageKind::GroupedImputation,
                StageKind::Geofence,
            ]
        );
    }

    #[test]
    fn test_inverted_bounds_fail_before_validation() {
        let df = df!("unrelated" => [1_i64]).unwrap();
        let err = clean(df, &CleaningConfig::new(50.0, 10.0)).unwrap_err();
        assert!(matches!(err, CleaningError::Config(_)));
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let df = listings().drop("latitude").unwrap().drop("host_name").unwrap();
        let err = clean(df, &CleaningConfig::new(10.0, 350.0)).unwrap_err();
        match err {
            CleaningError::Validation { missing } => {
                assert_eq!(missing, vec!["host_name".to_owned(), "latitude".to_owned()]);
            }
            other => panic!("expected validation error, got {other}"),
        }
    }

    #[test]
    fn test_report_counts() -> Result<()> {
        let output = clean(listings(), &CleaningConfig::new(10.0, 350.0))?;
        let report = &output.report;

        assert_eq!(report.rows_in, 4);
        assert_eq!(report.rows_out, 2);
        assert_eq!(report.stage(StageKind::PriceFilter).unwrap().rows_dropped(), 1);
        assert_eq!(report.stage(StageKind::RequiredFields).unwrap().rows_dropped(), 1);
        // the empty string on row "A"
        assert_eq!(report.timestamps_unparsed(), 1);
        // last_review and reviews_per_month of row "A"
        assert_eq!(report.values_imputed(), 2);
        Ok(())
    }

    #[test]
    fn test_imputation_ignores_rows_removed_earlier() -> Result<()> {
        let output = clean(listings(), &CleaningConfig::new(10.0, 350.0))?;
        let rpm: Vec<Option<f64>> = output
            .data
            .column("reviews_per_month")?
            .as_materialized_series()
            .f64()?
            .into_iter()
            .collect();
        // the price outlier with 9.0 is gone before the group mean is taken
        assert_eq!(rpm, vec![Some(2.0), Some(2.0)]);
        Ok(())
    }

    #[test]
    fn test_datetime_policy_keeps_missing_review() -> Result<()> {
        let config =
            CleaningConfig::new(10.0, 350.0).with_timestamp_policy(TimestampPolicy::DatetimeOnly);
        let output = clean(listings(), &config)?;
        let last_review = output.data.column("last_review")?;
        assert!(matches!(last_review.dtype(), DataType::Datetime(_, _)));
        assert_eq!(last_review.null_count(), 1);
        assert_eq!(output.report.values_imputed(), 1);
        Ok(())
    }

    #[test]
    fn test_extra_columns_pass_through() -> Result<()> {
        let output = clean(listings(), &CleaningConfig::new(10.0, 350.0))?;
        let ids: Vec<Option<i64>> = output
            .data
            .column("id")?
            .as_materialized_series()
            .i64()?
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
        Ok(())
    }
}
