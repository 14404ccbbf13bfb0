//! The individual cleaning stages.
//!
//! Each stage takes ownership of a `DataFrame` and returns a new one; none of
//! them performs I/O.

use super::columns::{
    HOST_NAME, LAST_REVIEW, LATITUDE, LONGITUDE, NAME, NEIGHBOURHOOD_GROUP, PRICE,
    REVIEWS_PER_MONTH,
};
use super::timestamps;
use crate::config::TimestampPolicy;
use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Identifies a stage in reports and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    PriceFilter,
    TimestampNormalization,
    RequiredFields,
    GroupedImputation,
    Geofence,
}

impl StageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PriceFilter => "price_filter",
            Self::TimestampNormalization => "timestamp_normalization",
            Self::RequiredFields => "required_fields",
            Self::GroupedImputation => "grouped_imputation",
            Self::Geofence => "geofence",
        }
    }
}

/// Result of applying one stage.
pub struct StageOutput {
    pub df: DataFrame,
    /// Stage-specific count of touched values: timestamps that degraded to
    /// missing for normalization, values filled for imputation, zero for
    /// the row filters.
    pub values_affected: usize,
}

impl StageOutput {
    fn rows_only(df: DataFrame) -> Self {
        Self {
            df,
            values_affected: 0,
        }
    }
}

/// Trait implemented by every cleaning stage.
pub trait CleaningStage {
    /// Apply this stage to a dataframe.
    fn apply(&self, df: DataFrame) -> Result<StageOutput>;

    /// Which stage this is.
    fn kind(&self) -> StageKind;

    /// Human readable description, used for logging.
    fn description(&self) -> String;
}

/// Inclusive range test on a column cast to `Float64`. Nulls and values that
/// do not cast evaluate to null, which `filter` drops.
fn between(column: &str, low: f64, high: f64) -> Expr {
    let value = col(column).cast(DataType::Float64);
    value.clone().gt_eq(lit(low)).and(value.lt_eq(lit(high)))
}

fn present(column: &str) -> Expr {
    col(column)
        .is_not_null()
        .and(col(column).cast(DataType::String).neq(lit("")))
}

/// Nulls plus NaNs, counted on the column as imputation sees it.
fn missing_count(df: &DataFrame, column: &str) -> Result<usize> {
    let values = df
        .column(column)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let nan = values
        .f64()?
        .into_iter()
        .filter(|v| v.is_some_and(f64::is_nan))
        .count();
    Ok(values.null_count() + nan)
}

/// Drops price outliers.
pub struct PriceFilter {
    pub min_price: f64,
    pub max_price: f64,
}

impl CleaningStage for PriceFilter {
    fn apply(&self, df: DataFrame) -> Result<StageOutput> {
        let df = df
            .lazy()
            .filter(between(PRICE, self.min_price, self.max_price))
            .collect()?;
        Ok(StageOutput::rows_only(df))
    }

    fn kind(&self) -> StageKind {
        StageKind::PriceFilter
    }

    fn description(&self) -> String {
        format!(
            "Dropping outliers outside price range [{}, {}]",
            self.min_price, self.max_price
        )
    }
}

/// Rewrites `last_review` as epoch seconds or as a datetime column.
pub struct TimestampNormalization {
    pub policy: TimestampPolicy,
}

impl CleaningStage for TimestampNormalization {
    fn apply(&self, mut df: DataFrame) -> Result<StageOutput> {
        let original = df.column(LAST_REVIEW)?.as_materialized_series().clone();
        let missing_before = original.null_count();

        let seconds = timestamps::to_epoch_seconds(&original)?;
        let missing_after = seconds.iter().filter(|v| v.is_none()).count();

        let normalized = match self.policy {
            TimestampPolicy::NumericWithImputation => Series::new(LAST_REVIEW.into(), seconds),
            TimestampPolicy::DatetimeOnly => {
                let millis: Vec<Option<i64>> = seconds
                    .iter()
                    .map(|s| s.map(|s| (s * 1000.0).round() as i64))
                    .collect();
                Series::new(LAST_REVIEW.into(), millis)
                    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?
            }
        };
        df.with_column(normalized)?;

        Ok(StageOutput {
            df,
            values_affected: missing_after.saturating_sub(missing_before),
        })
    }

    fn kind(&self) -> StageKind {
        StageKind::TimestampNormalization
    }

    fn description(&self) -> String {
        match self.policy {
            TimestampPolicy::NumericWithImputation => {
                "Converting last_review to seconds".to_owned()
            }
            TimestampPolicy::DatetimeOnly => "Converting last_review to datetime".to_owned(),
        }
    }
}

/// Drops rows without a `name` or `host_name`.
pub struct RequiredFields;

impl CleaningStage for RequiredFields {
    fn apply(&self, df: DataFrame) -> Result<StageOutput> {
        let df = df
            .lazy()
            .filter(present(NAME).and(present(HOST_NAME)))
            .collect()?;
        Ok(StageOutput::rows_only(df))
    }

    fn kind(&self) -> StageKind {
        StageKind::RequiredFields
    }

    fn description(&self) -> String {
        format!("Removing null values from '{NAME}' and '{HOST_NAME}' columns")
    }
}

/// Fills missing values with the mean of the row's `neighbourhood_group`.
///
/// A group without any known value keeps its nulls. Rows whose group is
/// itself null belong to no group and are left as they are. NaN counts as
/// missing.
pub struct GroupedImputation {
    pub policy: TimestampPolicy,
}

impl GroupedImputation {
    fn target_columns(&self) -> Vec<&'static str> {
        if self.policy.imputes_timestamps() {
            vec![LAST_REVIEW, REVIEWS_PER_MONTH]
        } else {
            vec![REVIEWS_PER_MONTH]
        }
    }
}

fn impute_group_mean(column: &str) -> Expr {
    let value = col(column).cast(DataType::Float64).fill_nan(lit(NULL));
    let group = col(NEIGHBOURHOOD_GROUP);
    when(group.clone().is_null())
        .then(value.clone())
        .otherwise(value.clone().fill_null(value.mean().over([group])))
        .alias(column)
}

impl CleaningStage for GroupedImputation {
    fn apply(&self, df: DataFrame) -> Result<StageOutput> {
        let targets = self.target_columns();

        let mut missing_before = 0;
        for column in &targets {
            missing_before += missing_count(&df, column)?;
        }

        let df = df
            .lazy()
            .with_columns(
                targets
                    .iter()
                    .map(|c| impute_group_mean(c))
                    .collect::<Vec<_>>(),
            )
            .collect()?;

        let mut missing_after = 0;
        for column in &targets {
            missing_after += missing_count(&df, column)?;
        }

        Ok(StageOutput {
            df,
            values_affected: missing_before.saturating_sub(missing_after),
        })
    }

    fn kind(&self) -> StageKind {
        StageKind::GroupedImputation
    }

    fn description(&self) -> String {
        format!(
            "Imputing null values in {} with the mean of each group defined by '{NEIGHBOURHOOD_GROUP}'",
            self.target_columns().join(" and ")
        )
    }
}

/// Keeps rows inside a longitude/latitude box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geofence {
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
}

impl Geofence {
    /// The New York City bounding box.
    pub const NYC: Self = Self {
        min_longitude: -74.25,
        max_longitude: -73.50,
        min_latitude: 40.5,
        max_latitude: 41.2,
    };

    pub fn contains(&self, longitude: f64, latitude: f64) -> bool {
        (self.min_longitude..=self.max_longitude).contains(&longitude)
            && (self.min_latitude..=self.max_latitude).contains(&latitude)
    }
}

impl CleaningStage for Geofence {
    fn apply(&self, df: DataFrame) -> Result<StageOutput> {
        let inside = between(LONGITUDE, self.min_longitude, self.max_longitude).and(between(
            LATITUDE,
            self.min_latitude,
            self.max_latitude,
        ));
        let df = df.lazy().filter(inside).collect()?;
        Ok(StageOutput::rows_only(df))
    }

    fn kind(&self) -> StageKind {
        StageKind::Geofence
    }

    fn description(&self) -> String {
        "Dropping rows outside the proper geolocation".to_owned()
    }
}
