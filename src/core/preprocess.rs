//! Turns raw JSON weather payloads into the feature table the model was trained on.
//!
//! Steps, in order:
//! 1. parse the payload into flat records,
//! 2. fill a missing `Valencia_pressure` with the batch median,
//! 3. encode `time` as a `YYYYMMDDHHMMSS` integer (`time_int`),
//! 4. map `Valencia_wind_deg` labels `level_N` to `N`,
//! 5. map `Seville_pressure` labels `spN` to `N`,
//! 6. drop `time`.
//!
//! Labels outside the known ranges are passed through untouched; the estimator
//! rejects them at inference time.

use crate::domain::model::{FeatureRecord, FeatureTable, FeatureValue};
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{PredictError, Result};
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde_json::Value;

pub const TIME: &str = "time";
pub const TIME_INT: &str = "time_int";
pub const VALENCIA_PRESSURE: &str = "Valencia_pressure";
pub const VALENCIA_WIND_DEG: &str = "Valencia_wind_deg";
pub const SEVILLE_PRESSURE: &str = "Seville_pressure";

const WIND_DEG_PREFIX: &str = "level_";
const WIND_DEG_LEVELS: i64 = 10;
const SEVILLE_PRESSURE_PREFIX: &str = "sp";
const SEVILLE_PRESSURE_LEVELS: i64 = 25;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreprocessOptions {
    /// Used for `Valencia_pressure` when no record in the batch carries a value.
    pub pressure_fallback: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct FeaturePreprocessor {
    options: PreprocessOptions,
}

impl FeaturePreprocessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PreprocessOptions) -> Self {
        Self { options }
    }

    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        Self::with_options(PreprocessOptions {
            pressure_fallback: config.pressure_fallback(),
        })
    }

    pub fn options(&self) -> &PreprocessOptions {
        &self.options
    }

    /// Preprocesses a single JSON object into a one-row table.
    pub fn preprocess(&self, data: &str) -> Result<FeatureTable> {
        let value: Value = serde_json::from_str(data)?;
        let record = FeatureRecord::from_value(value)?;
        self.transform(std::slice::from_ref(&record))
    }

    /// Preprocesses a JSON array of objects. A lone object is a one-record batch.
    pub fn preprocess_batch(&self, data: &str) -> Result<FeatureTable> {
        let value: Value = serde_json::from_str(data)?;
        let records = match value {
            Value::Array(items) => items
                .into_iter()
                .map(FeatureRecord::from_value)
                .collect::<Result<Vec<_>>>()?,
            other => vec![FeatureRecord::from_value(other)?],
        };

        if records.is_empty() {
            return Err(PredictError::PayloadShapeError {
                message: "batch contains no records".to_string(),
            });
        }

        self.transform(&records)
    }

    pub fn transform(&self, records: &[FeatureRecord]) -> Result<FeatureTable> {
        let columns = output_columns(records);
        let pressure_fill = self.pressure_fill(records);

        tracing::debug!(
            records = records.len(),
            columns = columns.len(),
            ?pressure_fill,
            "Preprocessing feature records"
        );

        let mut table = FeatureTable::new(columns);
        for (row_idx, record) in records.iter().enumerate() {
            let time_int = encode_time(record.get(TIME), row_idx)?;

            let row = table
                .columns()
                .iter()
                .map(|column| match column.as_str() {
                    TIME_INT => FeatureValue::Int(time_int),
                    VALENCIA_PRESSURE => impute(record.get(column), pressure_fill),
                    VALENCIA_WIND_DEG => {
                        decode_label(record.get(column), WIND_DEG_PREFIX, WIND_DEG_LEVELS)
                    }
                    SEVILLE_PRESSURE => decode_label(
                        record.get(column),
                        SEVILLE_PRESSURE_PREFIX,
                        SEVILLE_PRESSURE_LEVELS,
                    ),
                    _ => record.get(column).map_or(FeatureValue::Missing, FeatureValue::from),
                })
                .collect();

            table.push_row(row)?;
        }

        Ok(table)
    }

    fn pressure_fill(&self, records: &[FeatureRecord]) -> Option<f64> {
        let known: Vec<f64> = records
            .iter()
            .filter_map(|r| r.get(VALENCIA_PRESSURE).and_then(Value::as_f64))
            .filter(|v| v.is_finite())
            .collect();

        if let Some(m) = median(known) {
            return Some(m);
        }

        let any_missing = records
            .iter()
            .any(|r| matches!(r.get(VALENCIA_PRESSURE), None | Some(Value::Null)));

        match self.options.pressure_fallback {
            Some(fallback) => {
                if any_missing {
                    tracing::debug!(fallback, "No known {} in batch, using fallback", VALENCIA_PRESSURE);
                }
                Some(fallback)
            }
            None => {
                if any_missing {
                    tracing::warn!(
                        "{} is missing and the batch has no value to take a median from; leaving it empty",
                        VALENCIA_PRESSURE
                    );
                }
                None
            }
        }
    }
}

/// Payload keys in first-seen order without `time`, then `Valencia_pressure`
/// if no record had it, then `time_int`.
fn output_columns(records: &[FeatureRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.fields.keys() {
            if key != TIME && !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }

    for required in [VALENCIA_PRESSURE, TIME_INT] {
        if !columns.iter().any(|c| c == required) {
            columns.push(required.to_string());
        }
    }

    columns
}

/// Median with the two middle values averaged for even counts.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

fn impute(value: Option<&Value>, fill: Option<f64>) -> FeatureValue {
    match value {
        None | Some(Value::Null) => fill.map_or(FeatureValue::Missing, FeatureValue::Float),
        Some(v) => FeatureValue::from(v),
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        // 保留當地時間，不轉 UTC
        return Some(dt.naive_local());
    }

    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// `2019-01-01 03:04:05` becomes `20190101030405`.
pub fn timestamp_to_int(dt: &NaiveDateTime) -> i64 {
    i64::from(dt.year()) * 10_000_000_000
        + i64::from(dt.month()) * 100_000_000
        + i64::from(dt.day()) * 1_000_000
        + i64::from(dt.hour()) * 10_000
        + i64::from(dt.minute()) * 100
        + i64::from(dt.second())
}

fn encode_time(value: Option<&Value>, row: usize) -> Result<i64> {
    let invalid = |message: String| PredictError::ValidationError {
        field: TIME.to_string(),
        message: format!("row {}: {}", row, message),
    };

    match value {
        None | Some(Value::Null) => Err(invalid("required field is missing".to_string())),
        Some(Value::String(raw)) => parse_timestamp(raw)
            .map(|dt| timestamp_to_int(&dt))
            .ok_or_else(|| invalid(format!("cannot parse '{}' as a date-time", raw))),
        Some(other) => Err(invalid(format!(
            "expected a date-time string, got {}",
            crate::domain::model::json_kind(other)
        ))),
    }
}

/// `level_7` with prefix `level_` and `max` 10 yields 7. Only the canonical
/// spelling of a known level matches.
pub fn label_level(label: &str, prefix: &str, max: i64) -> Option<i64> {
    let digits = label.strip_prefix(prefix)?;
    let level: i64 = digits.parse().ok()?;
    ((1..=max).contains(&level) && level.to_string() == digits).then_some(level)
}

fn decode_label(value: Option<&Value>, prefix: &str, max: i64) -> FeatureValue {
    match value {
        Some(Value::String(label)) => match label_level(label, prefix, max) {
            Some(level) => FeatureValue::Int(level),
            None => {
                tracing::debug!(label = %label, prefix, "Unknown categorical label, passing through");
                FeatureValue::Text(label.clone())
            }
        },
        Some(other) => FeatureValue::from(other),
        None => FeatureValue::Missing,
    }
}
