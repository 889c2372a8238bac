use crate::utils::error::{PredictError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::io::Write;

/// One flat JSON object of weather/time readings, keys in payload order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub fields: Map<String, Value>,
}

impl FeatureRecord {
    /// Wraps a JSON value, rejecting anything that is not a flat object.
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(fields) = value else {
            return Err(PredictError::PayloadShapeError {
                message: format!("expected a JSON object, got {}", json_kind(&value)),
            });
        };

        if let Some((key, nested)) = fields
            .iter()
            .find(|(_, v)| matches!(v, Value::Object(_) | Value::Array(_)))
        {
            return Err(PredictError::PayloadShapeError {
                message: format!("field '{}' is a nested {}", key, json_kind(nested)),
            });
        }

        Ok(Self { fields })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A single cell of the feature table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
    Text(String),
    Missing,
}

impl FeatureValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FeatureValue::Int(v) => Some(*v as f64),
            FeatureValue::Float(v) => Some(*v),
            FeatureValue::Text(_) | FeatureValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, FeatureValue::Missing)
    }
}

impl From<&Value> for FeatureValue {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => FeatureValue::Missing,
            Value::Bool(b) => FeatureValue::Int(i64::from(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => FeatureValue::Int(i),
                None => n.as_f64().map_or(FeatureValue::Missing, FeatureValue::Float),
            },
            Value::String(s) => FeatureValue::Text(s.clone()),
            // 巢狀值在 FeatureRecord::from_value 已被拒絕
            Value::Array(_) | Value::Object(_) => FeatureValue::Text(value.to_string()),
        }
    }
}

impl fmt::Display for FeatureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureValue::Int(v) => write!(f, "{}", v),
            FeatureValue::Float(v) => write!(f, "{}", v),
            FeatureValue::Text(s) => f.write_str(s),
            FeatureValue::Missing => Ok(()),
        }
    }
}

/// Named columns with one row per input record.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FeatureTable {
    columns: Vec<String>,
    rows: Vec<Vec<FeatureValue>>,
}

impl FeatureTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Appends a row; its width must match the column count.
    pub fn push_row(&mut self, row: Vec<FeatureValue>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(PredictError::ShapeMismatchError {
                expected: format!("{} cells", self.columns.len()),
                actual: format!("{} cells", row.len()),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<FeatureValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn get(&self, row: usize, column: &str) -> Option<&FeatureValue> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }

    pub fn column(&self, name: &str) -> Option<Vec<&FeatureValue>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Row as model input. Fails on the first cell that is not a finite number.
    pub fn numeric_row(&self, row: usize) -> Result<Vec<f64>> {
        let cells = self.rows.get(row).ok_or_else(|| PredictError::ShapeMismatchError {
            expected: format!("row index below {}", self.rows.len()),
            actual: format!("row {}", row),
        })?;

        cells
            .iter()
            .zip(&self.columns)
            .map(|(cell, column)| match cell.as_f64() {
                Some(v) if v.is_finite() => Ok(v),
                _ => Err(PredictError::InvalidFeatureValue {
                    column: column.clone(),
                    row,
                    value: match cell {
                        FeatureValue::Missing => "<missing>".to_string(),
                        other => other.to_string(),
                    },
                }),
            })
            .collect()
    }

    /// Writes the table as CSV with a header row. Missing cells are empty fields.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.columns)?;
        for row in &self.rows {
            csv_writer.write_record(row.iter().map(|cell| cell.to_string()))?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}
