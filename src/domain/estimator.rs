//! Serialized estimator format and inference.
//!
//! A model artifact is a JSON document produced by the training pipeline:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "name": "load-shortfall-linear",
//!   "target": "load_shortfall_3h",
//!   "feature_names": ["Madrid_wind_speed", "Valencia_wind_deg", "time_int"],
//!   "estimator": { "type": "linear_regression", "intercept": 10.0, "coefficients": [1.0, 2.0, 0.0] }
//! }
//! ```

use crate::domain::model::FeatureTable;
use crate::domain::ports::Estimator;
use crate::utils::error::{PredictError, Result};
use serde::{Deserialize, Serialize};

/// Artifact versions this crate can read.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub feature_names: Option<Vec<String>>,
    /// Required when `feature_names` is absent and the estimator is tree based.
    #[serde(default)]
    pub n_features: Option<usize>,
    pub estimator: EstimatorParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EstimatorParams {
    LinearRegression {
        intercept: f64,
        coefficients: Vec<f64>,
    },
    DecisionTree(RegressionTree),
    RandomForest {
        trees: Vec<RegressionTree>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    /// Go left when `row[feature] <= threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl RegressionTree {
    fn check(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        for (idx, node) in self.nodes.iter().enumerate() {
            if let TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } = node
            {
                if *feature >= n_features {
                    return Err(format!(
                        "node {} splits on feature {} but the model has {} features",
                        idx, feature, n_features
                    ));
                }
                if threshold.is_nan() {
                    return Err(format!("node {} has a NaN threshold", idx));
                }
                // 子節點索引必須大於父節點，保證走訪一定會結束
                for child in [*left, *right] {
                    if child <= idx || child >= self.nodes.len() {
                        return Err(format!(
                            "node {} points to invalid child {} (tree has {} nodes)",
                            idx,
                            child,
                            self.nodes.len()
                        ));
                    }
                }
            }
        }

        Ok(())
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

impl EstimatorParams {
    pub fn kind(&self) -> &'static str {
        match self {
            EstimatorParams::LinearRegression { .. } => "linear_regression",
            EstimatorParams::DecisionTree(_) => "decision_tree",
            EstimatorParams::RandomForest { .. } => "random_forest",
        }
    }

    fn predict_row(&self, row: &[f64]) -> f64 {
        match self {
            EstimatorParams::LinearRegression {
                intercept,
                coefficients,
            } => {
                intercept
                    + coefficients
                        .iter()
                        .zip(row)
                        .map(|(w, x)| w * x)
                        .sum::<f64>()
            }
            EstimatorParams::DecisionTree(tree) => tree.predict_row(row),
            EstimatorParams::RandomForest { trees } => {
                trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / trees.len() as f64
            }
        }
    }
}

impl ModelArtifact {
    /// Checks internal consistency. The error string becomes part of a
    /// `DeserializationError` raised by the loader.
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(format!(
                "unsupported format_version {} (expected {})",
                self.format_version, SUPPORTED_FORMAT_VERSION
            ));
        }

        let n_features = self.resolved_n_features()?;

        if let (Some(names), Some(n)) = (&self.feature_names, self.n_features) {
            if names.len() != n {
                return Err(format!(
                    "feature_names lists {} columns but n_features is {}",
                    names.len(),
                    n
                ));
            }
        }

        match &self.estimator {
            EstimatorParams::LinearRegression {
                intercept,
                coefficients,
            } => {
                if coefficients.len() != n_features {
                    return Err(format!(
                        "linear model has {} coefficients for {} features",
                        coefficients.len(),
                        n_features
                    ));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err("linear model has non-finite weights".to_string());
                }
            }
            EstimatorParams::DecisionTree(tree) => tree.check(n_features)?,
            EstimatorParams::RandomForest { trees } => {
                if trees.is_empty() {
                    return Err("random forest has no trees".to_string());
                }
                for (i, tree) in trees.iter().enumerate() {
                    tree.check(n_features)
                        .map_err(|e| format!("tree {}: {}", i, e))?;
                }
            }
        }

        Ok(())
    }

    fn resolved_n_features(&self) -> std::result::Result<usize, String> {
        if let Some(names) = &self.feature_names {
            return Ok(names.len());
        }
        if let Some(n) = self.n_features {
            return Ok(n);
        }
        match &self.estimator {
            EstimatorParams::LinearRegression { coefficients, .. } => Ok(coefficients.len()),
            _ => Err("artifact must declare feature_names or n_features".to_string()),
        }
    }

    fn check_schema(&self, table: &FeatureTable) -> Result<()> {
        let columns = table.columns();
        let expected = self.n_features();

        if columns.len() != expected {
            return Err(PredictError::ShapeMismatchError {
                expected: format!("{} features", expected),
                actual: format!("{} columns", columns.len()),
            });
        }

        if let Some(names) = &self.feature_names {
            if let Some((pos, (want, got))) = names
                .iter()
                .zip(columns)
                .enumerate()
                .find(|(_, (want, got))| want != got)
            {
                return Err(PredictError::ShapeMismatchError {
                    expected: format!("column '{}' at position {}", want, pos),
                    actual: format!("'{}'", got),
                });
            }
        }

        Ok(())
    }
}

impl Estimator for ModelArtifact {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        // 直接反序列化的 artifact 沒經過 loader，推論前一律重新檢查
        self.check()
            .map_err(|message| PredictError::DeserializationError {
                path: self.name.clone().unwrap_or_else(|| "<in-memory>".to_string()),
                message,
            })?;
        self.check_schema(table)?;

        (0..table.len())
            .map(|i| {
                let row = table.numeric_row(i)?;
                Ok(self.estimator.predict_row(&row))
            })
            .collect()
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn n_features(&self) -> usize {
        // check() 已保證可解析；未檢查的 artifact 退回係數長度或 0
        self.resolved_n_features().unwrap_or(0)
    }

    fn describe(&self) -> String {
        format!(
            "{} ({}, {} features)",
            self.name.as_deref().unwrap_or("unnamed"),
            self.estimator.kind(),
            self.n_features()
        )
    }
}
