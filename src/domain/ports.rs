use crate::domain::model::FeatureTable;
use crate::utils::error::Result;

/// A trained model exposing an inference operation over a feature table.
pub trait Estimator: Send + Sync {
    /// One prediction per table row.
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>>;

    /// Column names seen during training, in order, when the artifact records them.
    fn feature_names(&self) -> Option<&[String]>;

    /// Number of input columns the model consumes.
    fn n_features(&self) -> usize;

    fn describe(&self) -> String;
}

pub trait ConfigProvider: Send + Sync {
    fn model_path(&self) -> &str;
    fn pressure_fallback(&self) -> Option<f64>;
    fn monitoring_enabled(&self) -> bool;
}
