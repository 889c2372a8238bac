pub mod engine;
pub mod loader;
pub mod predictor;
pub mod preprocess;

pub use crate::domain::model::{FeatureRecord, FeatureTable, FeatureValue};
pub use crate::domain::ports::{ConfigProvider, Estimator};
pub use crate::utils::error::Result;
