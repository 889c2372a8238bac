//! Load a pretrained load-shortfall regression model, turn JSON weather
//! payloads into its feature table and return predictions.
//!
//! ```no_run
//! use shortfall_predictor::{load_model, make_prediction};
//!
//! let model = load_model("models/shortfall.json")?;
//! let payload = r#"{"time": "2019-01-01 00:00:00", "Valencia_wind_deg": "level_5", "Seville_pressure": "sp25", "Valencia_pressure": 1002.6}"#;
//! let prediction = make_prediction(payload, &model)?;
//! assert_eq!(prediction.len(), 1);
//! # Ok::<(), shortfall_predictor::PredictError>(())
//! ```

pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::toml_config::PredictorConfig;

pub use crate::core::engine::{PredictionEngine, PredictionOutcome};
pub use crate::core::loader::{load_model, LoadedModel, ModelLoader};
pub use crate::core::predictor::{make_batch_prediction, make_prediction, Predictor};
pub use crate::core::preprocess::{FeaturePreprocessor, PreprocessOptions};
pub use crate::domain::estimator::ModelArtifact;
pub use crate::domain::model::{FeatureRecord, FeatureTable, FeatureValue};
pub use crate::domain::ports::Estimator;
pub use crate::utils::error::{PredictError, Result};
