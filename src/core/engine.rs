use crate::core::loader::{LoadedModel, ModelLoader};
use crate::core::predictor::Predictor;
use crate::core::preprocess::FeaturePreprocessor;
use crate::domain::model::FeatureTable;
use crate::domain::ports::{ConfigProvider, Estimator};
use crate::utils::error::Result;
use crate::utils::monitor::ResourceMonitor;

#[derive(Debug, Clone)]
pub struct PredictionOutcome {
    pub table: FeatureTable,
    pub predictions: Vec<f64>,
}

/// Owns a loaded model and serves predictions from it.
pub struct PredictionEngine<E: Estimator> {
    model: E,
    predictor: Predictor,
    monitor: ResourceMonitor,
}

impl PredictionEngine<LoadedModel> {
    /// Loads the configured model. Must finish before any prediction is served.
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Result<Self> {
        let monitor = ResourceMonitor::new(config.monitoring_enabled());
        let model = ModelLoader::new().load_model(config.model_path())?;
        monitor.log_phase("model_load");

        Ok(Self {
            model,
            predictor: Predictor::new(FeaturePreprocessor::from_config(config)),
            monitor,
        })
    }
}

impl<E: Estimator> PredictionEngine<E> {
    pub fn new(model: E, predictor: Predictor) -> Self {
        Self::new_with_monitoring(model, predictor, false)
    }

    pub fn new_with_monitoring(model: E, predictor: Predictor, monitor_enabled: bool) -> Self {
        Self {
            model,
            predictor,
            monitor: ResourceMonitor::new(monitor_enabled),
        }
    }

    pub fn model(&self) -> &E {
        &self.model
    }

    /// Single record in, one-element prediction list out.
    pub fn predict_one(&self, data: &str) -> Result<PredictionOutcome> {
        tracing::debug!(model = %self.model.describe(), "Preprocessing single record");
        let table = self.predictor.preprocessor().preprocess(data)?;
        self.monitor.log_phase("preprocess");

        let predictions = self.predictor.first_prediction(&table, &self.model)?;
        self.monitor.log_phase("inference");
        tracing::info!(prediction = ?predictions, "Prediction complete");

        Ok(PredictionOutcome { table, predictions })
    }

    pub fn predict_batch(&self, data: &str) -> Result<PredictionOutcome> {
        let table = self.predictor.preprocessor().preprocess_batch(data)?;
        tracing::info!(records = table.len(), "Preprocessed batch");
        self.monitor.log_phase("preprocess");

        let predictions = self.model.predict(&table)?;
        self.monitor.log_phase("inference");
        tracing::info!(predictions = predictions.len(), "Batch prediction complete");

        Ok(PredictionOutcome { table, predictions })
    }
}
