use crate::core::preprocess::FeaturePreprocessor;
use crate::domain::model::FeatureTable;
use crate::domain::ports::Estimator;
use crate::utils::error::{PredictError, Result};

/// Preprocesses payloads and runs them through an estimator.
#[derive(Debug, Clone, Default)]
pub struct Predictor {
    preprocessor: FeaturePreprocessor,
}

impl Predictor {
    pub fn new(preprocessor: FeaturePreprocessor) -> Self {
        Self { preprocessor }
    }

    pub fn preprocessor(&self) -> &FeaturePreprocessor {
        &self.preprocessor
    }

    /// Prediction for a single JSON record, as a one-element list.
    pub fn predict<E: Estimator + ?Sized>(&self, data: &str, model: &E) -> Result<Vec<f64>> {
        let table = self.preprocessor.preprocess(data)?;
        self.first_prediction(&table, model)
    }

    /// One prediction per record of a JSON array.
    pub fn predict_batch<E: Estimator + ?Sized>(&self, data: &str, model: &E) -> Result<Vec<f64>> {
        let table = self.preprocessor.preprocess_batch(data)?;
        model.predict(&table)
    }

    /// Runs the model and keeps only the first row's result.
    pub fn first_prediction<E: Estimator + ?Sized>(
        &self,
        table: &FeatureTable,
        model: &E,
    ) -> Result<Vec<f64>> {
        let predictions = model.predict(table)?;
        let first = predictions
            .first()
            .copied()
            .ok_or(PredictError::EmptyPrediction)?;
        Ok(vec![first])
    }
}

/// Preprocess `data` and predict with `model`, returning a one-element list.
pub fn make_prediction<E: Estimator + ?Sized>(data: &str, model: &E) -> Result<Vec<f64>> {
    Predictor::default().predict(data, model)
}

pub fn make_batch_prediction<E: Estimator + ?Sized>(data: &str, model: &E) -> Result<Vec<f64>> {
    Predictor::default().predict_batch(data, model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::estimator::{EstimatorParams, ModelArtifact};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn model() -> ModelArtifact {
        ModelArtifact {
            format_version: 1,
            name: Some("test".to_string()),
            target: Some("load_shortfall_3h".to_string()),
            feature_names: Some(vec![
                "Valencia_wind_deg".to_string(),
                "Seville_pressure".to_string(),
                "Valencia_pressure".to_string(),
                "time_int".to_string(),
            ]),
            n_features: None,
            estimator: EstimatorParams::LinearRegression {
                intercept: 100.0,
                coefficients: vec![10.0, 1.0, 0.0, 0.0],
            },
        }
    }

    fn payload() -> String {
        json!({
            "Valencia_wind_deg": "level_3",
            "Seville_pressure": "sp7",
            "Valencia_pressure": 1015.0,
            "time": "2018-06-01 12:00:00"
        })
        .to_string()
    }

    /// Counts inference calls and returns no rows.
    struct EmptyModel {
        calls: AtomicUsize,
    }

    impl Estimator for EmptyModel {
        fn predict(&self, _table: &FeatureTable) -> Result<Vec<f64>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        }

        fn feature_names(&self) -> Option<&[String]> {
            None
        }

        fn n_features(&self) -> usize {
            0
        }

        fn describe(&self) -> String {
            "empty".to_string()
        }
    }

    #[test]
    fn test_make_prediction_returns_single_value() {
        let prediction = make_prediction(&payload(), &model()).unwrap();
        assert_eq!(prediction, vec![137.0]);
    }

    #[test]
    fn test_malformed_json_never_reaches_model() {
        let empty = EmptyModel {
            calls: AtomicUsize::new(0),
        };
        let err = make_prediction(r#"{"time": "2019-01-01 00:00:00",}"#, &empty).unwrap_err();

        assert!(matches!(err, PredictError::ParseError(_)));
        assert_eq!(empty.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_empty_model_output() {
        let empty = EmptyModel {
            calls: AtomicUsize::new(0),
        };
        let err = make_prediction(&payload(), &empty).unwrap_err();
        assert!(matches!(err, PredictError::EmptyPrediction));
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_label_surfaces_from_estimator() {
        let data = json!({
            "Valencia_wind_deg": "level_42",
            "Seville_pressure": "sp7",
            "Valencia_pressure": 1015.0,
            "time": "2018-06-01 12:00:00"
        });
        let err = make_prediction(&data.to_string(), &model()).unwrap_err();
        assert!(matches!(
            err,
            PredictError::InvalidFeatureValue { ref column, .. } if column == "Valencia_wind_deg"
        ));
    }

    #[test]
    fn test_batch_prediction() {
        let data = json!([
            {"Valencia_wind_deg": "level_1", "Seville_pressure": "sp1", "Valencia_pressure": 1000.0, "time": "2018-06-01 00:00:00"},
            {"Valencia_wind_deg": "level_2", "Seville_pressure": "sp2", "Valencia_pressure": null, "time": "2018-06-01 03:00:00"}
        ]);
        let predictions = make_batch_prediction(&data.to_string(), &model()).unwrap();
        assert_eq!(predictions, vec![111.0, 122.0]);
    }
}
