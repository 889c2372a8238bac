use anyhow::Result;
use serde_json::json;
use shortfall_predictor::core::ConfigProvider;
use shortfall_predictor::{
    load_model, make_prediction, Estimator, FeaturePreprocessor, FeatureValue, PredictError,
    PredictionEngine, PredictorConfig,
};
use tempfile::TempDir;

const FEATURES: [&str; 6] = [
    "Madrid_wind_speed",
    "Valencia_wind_deg",
    "Seville_pressure",
    "Madrid_temp",
    "Valencia_pressure",
    "time_int",
];

fn request_payload() -> serde_json::Value {
    json!({
        "Madrid_wind_speed": 2.0,
        "Valencia_wind_deg": "level_5",
        "Seville_pressure": "sp25",
        "Madrid_temp": 275.0,
        "Valencia_pressure": 1002.0,
        "time": "2019-01-01 00:00:00"
    })
}

fn write_linear_model(dir: &TempDir) -> Result<String> {
    let artifact = json!({
        "format_version": 1,
        "name": "load-shortfall-linear",
        "target": "load_shortfall_3h",
        "feature_names": FEATURES,
        "estimator": {
            "type": "linear_regression",
            "intercept": 5000.0,
            "coefficients": [100.0, 10.0, 1.0, 0.0, 0.0, 0.0]
        }
    });
    let path = dir.path().join("linear.json");
    std::fs::write(&path, serde_json::to_vec_pretty(&artifact)?)?;
    Ok(path.to_str().unwrap().to_string())
}

fn write_forest_model(dir: &TempDir) -> Result<String> {
    // 兩棵樹：依 Valencia_wind_deg 與 Seville_pressure 分裂
    let artifact = json!({
        "format_version": 1,
        "name": "load-shortfall-rf",
        "feature_names": FEATURES,
        "estimator": {
            "type": "random_forest",
            "trees": [
                {"nodes": [
                    {"split": {"feature": 1, "threshold": 5.0, "left": 1, "right": 2}},
                    {"leaf": {"value": 8000.0}},
                    {"leaf": {"value": 12000.0}}
                ]},
                {"nodes": [
                    {"split": {"feature": 2, "threshold": 20.0, "left": 1, "right": 2}},
                    {"leaf": {"value": 9000.0}},
                    {"leaf": {"value": 11000.0}}
                ]}
            ]
        }
    });
    let path = dir.path().join("forest.json");
    std::fs::write(&path, serde_json::to_vec(&artifact)?)?;
    Ok(path.to_str().unwrap().to_string())
}

#[test]
fn test_load_then_predict_linear() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = load_model(write_linear_model(&temp_dir)?)?;

    let prediction = make_prediction(&request_payload().to_string(), &model)?;

    // 5000 + 100*2 + 10*5 + 1*25
    assert_eq!(prediction, vec![5275.0]);
    Ok(())
}

#[test]
fn test_load_then_predict_forest() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = load_model(write_forest_model(&temp_dir)?)?;
    assert_eq!(model.name(), "load-shortfall-rf");
    assert_eq!(model.n_features(), FEATURES.len());

    let prediction = make_prediction(&request_payload().to_string(), &model)?;
    assert_eq!(prediction, vec![(8000.0 + 11000.0) / 2.0]);
    Ok(())
}

#[test]
fn test_preprocessed_columns_match_model_schema() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = load_model(write_linear_model(&temp_dir)?)?;

    let table = FeaturePreprocessor::new().preprocess(&request_payload().to_string())?;
    assert_eq!(Some(table.columns()), model.feature_names());
    assert_eq!(table.get(0, "time_int"), Some(&FeatureValue::Int(20190101000000)));
    Ok(())
}

#[test]
fn test_extra_column_is_shape_mismatch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = load_model(write_linear_model(&temp_dir)?)?;

    let mut payload = request_payload();
    payload["Bilbao_rain_1h"] = json!(0.3);

    let err = make_prediction(&payload.to_string(), &model).unwrap_err();
    assert!(matches!(err, PredictError::ShapeMismatchError { .. }));
    Ok(())
}

#[test]
fn test_reordered_payload_is_shape_mismatch() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = load_model(write_linear_model(&temp_dir)?)?;

    let payload = json!({
        "Valencia_wind_deg": "level_5",
        "Madrid_wind_speed": 2.0,
        "Seville_pressure": "sp25",
        "Madrid_temp": 275.0,
        "Valencia_pressure": 1002.0,
        "time": "2019-01-01 00:00:00"
    });

    let err = make_prediction(&payload.to_string(), &model).unwrap_err();
    assert!(matches!(err, PredictError::ShapeMismatchError { .. }));
    Ok(())
}

#[test]
fn test_missing_pressure_fails_at_inference_not_preprocessing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = load_model(write_linear_model(&temp_dir)?)?;

    let mut payload = request_payload();
    payload["Valencia_pressure"] = serde_json::Value::Null;
    let data = payload.to_string();

    assert!(FeaturePreprocessor::new().preprocess(&data).is_ok());

    let err = make_prediction(&data, &model).unwrap_err();
    assert!(matches!(
        err,
        PredictError::InvalidFeatureValue { ref column, .. } if column == "Valencia_pressure"
    ));
    Ok(())
}

#[test]
fn test_engine_from_toml_config_with_fallback() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model_path = write_linear_model(&temp_dir)?.replace('\\', "/");

    let config_content = format!(
        r#"
[model]
path = "{}"

[preprocess]
pressure_fallback = 1012.0
"#,
        model_path
    );
    let config_path = temp_dir.path().join("predictor.toml");
    std::fs::write(&config_path, config_content)?;

    let config = PredictorConfig::from_file(&config_path)?;
    assert_eq!(config.model_path(), model_path);

    let engine = PredictionEngine::from_config(&config)?;
    let mut payload = request_payload();
    payload["Valencia_pressure"] = serde_json::Value::Null;

    let outcome = engine.predict_one(&payload.to_string())?;
    assert_eq!(outcome.predictions, vec![5275.0]);
    assert_eq!(
        outcome.table.get(0, "Valencia_pressure"),
        Some(&FeatureValue::Float(1012.0))
    );
    Ok(())
}

#[test]
fn test_engine_with_missing_model_file() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let missing = temp_dir.path().join("absent.json");
    let config = PredictorConfig::for_model(missing.to_str().unwrap());

    match PredictionEngine::from_config(&config) {
        Err(PredictError::IoError(_)) => Ok(()),
        Err(other) => panic!("unexpected error: {:?}", other),
        Ok(_) => panic!("loading a missing model should fail"),
    }
}

#[test]
fn test_model_is_shared_read_only_across_threads() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let model = std::sync::Arc::new(load_model(write_linear_model(&temp_dir)?)?);
    let payload = request_payload().to_string();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let model = std::sync::Arc::clone(&model);
            let payload = payload.clone();
            std::thread::spawn(move || make_prediction(&payload, model.as_ref()))
        })
        .collect();

    for handle in handles {
        let prediction = handle.join().expect("prediction thread panicked")?;
        assert_eq!(prediction, vec![5275.0]);
    }
    Ok(())
}
