//! Model artifact loader

use crate::domain::estimator::ModelArtifact;
use crate::domain::model::FeatureTable;
use crate::domain::ports::Estimator;
use crate::utils::error::{PredictError, Result};
use std::path::{Path, PathBuf};
use tracing::info;

/// A model artifact loaded into memory. Immutable after load.
#[derive(Debug, Clone)]
pub struct LoadedModel {
    name: String,
    path: PathBuf,
    artifact: ModelArtifact,
}

impl LoadedModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }
}

impl Estimator for LoadedModel {
    fn predict(&self, table: &FeatureTable) -> Result<Vec<f64>> {
        self.artifact.predict(table)
    }

    fn feature_names(&self) -> Option<&[String]> {
        self.artifact.feature_names()
    }

    fn n_features(&self) -> usize {
        self.artifact.n_features()
    }

    fn describe(&self) -> String {
        format!("{} from {}", self.artifact.describe(), self.path.display())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelLoader;

impl ModelLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a model artifact from disk.
    ///
    /// A missing or unreadable file is an `IoError`; anything wrong with the
    /// contents is a `DeserializationError`.
    pub fn load_model<P: AsRef<Path>>(&self, path: P) -> Result<LoadedModel> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading model artifact");

        let bytes = std::fs::read(path)?;
        self.load_from_slice(&bytes, path)
    }

    /// Parse an artifact already in memory; `origin` is used for naming and errors.
    pub fn load_from_slice<P: AsRef<Path>>(&self, bytes: &[u8], origin: P) -> Result<LoadedModel> {
        let path = origin.as_ref();
        let corrupt = |message: String| PredictError::DeserializationError {
            path: path.display().to_string(),
            message,
        };

        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| corrupt(e.to_string()))?;
        artifact.check().map_err(corrupt)?;

        let name = artifact.name.clone().unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("model")
                .to_string()
        });

        info!(
            model = %name,
            kind = artifact.estimator.kind(),
            features = artifact.n_features(),
            "Model loaded successfully"
        );

        Ok(LoadedModel {
            name,
            path: path.to_path_buf(),
            artifact,
        })
    }
}

/// Load a model artifact with the default loader.
pub fn load_model<P: AsRef<Path>>(path_to_model: P) -> Result<LoadedModel> {
    ModelLoader::new().load_model(path_to_model)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LINEAR: &str = r#"{
        "format_version": 1,
        "feature_names": ["a", "b"],
        "estimator": {"type": "linear_regression", "intercept": 1.0, "coefficients": [0.5, 0.25]}
    }"#;

    #[test]
    fn test_load_model_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(LINEAR.as_bytes()).unwrap();

        let model = load_model(file.path()).unwrap();
        assert_eq!(model.n_features(), 2);
        assert_eq!(model.feature_names().unwrap(), ["a", "b"]);
        assert_eq!(model.path(), file.path());
        // 沒有 name 時以檔名命名
        assert_eq!(
            model.name(),
            file.path().file_stem().unwrap().to_str().unwrap()
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_model("/nonexistent/dir/model.json").unwrap_err();
        assert!(matches!(err, PredictError::IoError(_)));
    }

    #[test]
    fn test_corrupt_artifact_is_deserialization_error() {
        let loader = ModelLoader::new();

        let err = loader.load_from_slice(b"\x80\x04pickle", "model.pkl").unwrap_err();
        assert!(matches!(err, PredictError::DeserializationError { .. }));

        let err = loader
            .load_from_slice(br#"{"format_version": 1}"#, "model.json")
            .unwrap_err();
        assert!(matches!(err, PredictError::DeserializationError { .. }));

        let incompatible = LINEAR.replace("\"format_version\": 1", "\"format_version\": 7");
        match loader.load_from_slice(incompatible.as_bytes(), "model.json") {
            Err(PredictError::DeserializationError { path, message }) => {
                assert_eq!(path, "model.json");
                assert!(message.contains("format_version"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_artifact_name_is_preferred() {
        let named = LINEAR.replace("\"format_version\": 1,", "\"format_version\": 1, \"name\": \"rf-v2\",");
        let model = ModelLoader::new()
            .load_from_slice(named.as_bytes(), "whatever.json")
            .unwrap();
        assert_eq!(model.name(), "rf-v2");
        assert!(model.describe().starts_with("rf-v2 (linear_regression, 2 features)"));
    }
}
