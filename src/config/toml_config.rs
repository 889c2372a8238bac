use crate::core::ConfigProvider;
use crate::utils::error::{PredictError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const LOG_FORMATS: &[&str] = &["compact", "json"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictorConfig {
    pub model: ModelConfig,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreprocessConfig {
    pub pressure_fallback: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub verbose: bool,
}

fn default_log_format() -> String {
    "compact".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl PredictorConfig {
    /// 只指定模型路徑的最小配置
    pub fn for_model(path: impl Into<String>) -> Self {
        Self {
            model: ModelConfig { path: path.into() },
            preprocess: PreprocessConfig::default(),
            logging: LoggingConfig::default(),
            monitoring: None,
        }
    }

    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PredictError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${MODEL_DIR})，未設定的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PredictError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn validate_config(&self) -> Result<()> {
        validation::validate_path("model.path", &self.model.path)?;
        validation::validate_file_extension("model.path", &self.model.path, &["json"])?;

        if let Some(fallback) = self.preprocess.pressure_fallback {
            validation::validate_finite("preprocess.pressure_fallback", fallback)?;
        }

        validation::validate_one_of("logging.format", &self.logging.format, LOG_FORMATS)?;

        Ok(())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.format == "json"
    }
}

impl ConfigProvider for PredictorConfig {
    fn model_path(&self) -> &str {
        &self.model.path
    }

    fn pressure_fallback(&self) -> Option<f64> {
        self.preprocess.pressure_fallback
    }

    fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for PredictorConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
