use thiserror::Error;

#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Payload shape error: {message}")]
    PayloadShapeError { message: String },

    #[error("Validation error on '{field}': {message}")]
    ValidationError { field: String, message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to deserialize model artifact '{path}': {message}")]
    DeserializationError { path: String, message: String },

    #[error("Shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatchError { expected: String, actual: String },

    #[error("Invalid value for feature '{column}' in row {row}: {value}")]
    InvalidFeatureValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Model returned no prediction")]
    EmptyPrediction,

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Model,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl PredictError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PredictError::ParseError(_)
            | PredictError::PayloadShapeError { .. }
            | PredictError::ValidationError { .. }
            | PredictError::InvalidFeatureValue { .. } => ErrorCategory::Input,
            PredictError::DeserializationError { .. }
            | PredictError::ShapeMismatchError { .. }
            | PredictError::EmptyPrediction => ErrorCategory::Model,
            PredictError::ConfigError { .. }
            | PredictError::MissingConfigError { .. }
            | PredictError::InvalidConfigValueError { .. }
            | PredictError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            PredictError::IoError(_) | PredictError::CsvError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // 單筆請求失敗，服務本身仍可用
            ErrorCategory::Input => ErrorSeverity::Medium,
            ErrorCategory::Model | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            PredictError::ParseError(_) => "Check that the request body is valid JSON",
            PredictError::PayloadShapeError { .. } => {
                "Send a single flat JSON object (or an array of them in batch mode)"
            }
            PredictError::ValidationError { .. } => {
                "Make sure 'time' is present and formatted like 2019-01-01 00:00:00"
            }
            PredictError::IoError(_) => "Verify that the file exists and is readable",
            PredictError::DeserializationError { .. } => {
                "Re-export the model artifact with a compatible format_version"
            }
            PredictError::ShapeMismatchError { .. } => {
                "Send the same feature columns the model was trained on, in the same order"
            }
            PredictError::InvalidFeatureValue { .. } => {
                "Replace unknown categorical labels and missing values before predicting"
            }
            PredictError::EmptyPrediction => "Inspect the model artifact; it produced no output",
            PredictError::CsvError(_) => "Check the output path for the feature CSV",
            PredictError::ConfigError { .. }
            | PredictError::MissingConfigError { .. }
            | PredictError::InvalidConfigValueError { .. }
            | PredictError::ConfigValidationError { .. } => {
                "Review the configuration file and command line arguments"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Input => format!("The request payload was rejected: {}", self),
            ErrorCategory::Model => format!("The model could not produce a prediction: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, PredictError>;
