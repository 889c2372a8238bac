pub mod toml_config;

#[cfg(feature = "cli")]
use crate::config::toml_config::{MonitoringConfig, PredictorConfig};
#[cfg(feature = "cli")]
use crate::utils::error::{PredictError, Result};
#[cfg(feature = "cli")]
use crate::utils::validation::Validate;
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "shortfall-predict")]
#[command(about = "Predict the 3-hourly electricity load shortfall from a weather payload")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Path to the model artifact (overrides the config file)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Payload file, or '-' to read from stdin
    #[arg(short, long, default_value = "-")]
    pub input: String,

    /// Treat the payload as a JSON array of records
    #[arg(long)]
    pub batch: bool,

    /// Write the preprocessed feature table to this CSV file
    #[arg(long)]
    pub features_csv: Option<String>,

    /// Valencia_pressure used when no record carries a value
    #[arg(long)]
    pub pressure_fallback: Option<f64>,

    /// Log CPU and memory usage after each phase
    #[arg(long)]
    pub monitor: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Merges the optional config file with command line overrides and validates the result.
    pub fn resolve(&self) -> Result<PredictorConfig> {
        let mut config = match (&self.config, &self.model) {
            (Some(path), _) => PredictorConfig::from_file(path)?,
            (None, Some(model)) => PredictorConfig::for_model(model.clone()),
            (None, None) => {
                return Err(PredictError::MissingConfigError {
                    field: "--config or --model".to_string(),
                })
            }
        };

        // 命令列參數優先於設定檔
        if let Some(model) = &self.model {
            config.model.path = model.clone();
        }
        if self.pressure_fallback.is_some() {
            config.preprocess.pressure_fallback = self.pressure_fallback;
        }
        if self.monitor {
            config.monitoring = Some(MonitoringConfig { enabled: true });
        }
        if self.json_logs {
            config.logging.format = "json".to_string();
        }
        if self.verbose {
            config.logging.verbose = true;
        }

        config.validate()?;
        Ok(config)
    }
}
