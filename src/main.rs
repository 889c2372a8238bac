use clap::Parser;
use shortfall_predictor::utils::error::{ErrorSeverity, PredictError};
use shortfall_predictor::utils::logger;
use shortfall_predictor::{CliConfig, PredictionEngine, PredictionOutcome, PredictorConfig};
use std::io::Read;

fn main() {
    let cli = CliConfig::parse();

    // 日誌格式要等設定檔載入後才知道，先解析配置
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            logger::init_cli_logger(cli.verbose);
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    };

    if config.json_logs() {
        logger::init_json_logger(config.logging.verbose);
    } else {
        logger::init_cli_logger(config.logging.verbose);
    }

    tracing::info!("Starting shortfall-predict");
    tracing::debug!("Resolved config: {:?}", config);

    match run(&cli, &config) {
        Ok(outcome) => match serde_json::to_string(&outcome.predictions) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                let e = PredictError::from(e);
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(exit_code(&e));
            }
        },
        Err(e) => {
            tracing::error!(
                "❌ Prediction failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    }
}

fn run(cli: &CliConfig, config: &PredictorConfig) -> Result<PredictionOutcome, PredictError> {
    // 模型必須在任何預測之前載入完成
    let engine = PredictionEngine::from_config(config)?;

    let payload = read_input(&cli.input)?;
    let outcome = if cli.batch {
        engine.predict_batch(&payload)?
    } else {
        engine.predict_one(&payload)?
    };

    if let Some(path) = &cli.features_csv {
        let file = std::fs::File::create(path)?;
        outcome.table.write_csv(file)?;
        tracing::info!("📁 Feature table saved to: {}", path);
    }

    Ok(outcome)
}

fn read_input(input: &str) -> Result<String, PredictError> {
    if input == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

fn exit_code(e: &PredictError) -> i32 {
    match e.severity() {
        ErrorSeverity::Medium => 1,
        ErrorSeverity::High => 2,
        ErrorSeverity::Critical => 3,
    }
}
