//! Digit Classifier
//!
//! Loads a pre-trained digit classifier from disk and serves predictions
//! over HTTP.
//!
//! ```text
//! POST /predict_digit  {"pixels": [64 floats]}  ->  {"prediction": 7}
//! ```

use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use digit_classifier::{load_model, ApiServer, ApiServerConfig, Error, Result, PIXEL_COUNT};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Digit Classifier - HTTP inference for 8x8 handwritten digits
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the ONNX model artifact
    #[arg(long, env = "MODEL_PATH", default_value = "digits_model.onnx")]
    model_path: String,

    /// REST API bind address
    #[arg(long, env = "API_ADDR", default_value = "0.0.0.0:8000")]
    api_addr: String,

    /// Request timeout in seconds
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    request_timeout_secs: u64,

    /// Maximum request body size in bytes
    #[arg(long, env = "MAX_BODY_SIZE", default_value = "65536")]
    max_body_size: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args);

    info!("Starting Digit Classifier");
    info!("  Version: {}", digit_classifier::VERSION);
    info!("  Model: {}", args.model_path);
    info!("  REST API: {}", args.api_addr);

    let model = load_model(&args.model_path)?;
    model.ensure_features(PIXEL_COUNT)?;

    let api_config = ApiServerConfig {
        addr: args.api_addr.parse().map_err(|e| {
            Error::Configuration(format!("Invalid REST API address: {}", e))
        })?,
        request_timeout_secs: args.request_timeout_secs,
        max_body_size: args.max_body_size,
    };

    let api_server = ApiServer::new(api_config, model.classifier);
    api_server.run().await?;

    info!("Shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "tower=warn"] {
        if let Ok(directive) = directive.parse() {
            filter = filter.add_directive(directive);
        }
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}
