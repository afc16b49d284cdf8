//! Forza telemetry UDP ingestion daemon.

use forza_telemetry_config::{Config, Environment};
use forza_ingestd::Supervisor;

#[tokio::main]
async fn main() {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(err.exit_code().unwrap_or(1));
        }
    };

    init_tracing(config.env);
    tracing::info!(?config, "starting forza-ingestd");

    if let Err(err) = Supervisor::new(config).run().await {
        tracing::error!(error = %err, "fatal startup error");
        std::process::exit(err.exit_code().unwrap_or(1));
    }
}

fn init_tracing(env: Environment) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("forza_ingestd=info,warn"));

    match env {
        Environment::Production => {
            tracing_subscriber::fmt().with_env_filter(filter).json().init();
        }
        Environment::Development | Environment::Testing => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
