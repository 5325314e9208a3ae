//! CLINICA Server — Application entry point.

use clinica_db::{DbConfig, DbManager, run_migrations};
use tracing_subscriber::EnvFilter;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("clinica=info".parse().unwrap()),
        )
        .json()
        .init();

    tracing::info!("Starting CLINICA server...");

    let config = DbConfig {
        url: env_or("CLINICA_DB_URL", "127.0.0.1:8000"),
        namespace: env_or("CLINICA_DB_NAMESPACE", "clinica"),
        database: env_or("CLINICA_DB_DATABASE", "main"),
        username: env_or("CLINICA_DB_USER", "root"),
        password: env_or("CLINICA_DB_PASSWORD", "root"),
    };

    let manager = match DbManager::connect(&config).await {
        Ok(manager) => manager,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to SurrealDB");
            std::process::exit(1);
        }
    };

    if let Err(e) = run_migrations(manager.client()).await {
        tracing::error!(error = %e, "Failed to apply database migrations");
        std::process::exit(1);
    }

    // TODO: Start REST API server

    tracing::info!("CLINICA server stopped.");
}
