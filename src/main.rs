use std::process::ExitCode;

use tracing::{error, info};

use foundation::{Config, Database, WebServer};

#[tokio::main]
async fn main() -> ExitCode {
    let config_path = std::env::args().nth(1).unwrap_or_else(|| "config.toml".to_string());

    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    if let Err(e) = foundation::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        foundation::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    info!("Foundation discussion board");

    let db = match Database::open(&config.database.path).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, path = %config.database.path, "Failed to open database");
            return ExitCode::FAILURE;
        }
    };

    if db.is_empty().await {
        info!("No accounts yet; create the first administrator via POST /api/setup/admin");
    }

    let server = match WebServer::new(&config, db) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "Failed to configure web server");
            return ExitCode::FAILURE;
        }
    };

    info!(addr = %server.addr(), "Starting web server");
    if let Err(e) = server.run().await {
        error!(error = %e, "Web server stopped");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
