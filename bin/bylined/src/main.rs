//! `bylined`, the Byline publishing server binary.
//!
//! Usage:
//!   bylined -c <context-name-or-path> [--listen <addr>]
//!
//! The context name resolves to `/etc/byline/<name>.toml`.
//! If a path with `/` or `.` is given, it's used directly.

mod bootstrap;
mod config;
mod routes;

use std::sync::Arc;

use byline_core::Module;
use clap::Parser;
use tracing::info;

use config::ServerConfig;

/// Byline server.
#[derive(Parser, Debug)]
#[command(name = "bylined", about = "Byline publishing server")]
struct Cli {
    /// Context name or path to config file.
    #[arg(short = 'c', long = "config", required = true)]
    config: String,

    /// Listen address (overrides the configured one).
    #[arg(long = "listen")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();

    // Load server configuration.
    let config_path = ServerConfig::resolve_path(&cli.config);
    info!("Loading configuration from {}", config_path.display());
    let server_config = ServerConfig::load(&config_path)?;

    // Verify configuration is valid.
    bootstrap::verify_config(&server_config)?;

    // Initialize storage.
    let data_dir = std::path::PathBuf::from(&server_config.storage.data_dir);
    std::fs::create_dir_all(&data_dir)?;

    let listen = cli
        .listen
        .clone()
        .unwrap_or_else(|| server_config.server.listen.clone());

    let core_config = byline_core::ServiceConfig {
        data_dir: Some(data_dir),
        listen: listen.clone(),
        ..Default::default()
    };

    let sql: Arc<dyn byline_sql::SQLStore> = Arc::new(
        byline_sql::SqliteStore::open(&core_config.resolve_sqlite_path())
            .map_err(|e| anyhow::anyhow!("failed to open SQL store: {}", e))?,
    );

    let blog_module = blog::BlogModule::new(Arc::clone(&sql))?;
    info!("Blog module initialized");

    // Bootstrap: seed the admin account if configured.
    bootstrap::ensure_admin_account(&blog_module, &server_config)?;

    let module_routes = vec![(blog_module.name(), blog_module.routes())];

    // Build router.
    let app = routes::build_router(module_routes);

    // Start server.
    let listener = tokio::net::TcpListener::bind(&listen).await?;
    info!("Byline server listening on {}", listen);
    axum::serve(listener, app).await?;

    Ok(())
}
