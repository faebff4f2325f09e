pub mod accounts; // Staff signup, login check, bootstrap superuser
pub mod api; // HTTP router, middleware, endpoints
pub mod authorization; // Roles and per-operation access rules
pub mod clients; // Client registration and medical records
pub mod config;
pub mod core_state;
pub mod crypto;
pub mod dashboard; // Dashboard search, stats, notification poll
pub mod db;
pub mod models;
pub mod referral; // Referral workflow
pub mod sessions;
pub mod validation;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Process entry point: logging, configuration, database, HTTP server.
pub fn run() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = runtime.block_on(serve()) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn serve() -> Result<(), String> {
    let config = config::ServerConfig::from_env().map_err(|e| e.to_string())?;

    {
        let conn = db::open_database(&config.database_path)
            .map_err(|e| format!("Cannot open database: {e}"))?;
        tracing::info!(path = %config.database_path.display(), "Database ready");

        match &config.bootstrap_admin {
            Some(admin) => {
                accounts::bootstrap_admin(&conn, admin)
                    .map_err(|e| format!("Bootstrap failed: {e}"))?;
            }
            None if db::count_users(&conn).map_err(|e| e.to_string())? == 0 => {
                tracing::warn!(
                    "No accounts exist; set CLINIC_ADMIN_USERNAME and CLINIC_ADMIN_PASSWORD"
                );
            }
            None => {}
        }
    }

    let core = Arc::new(core_state::CoreState::from_config(&config));
    let mut server = api::start_server_on(core, config.bind_addr).await?;
    tracing::info!(addr = %server.session.server_addr, "Listening");

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for Ctrl-C: {e}");
    }
    server.shutdown();
    server.stopped().await;
    Ok(())
}
