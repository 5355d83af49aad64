use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tokio::signal;
use tracing::{error, info, warn};

use shopme_admin as admin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = admin::config::load_config().context("failed to load configuration")?;
    admin::config::init_tracing(cfg.log_level(), cfg.log_json);

    // Init DB
    let db_pool = admin::db::establish_connection_from_app_config(&cfg).await?;
    if cfg.auto_migrate {
        admin::db::run_migrations(&db_pool).await.map_err(|e| {
            error!("Failed running migrations: {}", e);
            e
        })?;
    }
    let db_arc = Arc::new(db_pool);

    let app_state = admin::AppState::new(db_arc.clone(), cfg.clone());

    match app_state.services.settings.ensure_defaults().await {
        Ok(inserted) => info!(inserted, "Default settings checked"),
        // The settings table is missing until migrations have run.
        Err(e) => warn!("Could not create default settings: {}", e),
    }

    let app = admin::app_router(app_state);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", cfg.host, cfg.port))?;
    info!(
        upload_root = %cfg.upload_root().display(),
        "shopme-admin listening on http://{}", addr
    );
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Ok(pool) = Arc::try_unwrap(db_arc) {
        admin::db::close_pool(pool).await?;
    }
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
