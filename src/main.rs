// Main entry point for the keeper server

use anyhow::Context;
use keeper::api::{build_state, create_router};
use keeper::config::Config;
use keeper::storage::{MemoryStore, PgStore, SecretStore, UserStore};

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load and validate configuration first (before any logging)
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    // 2. Initialize tracing subscriber (only once per process)
    init_tracing(&config)?;

    info!("Starting keeper");
    info!(
        bind_address = %config.bind_address,
        port = config.port,
        token_ttl_secs = config.token_ttl_secs,
        "Configuration loaded"
    );

    // 3. Storage: Postgres when configured, otherwise process memory
    let secrets: Arc<dyn SecretStore>;
    let users: Arc<dyn UserStore>;
    let mut db_pool = None;
    if let Some(ref database_url) = config.database_url {
        let pool = sqlx::PgPool::connect(database_url)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to connect to database");
                e
            })
            .context("database connection")?;
        let store = Arc::new(PgStore::new(pool.clone()));
        secrets = store.clone();
        users = store;
        db_pool = Some(Arc::new(pool));
        info!("Database pool initialized");
    } else {
        warn!("DATABASE_URL not set, records are kept in memory only");
        let store = Arc::new(MemoryStore::new());
        secrets = store.clone();
        users = store;
    }

    let addr = format!("{}:{}", config.bind_address, config.port);

    // 4. Services, interceptor and router
    let (app_state, auth_state) = build_state(Arc::new(config), secrets, users, db_pool);
    let shutdown = app_state.shutdown.clone();
    let router = create_router(app_state, auth_state);

    info!("Router created");

    // 5. Start HTTP server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %addr, "Failed to bind to address");
            e
        })
        .with_context(|| format!("bind {}", addr))?;

    info!(addr = %addr, "Server listening on {}", addr);

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Open note streams hold child tokens of this one
            shutdown.cancel();
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Server error");
            e
        })?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing subscriber based on configuration
///
/// `RUST_LOG` takes precedence over `LOG_LEVEL` when set.
fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = fmt()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_env_filter(filter);

    if config.log_format == "json" {
        subscriber
            .json()
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing init failed: {}", e))?;
    } else {
        subscriber
            .try_init()
            .map_err(|e| anyhow::anyhow!("tracing init failed: {}", e))?;
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C received, starting graceful shutdown");
        },
        _ = terminate => {
            info!("SIGTERM received, starting graceful shutdown");
        },
    }
}
