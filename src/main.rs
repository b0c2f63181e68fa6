use clap::Parser;
use financiera_api::{
    api::{create_router, AppState},
    cache::{open_store, ExpiringCache},
    clock::{Clock, SystemClock},
    config::Config,
    db::{create_pool, run_migrations, SqliteStockRepository, StockRepository},
    gate::RequestGate,
    observability::init_tracing,
    rate_limit::SlidingWindowLimiter,
};
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tokio::signal;

/// Historical stock market data API
#[derive(Debug, Parser)]
#[command(name = "financiera-api", version, about)]
struct Cli {
    /// Address to bind, overrides server.host
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides server.port
    #[arg(long)]
    port: Option<u16>,

    /// Extra configuration file layered over config/
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load_with(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.debug {
        config.observability.log_level = "debug".to_string();
    }
    config.validate()?;

    init_tracing(&config.observability);

    tracing::info!("Starting Financiera API v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Configuration loaded: {:?}", config.server);

    let db_pool = create_pool(&config.database).await?;
    tracing::info!("Database connection pool created");

    if config.database.run_migrations {
        run_migrations(&db_pool).await?;
        tracing::info!("Database migrations completed");
    }

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let limiter = SlidingWindowLimiter::new(
        config.rate_limit.max_requests,
        config.rate_limit.window(),
        clock.clone(),
    )?;
    tracing::info!(
        max_requests = config.rate_limit.max_requests,
        window_seconds = config.rate_limit.window_seconds,
        "Rate limiter initialized"
    );

    let store = open_store(&config.cache).await?;
    let cache = ExpiringCache::new(store, config.cache.ttl(), clock.clone())?;

    let repository: Arc<dyn StockRepository> = Arc::new(SqliteStockRepository::new(db_pool.clone()));
    let gate = RequestGate::new(Arc::new(limiter), Arc::new(cache));
    let state = AppState::new(gate, repository, clock);

    let app = create_router(state, &config.security, &config.server.index_file);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    db_pool.close().await;
    tracing::info!("Financiera API stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
