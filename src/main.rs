use progress_tracker::{
    AppConfig, AppState, CounterService, DocumentStore, router,
    clock::{Clock, FixedClock, LocalClock},
    tracker::AuthState,
};
use std::{net::SocketAddr, sync::Arc};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = AppConfig::from_env()?;
    if let Some(parent) = config.data_path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let store = DocumentStore::open(&config.data_path).await;
    let service = CounterService::new(Arc::new(store), config.app_id.clone());
    if let Err(err) = service
        .apply_auth(AuthState::SignedIn(config.user_id.clone()))
        .await
    {
        warn!(error = %err, "initial sign-in failed");
    }

    let clock: Arc<dyn Clock> = match config.today {
        Some(date) => {
            info!(%date, "clock pinned");
            Arc::new(FixedClock::new(date))
        }
        None => Arc::new(LocalClock),
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let app = router(AppState::new(service, clock, config));

    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
