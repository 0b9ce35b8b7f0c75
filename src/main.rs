use route_optimizer::{create_router, AppState, Config, Result};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let state = AppState::from_config(&config)?;

    if !state.optimizer.is_configured() {
        warn!("MAPBOX_ACCESS_TOKEN is not set; optimize requests will answer with fallback responses");
    }
    if !config.rate_limit.is_enabled() {
        warn!("rate limiting disabled");
    }

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(addr = %config.bind_addr, "route optimizer listening");

    // peer addresses key the rate limiter when no proxy header is present
    let app = create_router(state).into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app).await?;
    Ok(())
}
