//! # Checkout Cache
//!
//! Payment-session service with cart-keyed secret caching.
//!
//! ## Usage
//!
//! ```bash
//! # Set environment variables
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_PUBLISHABLE_KEY=pk_test_...
//! export CACHE_TTL_SECS=1800
//!
//! # Run the server
//! checkout-cache
//! ```

use cart_api::{routes, spawn_expiry_sweep, state::AppState};
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    print_banner();

    let state = AppState::new()?;

    let addr = state.config.socket_addr()?;
    let is_prod = state.config.is_production();

    info!("Environment: {}", state.config.environment);
    info!("Payment provider: {}", state.provider.provider_name());
    info!(
        "Session cache TTL: {}s, prefix: {}",
        state.cache_config.ttl_secs, state.cache_config.key_prefix
    );

    let sweeper = match state.cache_config.sweep_interval() {
        Some(period) => Some(spawn_expiry_sweep(state.cache.clone(), period)),
        None => {
            warn!("Session cache sweep disabled; expired entries are only evicted on read");
            None
        }
    };

    let app = routes::create_router(state);

    info!("Checkout cache starting on http://{}", addr);

    if !is_prod {
        info!("Session: POST http://{}/api/v1/payment-session", addr);
        info!("Stats:   GET  http://{}/api/v1/cache/stats", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("Shut down");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}

fn print_banner() {
    println!(
        r#"
  Checkout Cache RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Cart-keyed payment sessions
  Version: {}

"#,
        env!("CARGO_PKG_VERSION")
    );
}
