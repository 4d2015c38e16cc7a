//! # cart-api
//!
//! HTTP API layer for checkout-cache-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server
//! - Payment-session endpoint backed by the session-secret cache
//! - Cache administration endpoints and a periodic expiry sweep
//!
//! ## Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | GET | `/health` | Health check |
//! | POST | `/api/v1/payment-session` | Resolve a session secret for a cart |
//! | GET | `/api/v1/cache/stats` | Cache entry counts |
//! | POST | `/api/v1/cache/sweep` | Evict expired entries |
//! | DELETE | `/api/v1/cache` | Evict all entries |

pub mod handlers;
pub mod routes;
pub mod state;
pub mod sweep;

pub use routes::create_router;
pub use state::{AppConfig, AppState, ServiceCache};
pub use sweep::spawn_expiry_sweep;
