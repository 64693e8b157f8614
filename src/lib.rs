// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;
pub mod suggest;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::AppConfig;
pub use crate::suggest::AggregateSuggester;

/// Build the full router (suggest + health + /metrics) from configuration.
pub fn app(cfg: &AppConfig) -> anyhow::Result<axum::Router> {
    let state = AppState::from_config(cfg)?;
    let metrics = crate::metrics::Metrics::init()?;
    Ok(router(state).merge(metrics.router()))
}
