//! Rate-limited gateway in front of a chat-completions API that turns a
//! blog builder form into generated SEO content.

pub mod client_key;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod rate_limit;
pub mod state;

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers::{generate_handler, health_handler, metrics_handler};
use crate::state::SharedState;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/generate-blog-post", post(generate_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}
