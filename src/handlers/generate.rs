use axum::{Json, extract::State, extract::rejection::JsonRejection, http::HeaderMap};
use std::time::Instant;

use crate::client_key::bearer_token;
use crate::error::{ApiError, GateError};
use crate::metrics::{
    PROVIDER_FAILURES, PROVIDER_LATENCY, RATE_LIMITED, REQUEST_TOTAL, TRACKED_KEYS,
};
use crate::models::{BlogPostRequest, BlogPostResponse};
use crate::state::SharedState;

pub async fn generate_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<BlogPostRequest>, JsonRejection>,
) -> Result<Json<BlogPostResponse>, ApiError> {
    REQUEST_TOTAL.inc();

    // Gate runs before the body is looked at or any provider work
    let client_key = state.key_strategy.client_key(&headers);
    let admitted = state.gate.check(state.generate_limit, &client_key);
    TRACKED_KEYS.set(state.gate.len() as f64);
    if let Err(err) = admitted {
        if let GateError::RateLimitExceeded {
            limit, retry_after, ..
        } = &err
        {
            RATE_LIMITED.inc();
            tracing::debug!(
                limit,
                retry_after_ms = retry_after.as_millis() as u64,
                "request rejected by admission gate"
            );
        }
        return Err(err.into());
    }

    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection.body_text(), "unreadable request body");
        ApiError::BadRequest("Invalid request body".to_string())
    })?;

    if !payload.is_complete() {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    }

    let start_time = Instant::now();
    let result = state
        .provider
        .generate(&payload, bearer_token(&headers))
        .await;
    PROVIDER_LATENCY.observe(start_time.elapsed().as_secs_f64());

    let content = result.inspect_err(|_| PROVIDER_FAILURES.inc())?;

    tracing::info!(url = %payload.url, "blog post generated");

    Ok(Json(BlogPostResponse { content }))
}
