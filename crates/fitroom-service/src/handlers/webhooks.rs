//! Stripe webhook handler.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether the webhook was accepted.
    pub received: bool,
}

/// Handle a Stripe webhook delivery.
///
/// The body is taken verbatim: the signature covers the exact bytes as
/// sent, so no extractor may transform them first. Duplicates and events
/// for unknown payments answer 200 so the provider stops redelivering;
/// only signature and parse failures answer 400.
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    state.webhooks()?.process(signature, &body).await?;

    Ok(Json(WebhookResponse { received: true }))
}
