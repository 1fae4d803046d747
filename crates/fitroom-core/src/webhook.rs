//! Webhook event records, used solely for deduplication.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::PaymentProvider;

/// A processed webhook delivery.
///
/// One row exists per (provider, event id). Providers deliver at least once,
/// so the settlement pipeline records an event here before acting on it and
/// treats an existing row as an already-handled duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    /// Row id.
    pub id: Uuid,

    /// The provider that delivered the event.
    pub provider: PaymentProvider,

    /// The provider's event id, or a content hash of the raw body when the
    /// payload carries none.
    pub provider_event_id: String,

    /// Raw request body as delivered.
    pub payload: String,

    /// When the event was first processed.
    pub processed_at: DateTime<Utc>,
}

impl WebhookEvent {
    /// Create an event record for a delivery.
    #[must_use]
    pub fn new(provider: PaymentProvider, provider_event_id: String, payload: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider,
            provider_event_id,
            payload: payload.to_string(),
            processed_at: Utc::now(),
        }
    }
}
