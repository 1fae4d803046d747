//! Provider status mapping.
//!
//! Stripe reports a checkout session through two fields: the session
//! lifecycle (`status`: open/complete/expired/...) and the payment capture
//! (`payment_status`: paid/unpaid/failed/...). Both the checkout-creation
//! path and the webhook path translate that pair into a local
//! [`PaymentStatus`] through these functions, so the two sources of truth
//! can never disagree on the mapping.
//!
//! Unrecognized or ambiguous combinations deliberately map to `Pending`:
//! a pending payment can still be settled by a later event, while a wrong
//! terminal classification could not be undone.

use crate::PaymentStatus;

/// Map the session-lifecycle and payment-capture fields to a local status.
///
/// Inputs are trimmed and compared case-insensitively; `None` behaves like
/// an empty string. Capture `paid` wins over every session state.
#[must_use]
pub fn map_session_status(
    session_status: Option<&str>,
    capture_status: Option<&str>,
) -> PaymentStatus {
    let session = normalize(session_status);
    let capture = normalize(capture_status);

    if capture == "paid" {
        return PaymentStatus::Paid;
    }
    if session == "canceled" || session == "cancelled" {
        return PaymentStatus::Canceled;
    }
    if session == "expired" {
        return PaymentStatus::Expired;
    }
    if session == "complete" && capture == "unpaid" {
        return PaymentStatus::Failed;
    }
    if capture == "failed" {
        return PaymentStatus::Failed;
    }
    PaymentStatus::Pending
}

/// Map a webhook delivery to a local status.
///
/// A few event types are unambiguous on their own and short-circuit;
/// everything else (including unknown event types) falls back to the
/// generic field mapping.
#[must_use]
pub fn map_webhook_status(
    event_type: &str,
    session_status: Option<&str>,
    capture_status: Option<&str>,
) -> PaymentStatus {
    match event_type.trim().to_ascii_lowercase().as_str() {
        "checkout.session.expired" => PaymentStatus::Expired,
        "checkout.session.async_payment_failed" => PaymentStatus::Failed,
        _ => map_session_status(session_status, capture_status),
    }
}

fn normalize(value: Option<&str>) -> String {
    value.unwrap_or("").trim().to_ascii_lowercase()
}
