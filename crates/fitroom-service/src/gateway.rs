//! Payment gateway abstraction and the Stripe implementation.
//!
//! The billing services program against [`PaymentGateway`] so settlement and
//! checkout logic never depend on Stripe's wire format directly; tests
//! exercise the real [`StripeGateway`] against a stub HTTP server instead of
//! mocking the trait.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;

use fitroom_core::{map_session_status, BillingError, Payment, PaymentPackage, PaymentStatus};

/// Fallback session lifetime when the provider omits `expires_at`.
const DEFAULT_SESSION_LIFETIME: Duration = Duration::from_secs(30 * 60);

/// Bounded timeout for gateway calls so a slow provider cannot pin a request.
const GATEWAY_TIMEOUT: Duration = Duration::from_secs(30);

/// Client-supplied parameters for a checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutParams {
    /// Where the provider redirects after a successful payment.
    pub success_url: String,
    /// Where the provider redirects after cancellation.
    pub cancel_url: String,
}

/// A newly created checkout session.
#[derive(Debug, Clone)]
pub struct CheckoutSession {
    /// Provider-assigned session id.
    pub session_id: String,
    /// Hosted checkout URL to redirect the client to.
    pub redirect_url: String,
    /// The session's status mapped to the local lifecycle.
    pub status: PaymentStatus,
    /// When the session expires.
    pub expires_at: DateTime<Utc>,
    /// Raw provider response body, stored for audit.
    pub raw_payload: String,
}

/// A session status query result.
#[derive(Debug, Clone)]
pub struct SessionStatus {
    /// The session's status mapped to the local lifecycle.
    pub status: PaymentStatus,
    /// Raw provider response body.
    pub raw_payload: String,
}

/// Abstraction over the hosted-checkout provider.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session for a payment.
    async fn create_checkout_session(
        &self,
        payment: &Payment,
        package: &PaymentPackage,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BillingError>;

    /// Query the current status of a session.
    async fn session_status(&self, session_id: &str) -> Result<SessionStatus, BillingError>;
}

/// Stripe checkout-session gateway.
pub struct StripeGateway {
    client: Client,
    base_url: String,
    secret_key: String,
}

impl StripeGateway {
    /// Create a Stripe gateway.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Configuration` when the secret key is missing
    /// or the HTTP client cannot be built.
    pub fn new(base_url: &str, secret_key: Option<&str>) -> Result<Self, BillingError> {
        let secret_key = secret_key
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                BillingError::Configuration("STRIPE_SECRET_KEY is not configured".into())
            })?;

        let client = Client::builder()
            .timeout(GATEWAY_TIMEOUT)
            .build()
            .map_err(|e| BillingError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn read_body(response: reqwest::Response, action: &str) -> Result<String, BillingError> {
        let status = response.status();
        let body = response.text().await.map_err(|e| external(action, &e))?;

        if !status.is_success() {
            return Err(BillingError::ExternalService {
                service: "stripe".into(),
                message: format!("{action} failed: HTTP {status}"),
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_checkout_session(
        &self,
        payment: &Payment,
        package: &PaymentPackage,
        params: &CheckoutParams,
    ) -> Result<CheckoutSession, BillingError> {
        // The metadata mirrors the local payment so a webhook can recover it
        // even when the session-id index misses.
        let form: Vec<(&str, String)> = vec![
            ("mode", "payment".into()),
            ("success_url", params.success_url.clone()),
            ("cancel_url", params.cancel_url.clone()),
            ("client_reference_id", payment.id.to_string()),
            ("metadata[paymentId]", payment.id.to_string()),
            ("metadata[userId]", payment.user_id.to_string()),
            ("metadata[packageCode]", package.code.clone()),
            ("metadata[amountMinor]", payment.amount_minor.to_string()),
            ("metadata[currency]", payment.currency.clone()),
            ("payment_method_types[0]", "card".into()),
            ("line_items[0][quantity]", "1".into()),
            (
                "line_items[0][price_data][currency]",
                payment.currency.to_lowercase(),
            ),
            (
                "line_items[0][price_data][unit_amount]",
                payment.amount_minor.to_string(),
            ),
            (
                "line_items[0][price_data][product_data][name]",
                package.title.clone(),
            ),
            (
                "line_items[0][price_data][product_data][description]",
                format!("+{} credits", package.credits),
            ),
        ];

        let response = self
            .client
            .post(format!("{}/checkout/sessions", self.base_url))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| external("create checkout session", &e))?;

        let body = Self::read_body(response, "create checkout session").await?;
        let root: serde_json::Value = serde_json::from_str(&body).map_err(|_| {
            BillingError::ExternalService {
                service: "stripe".into(),
                message: "checkout session response is not valid JSON".into(),
            }
        })?;

        let session_id = text(&root, "id");
        let redirect_url = text(&root, "url");
        let (Some(session_id), Some(redirect_url)) = (session_id, redirect_url) else {
            return Err(BillingError::ExternalService {
                service: "stripe".into(),
                message: "checkout session response is incomplete".into(),
            });
        };

        let status = map_session_status(text(&root, "status"), text(&root, "payment_status"));
        let expires_at = parse_unix_timestamp(root.get("expires_at").and_then(serde_json::Value::as_i64));

        Ok(CheckoutSession {
            session_id: session_id.to_string(),
            redirect_url: redirect_url.to_string(),
            status,
            expires_at,
            raw_payload: body,
        })
    }

    async fn session_status(&self, session_id: &str) -> Result<SessionStatus, BillingError> {
        let response = self
            .client
            .get(format!("{}/checkout/sessions/{session_id}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| external("session status", &e))?;

        let body = Self::read_body(response, "session status").await?;
        let root: serde_json::Value =
            serde_json::from_str(&body).map_err(|_| BillingError::ExternalService {
                service: "stripe".into(),
                message: "session status response is not valid JSON".into(),
            })?;

        let status = map_session_status(text(&root, "status"), text(&root, "payment_status"));

        Ok(SessionStatus {
            status,
            raw_payload: body,
        })
    }
}

fn external(action: &str, err: &dyn std::fmt::Display) -> BillingError {
    BillingError::ExternalService {
        service: "stripe".into(),
        message: format!("{action}: {err}"),
    }
}

fn text<'a>(value: &'a serde_json::Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_unix_timestamp(timestamp: Option<i64>) -> DateTime<Utc> {
    match timestamp {
        Some(seconds) if seconds > 0 => Utc
            .timestamp_opt(seconds, 0)
            .single()
            .unwrap_or_else(|| Utc::now() + DEFAULT_SESSION_LIFETIME),
        _ => Utc::now() + DEFAULT_SESSION_LIFETIME,
    }
}
