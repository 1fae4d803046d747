//! Application state.

use std::sync::Arc;

use fitroom_store::Store;

use crate::billing::{CheckoutOrchestrator, CreditLedger, SettlementEngine, WebhookProcessor};
use crate::config::ServiceConfig;
use crate::error::ApiError;
use crate::gateway::StripeGateway;
use crate::webhook_verifier::WebhookVerifier;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The storage backend.
    pub store: Arc<dyn Store>,

    /// Service configuration.
    pub config: ServiceConfig,

    /// The credit ledger service.
    pub ledger: CreditLedger,

    /// The settlement engine.
    pub settlement: SettlementEngine,

    /// Checkout orchestration; absent when Stripe is not configured.
    pub checkout: Option<CheckoutOrchestrator>,

    /// Webhook processing; absent when no signing secret is configured.
    pub webhooks: Option<WebhookProcessor>,
}

impl AppState {
    /// Create the application state, wiring services from configuration.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: ServiceConfig) -> Self {
        let ledger = CreditLedger::new(Arc::clone(&store));
        let settlement = SettlementEngine::new(Arc::clone(&store), ledger.clone());

        let checkout = match StripeGateway::new(
            &config.stripe_base_url,
            config.stripe_secret_key.as_deref(),
        ) {
            Ok(gateway) => {
                tracing::info!("Stripe gateway enabled");
                Some(CheckoutOrchestrator::new(
                    Arc::clone(&store),
                    Arc::new(gateway),
                    settlement.clone(),
                ))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stripe not configured - checkout endpoints disabled");
                None
            }
        };

        let webhooks = match WebhookVerifier::new(
            config.stripe_webhook_secret.as_deref(),
            config.signature_tolerance_seconds,
        ) {
            Ok(verifier) => Some(WebhookProcessor::new(
                Arc::clone(&store),
                settlement.clone(),
                verifier,
            )),
            Err(e) => {
                tracing::warn!(error = %e, "Webhook secret not configured - webhook endpoint disabled");
                None
            }
        };

        Self {
            store,
            config,
            ledger,
            settlement,
            checkout,
            webhooks,
        }
    }

    /// The checkout orchestrator, or a configuration error when Stripe is
    /// not set up. Endpoints fail loudly rather than limping along without
    /// a gateway.
    pub fn checkout(&self) -> Result<&CheckoutOrchestrator, ApiError> {
        self.checkout
            .as_ref()
            .ok_or_else(|| ApiError::Configuration("STRIPE_SECRET_KEY is not configured".into()))
    }

    /// The webhook processor, or a configuration error when no signing
    /// secret is set. Verification is never skipped.
    pub fn webhooks(&self) -> Result<&WebhookProcessor, ApiError> {
        self.webhooks
            .as_ref()
            .ok_or_else(|| ApiError::Configuration("STRIPE_WEBHOOK_SECRET is not configured".into()))
    }
}
