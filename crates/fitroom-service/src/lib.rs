//! Fitroom billing HTTP service.
//!
//! This crate provides the HTTP API for the fitroom billing subsystem:
//!
//! - Account provisioning with a one-time welcome bonus
//! - Package catalog, balance, and ledger history
//! - Stripe hosted-checkout creation and status polling
//! - Signed Stripe webhooks with deduplicated, idempotent settlement
//! - The charge boundary the try-on worker debits through
//!
//! # Authentication
//!
//! Token issuance and verification live in the upstream identity layer; this
//! service receives the authenticated subject as a bearer value. Worker
//! endpoints use a shared service API key instead.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers need async for routing consistency

pub mod auth;
pub mod billing;
pub mod config;
pub mod crypto;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod webhook_verifier;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use gateway::{CheckoutParams, CheckoutSession, PaymentGateway, SessionStatus, StripeGateway};
pub use routes::create_router;
pub use state::AppState;
pub use webhook_verifier::WebhookVerifier;
