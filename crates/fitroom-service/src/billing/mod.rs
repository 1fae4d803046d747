//! Billing domain services.
//!
//! The handlers stay thin; the payment lifecycle lives here:
//!
//! - [`CreditLedger`]: concurrency-safe balance mutation with an
//!   append-only audit trail
//! - [`SettlementEngine`]: the single funnel both webhook and poll paths
//!   feed provider outcomes through
//! - [`CheckoutOrchestrator`]: checkout creation and status polling
//! - [`WebhookProcessor`]: verify, dedup, locate, map, settle

pub mod checkout;
pub mod ledger;
pub mod settlement;
pub mod webhook;

pub use checkout::{CheckoutOrchestrator, CheckoutReceipt, CheckoutRequest, PaymentView};
pub use ledger::CreditLedger;
pub use settlement::SettlementEngine;
pub use webhook::{WebhookOutcome, WebhookProcessor};
