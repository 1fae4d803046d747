//! Core types and pure logic for the fitroom billing subsystem.
//!
//! This crate provides the foundational types shared by the storage layer
//! and the HTTP service:
//!
//! - **Identifiers**: `UserId`, `PaymentId`, `JobId`, `LedgerEntryId`
//! - **Payments**: `Payment`, `PaymentStatus`, `PaymentPackage`
//! - **Ledger**: `CreditAccount`, `LedgerEntry`, `LedgerReason`
//! - **Webhooks**: `WebhookEvent`
//! - **Status mapping**: the pure provider-status translation functions
//!
//! # Credits
//!
//! Credits are whole units ("1 try-on render = 1 credit"), stored as `i64`.
//! Package prices are integer minor units (cents) so no floating point ever
//! touches money.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod ledger;
pub mod payment;
pub mod status_map;
pub mod webhook;

pub use error::{BillingError, Result};
pub use ids::{IdError, JobId, LedgerEntryId, PaymentId, UserId};
pub use ledger::{CreditAccount, LedgerEntry, LedgerReason, WELCOME_CREDITS};
pub use payment::{Payment, PaymentPackage, PaymentProvider, PaymentStatus};
pub use status_map::{map_session_status, map_webhook_status};
pub use webhook::WebhookEvent;
