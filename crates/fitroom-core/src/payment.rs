//! Payment types for fitroom billing.
//!
//! A `Payment` tracks one checkout attempt from creation through settlement.
//! Packages define what can be bought; the amount and currency are copied
//! onto the payment at creation time so later catalog edits never change
//! what a historical payment charged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{PaymentId, UserId};

/// The hosted-checkout provider backing a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    /// Stripe hosted checkout.
    Stripe,
}

impl fmt::Display for PaymentProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stripe => write!(f, "STRIPE"),
        }
    }
}

/// Lifecycle status of a payment.
///
/// `Created → Pending → {Paid, Failed, Expired, Canceled}`. The four named
/// outcomes are terminal: once reached, the status never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Payment row exists, no gateway session yet.
    Created,
    /// Gateway session issued, outcome unknown.
    Pending,
    /// Captured; credits have been (or are being) granted.
    Paid,
    /// The provider reported a failed capture.
    Failed,
    /// The checkout session expired unused.
    Expired,
    /// The user canceled at the provider.
    Canceled,
}

impl PaymentStatus {
    /// Whether this status permits no further transitions.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Paid | Self::Failed | Self::Expired | Self::Canceled)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Failed => "FAILED",
            Self::Expired => "EXPIRED",
            Self::Canceled => "CANCELED",
        };
        write!(f, "{name}")
    }
}

/// A purchasable credit package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentPackage {
    /// Unique package code, referenced by payments.
    pub code: String,

    /// Display title shown on the checkout page.
    pub title: String,

    /// Credits granted when a payment for this package settles.
    pub credits: i64,

    /// Price in integer minor units (cents).
    pub amount_minor: i64,

    /// ISO 4217 currency code.
    pub currency: String,

    /// Inactive packages cannot start new checkouts but still settle
    /// payments that already reference them.
    pub active: bool,
}

impl PaymentPackage {
    /// The catalog seeded on first boot when the store holds no packages.
    #[must_use]
    pub fn default_catalog() -> Vec<Self> {
        vec![
            Self {
                code: "starter".into(),
                title: "Starter".into(),
                credits: 10,
                amount_minor: 500,
                currency: "USD".into(),
                active: true,
            },
            Self {
                code: "wardrobe".into(),
                title: "Wardrobe".into(),
                credits: 30,
                amount_minor: 1200,
                currency: "USD".into(),
                active: true,
            },
            Self {
                code: "studio".into(),
                title: "Studio".into(),
                credits: 75,
                amount_minor: 2500,
                currency: "USD".into(),
                active: true,
            },
        ]
    }
}

/// A payment attempt.
///
/// Created in `Created` status by the checkout orchestrator and mutated only
/// by the settlement engine afterwards. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id.
    pub id: PaymentId,

    /// Owning user.
    pub user_id: UserId,

    /// Code of the package being purchased.
    pub package_code: String,

    /// The provider handling this payment.
    pub provider: PaymentProvider,

    /// Provider-assigned checkout session id, set once the gateway responds.
    pub provider_session_id: Option<String>,

    /// Amount in minor units, copied from the package at creation time.
    pub amount_minor: i64,

    /// Currency code, copied from the package at creation time.
    pub currency: String,

    /// Current lifecycle status.
    pub status: PaymentStatus,

    /// Hosted checkout URL the client is redirected to.
    pub redirect_url: Option<String>,

    /// Last raw provider payload seen for this payment (audit only).
    pub provider_payload: Option<String>,

    /// When the payment row was created.
    pub created_at: DateTime<Utc>,

    /// When the payment row was last updated.
    pub updated_at: DateTime<Utc>,

    /// When the payment settled as paid. Set once.
    pub paid_at: Option<DateTime<Utc>>,
}

impl Payment {
    /// Create a new payment for a package in `Created` status.
    #[must_use]
    pub fn new(user_id: UserId, package: &PaymentPackage, provider: PaymentProvider) -> Self {
        let now = Utc::now();
        Self {
            id: PaymentId::generate(),
            user_id,
            package_code: package.code.clone(),
            provider,
            provider_session_id: None,
            amount_minor: package.amount_minor,
            currency: package.currency.clone(),
            status: PaymentStatus::Created,
            redirect_url: None,
            provider_payload: None,
            created_at: now,
            updated_at: now,
            paid_at: None,
        }
    }
}
