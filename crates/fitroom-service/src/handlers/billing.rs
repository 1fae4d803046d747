//! Package catalog, balance, ledger, and checkout handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use fitroom_core::{LedgerEntry, PaymentId, PaymentPackage};

use crate::auth::AuthUser;
use crate::billing::{CheckoutReceipt, CheckoutRequest, PaymentView};
use crate::error::ApiError;
use crate::state::AppState;

/// Package response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageResponse {
    /// Package code.
    pub code: String,
    /// Display title.
    pub title: String,
    /// Credits granted.
    pub credits: i64,
    /// Price in minor units.
    pub amount_minor: i64,
    /// Currency code.
    pub currency: String,
}

impl From<&PaymentPackage> for PackageResponse {
    fn from(package: &PaymentPackage) -> Self {
        Self {
            code: package.code.clone(),
            title: package.title.clone(),
            credits: package.credits,
            amount_minor: package.amount_minor,
            currency: package.currency.clone(),
        }
    }
}

/// List active packages, cheapest first.
pub async fn list_packages(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<PackageResponse>>, ApiError> {
    let packages = state.store.list_active_packages()?;
    Ok(Json(packages.iter().map(PackageResponse::from).collect()))
}

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current credit balance.
    pub balance: i64,
}

/// Get the caller's current balance.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let balance = state.ledger.balance(auth.user_id)?;
    Ok(Json(BalanceResponse { balance }))
}

/// Ledger list query parameters.
#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    /// Maximum number of entries to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

/// Ledger entry response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryResponse {
    /// Entry id.
    pub id: String,
    /// Signed delta.
    pub delta: i64,
    /// Balance after the delta.
    pub balance_after: i64,
    /// Reason tag.
    pub reason: String,
    /// Referenced payment, for topups.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    /// Referenced job, for charges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for LedgerEntryResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            delta: entry.delta,
            balance_after: entry.balance_after,
            reason: entry.reason.to_string(),
            payment_id: entry.payment_id.map(|id| id.to_string()),
            job_id: entry.job_id.map(|id| id.to_string()),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// Ledger list response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerResponse {
    /// Entries, newest first.
    pub entries: Vec<LedgerEntryResponse>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List the caller's ledger history, newest first.
pub async fn list_ledger(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<LedgerResponse>, ApiError> {
    // Fetch one more than requested to determine has_more.
    let limit = query.limit.min(100);
    let entries = state.ledger.history(auth.user_id, limit + 1, query.offset)?;

    let has_more = entries.len() > limit;
    let entries: Vec<_> = entries
        .iter()
        .take(limit)
        .map(LedgerEntryResponse::from)
        .collect();

    Ok(Json(LedgerResponse { entries, has_more }))
}

/// Start a checkout for a package.
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(request): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutReceipt>), ApiError> {
    let receipt = state
        .checkout()?
        .create_checkout(auth.user_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Poll a payment's status, refreshing from the gateway when still open.
pub async fn payment_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(payment_id): Path<PaymentId>,
) -> Result<Json<PaymentView>, ApiError> {
    let view = state
        .checkout()?
        .payment_status(auth.user_id, payment_id)
        .await?;
    Ok(Json(view))
}
