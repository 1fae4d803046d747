//! The charge boundary the try-on worker debits through.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use fitroom_core::{JobId, LedgerReason, UserId};

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Credits debited per try-on render job.
const TRY_ON_JOB_COST: i64 = 1;

/// Charge request from the try-on worker.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeRequest {
    /// The user to debit.
    pub user_id: UserId,
    /// The rendered job the charge pays for.
    pub job_id: JobId,
}

/// Charge response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChargeResponse {
    /// Credits debited.
    pub charged: i64,
    /// Balance after the charge.
    pub balance: i64,
}

/// Debit one credit for a completed try-on job.
///
/// Responds 402 with balance details when the debit would go negative.
pub async fn charge(
    State(state): State<Arc<AppState>>,
    _auth: ServiceAuth,
    Json(request): Json<ChargeRequest>,
) -> Result<Json<ChargeResponse>, ApiError> {
    let balance = state
        .ledger
        .adjust(
            request.user_id,
            -TRY_ON_JOB_COST,
            LedgerReason::TryOnCharge,
            None,
            Some(request.job_id),
        )
        .await?;

    Ok(Json(ChargeResponse {
        charged: TRY_ON_JOB_COST,
        balance,
    }))
}
