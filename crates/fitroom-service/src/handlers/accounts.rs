//! Account provisioning handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use fitroom_core::CreditAccount;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current credit balance.
    pub balance: i64,
    /// Created timestamp.
    pub created_at: String,
}

impl From<&CreditAccount> for AccountResponse {
    fn from(account: &CreditAccount) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            balance: account.balance,
            created_at: account.created_at.to_rfc3339(),
        }
    }
}

/// Create the caller's credit account, granting the welcome bonus once.
///
/// Idempotent: re-provisioning returns the existing account unchanged.
pub async fn create_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state.ledger.open_account(auth.user_id).await?;
    Ok(Json(AccountResponse::from(&account)))
}
