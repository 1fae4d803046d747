//! Error types for fitroom billing.

use crate::ids::IdError;

/// Result type for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;

/// Errors that can occur in billing operations.
#[derive(Debug, thiserror::Error)]
pub enum BillingError {
    /// Malformed or semantically invalid request input.
    #[error("validation error: {0}")]
    Validation(String),

    /// The referenced user, payment, or package does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A debit would take the balance below zero.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance in credits.
        balance: i64,
        /// Credits the operation needed.
        required: i64,
    },

    /// The payment gateway was unreachable or returned a malformed response.
    #[error("external service error: {service} - {message}")]
    ExternalService {
        /// The service that failed.
        service: String,
        /// Error message.
        message: String,
    },

    /// The webhook signature did not verify.
    #[error("invalid webhook signature")]
    BadSignature,

    /// A required secret or credential is missing.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}
