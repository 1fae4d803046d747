//! Webhook signature verification.
//!
//! Stripe signs each delivery with a header of the form
//! `t=<unix-seconds>,v1=<hex>[,v1=<hex>,...]` over `"<t>.<raw body>"`.
//! Multiple `v1` entries appear while signing secrets rotate; the delivery
//! is authentic if any of them matches. The timestamp bounds replay: a
//! captured delivery is only accepted within the configured tolerance.

use chrono::Utc;

use fitroom_core::BillingError;

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

/// Lower bound on the timestamp tolerance. Configuring anything smaller is
/// clamped up to this, so a bad config value cannot reject live traffic.
pub const MIN_SIGNATURE_TOLERANCE_SECONDS: u64 = 30;

/// Verifies webhook deliveries against the signing secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
    tolerance_seconds: u64,
}

impl WebhookVerifier {
    /// Create a verifier.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::Configuration` when no signing secret is
    /// configured. Verification must never silently pass without one, so
    /// this fails here rather than inside `verify`.
    pub fn new(secret: Option<&str>, tolerance_seconds: u64) -> Result<Self, BillingError> {
        let secret = secret
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                BillingError::Configuration("STRIPE_WEBHOOK_SECRET is not configured".into())
            })?;

        Ok(Self {
            secret: secret.to_string(),
            tolerance_seconds,
        })
    }

    /// Verify a delivery. Returns `false` for anything malformed; never errors.
    #[must_use]
    pub fn verify(&self, signature_header: &str, raw_body: &str) -> bool {
        self.verify_at(signature_header, raw_body, Utc::now().timestamp())
    }

    fn verify_at(&self, signature_header: &str, raw_body: &str, now: i64) -> bool {
        if signature_header.trim().is_empty() {
            return false;
        }

        let parsed = parse_signature_header(signature_header);
        let Some(timestamp) = parsed.timestamp else {
            return false;
        };
        if parsed.signatures.is_empty() {
            return false;
        }

        let tolerance = self.tolerance_seconds.max(MIN_SIGNATURE_TOLERANCE_SECONDS);
        if (now - timestamp).unsigned_abs() > tolerance {
            return false;
        }

        let signed_payload = format!("{timestamp}.{raw_body}");
        let expected = hmac_sha256_hex(&self.secret, &signed_payload);

        parsed
            .signatures
            .iter()
            .any(|signature| constant_time_eq(&expected, signature))
    }
}

struct ParsedSignature {
    timestamp: Option<i64>,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ParsedSignature {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for token in header.split(',') {
        let part = token.trim();
        let Some(delimiter) = part.find('=') else {
            continue;
        };
        if delimiter == 0 || delimiter == part.len() - 1 {
            continue;
        }

        let key = part[..delimiter].trim();
        let value = part[delimiter + 1..].trim().to_ascii_lowercase();
        match key {
            "t" => {
                let Ok(parsed) = value.parse::<i64>() else {
                    // A malformed timestamp invalidates the whole header.
                    return ParsedSignature {
                        timestamp: None,
                        signatures: Vec::new(),
                    };
                };
                timestamp = Some(parsed);
            }
            "v1" if !value.is_empty() => signatures.push(value),
            _ => {}
        }
    }

    ParsedSignature {
        timestamp,
        signatures,
    }
}
