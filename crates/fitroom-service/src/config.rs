//! Service configuration.

/// Default tolerance for webhook signature timestamps, in seconds.
pub const DEFAULT_SIGNATURE_TOLERANCE_SECONDS: u64 = 300;

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/fitroom").
    pub data_dir: String,

    /// Shared API key for the try-on worker's charge endpoint.
    pub service_api_key: Option<String>,

    /// Stripe API base URL (default: `<https://api.stripe.com/v1>`;
    /// overridable so tests can point at a stub server).
    pub stripe_base_url: String,

    /// Stripe secret API key (`sk_test_...` / `sk_live_...`).
    pub stripe_secret_key: Option<String>,

    /// Stripe webhook signing secret (`whsec_...`).
    pub stripe_webhook_secret: Option<String>,

    /// Webhook signature timestamp tolerance in seconds. A floor of 30
    /// seconds is enforced regardless of this value.
    pub signature_tolerance_seconds: u64,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            listen_addr: std::env::var("LISTEN_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".into()),
            data_dir: std::env::var("DATA_DIR").unwrap_or_else(|_| "/data/fitroom".into()),
            service_api_key: std::env::var("SERVICE_API_KEY").ok(),
            stripe_base_url: std::env::var("STRIPE_BASE_URL")
                .unwrap_or_else(|_| "https://api.stripe.com/v1".into()),
            stripe_secret_key: std::env::var("STRIPE_SECRET_KEY").ok(),
            stripe_webhook_secret: std::env::var("STRIPE_WEBHOOK_SECRET").ok(),
            signature_tolerance_seconds: std::env::var("STRIPE_SIGNATURE_TOLERANCE_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SIGNATURE_TOLERANCE_SECONDS),
            cors_origins: std::env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "*".into())
                .split(',')
                .map(|s| s.trim().to_string())
                .collect(),
            max_body_bytes: std::env::var("MAX_BODY_BYTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1024 * 1024), // 1MB
            request_timeout_seconds: std::env::var("REQUEST_TIMEOUT_SECONDS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/fitroom".into(),
            service_api_key: None,
            stripe_base_url: "https://api.stripe.com/v1".into(),
            stripe_secret_key: None,
            stripe_webhook_secret: None,
            signature_tolerance_seconds: DEFAULT_SIGNATURE_TOLERANCE_SECONDS,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
        }
    }
}
