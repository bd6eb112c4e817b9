use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Redis backs the scheduled-job queue.
    pub redis_url: String,
    /// PEM public key of the Clerk instance, used to verify session cookies
    /// and bearer tokens without a network round trip.
    pub clerk_jwt_key: String,
    /// Expected `iss` claim (the Clerk frontend API URL).
    #[serde(default)]
    pub clerk_issuer: Option<String>,
    /// Comma-separated list of accepted `azp` origins. Empty accepts any.
    #[serde(default)]
    pub clerk_authorized_parties: Option<String>,
    pub imagekit_private_key: String,
    /// Delivery endpoint, e.g. https://ik.imagekit.io/your_id
    pub imagekit_url_endpoint: String,
    /// Upper bound for multipart bodies (story videos included).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_job_poll_interval_secs")]
    pub job_poll_interval_secs: u64,
    /// Timeout for calls to ImageKit.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Web client origin allowed to send credentialed requests.
    #[serde(default)]
    pub cors_origin: Option<String>,
    /// Set to "production" for JSON logging, anything else for human-readable.
    #[serde(default)]
    pub env: String,
    /// Sentry DSN for error tracking
    #[serde(default)]
    pub sentry_dsn: Option<String>,
}

fn default_max_upload_bytes() -> usize {
    50 * 1024 * 1024
}

fn default_job_poll_interval_secs() -> u64 {
    30
}

fn default_http_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn is_production(&self) -> bool {
        self.env == "production"
    }

    pub fn authorized_parties(&self) -> Vec<String> {
        self.clerk_authorized_parties
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}
