//! Fulfillment service configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fulfillment service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port (webhook + health)
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Payment gateway secret key (REST API)
    pub gateway_secret_key: String,
    /// Payment gateway webhook signing secret
    pub gateway_webhook_secret: String,
    /// Hours a split pairing may stay in NEEDS_AUTH before expiring
    pub grace_window_hours: i64,
    /// Minutes a partner-seat hold stays active
    pub hold_ttl_minutes: i64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            gateway_secret_key: Self::require_secret("GATEWAY_SECRET_KEY", &environment)?,
            gateway_webhook_secret: Self::require_secret("GATEWAY_WEBHOOK_SECRET", &environment)?,
            grace_window_hours: std::env::var("GRACE_WINDOW_HOURS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(24),
            hold_ttl_minutes: std::env::var("HOLD_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            environment,
        })
    }
}
