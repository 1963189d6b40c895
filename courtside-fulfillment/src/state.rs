//! Application state for courtside-fulfillment

use sqlx::PgPool;

use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// HTTP client for gateway REST calls
    pub http: reqwest::Client,
    /// Payment gateway secret key
    pub gateway_secret_key: String,
    /// Payment gateway webhook signing secret
    pub gateway_webhook_secret: String,
    /// NEEDS_AUTH grace window, in hours
    pub grace_window_hours: i64,
    /// Partner-seat hold lifetime, in minutes
    pub hold_ttl_minutes: i64,
}

impl AppState {
    /// Create a new AppState: connect to Postgres and run migrations
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database connected, migrations applied");

        Ok(Self {
            pool,
            http: reqwest::Client::new(),
            gateway_secret_key: config.gateway_secret_key.clone(),
            gateway_webhook_secret: config.gateway_webhook_secret.clone(),
            grace_window_hours: config.grace_window_hours,
            hold_ttl_minutes: config.hold_ttl_minutes,
        })
    }
}
