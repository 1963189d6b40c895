use courtside_fulfillment::{api, config::Config, state::AppState, sweep, worker};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "courtside_fulfillment=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting courtside-fulfillment (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Build router
    let app = api::create_router(state.clone());

    // Background operations worker (second charges, tournament entries)
    tokio::spawn(worker::run(state.clone()));

    // Hold-expiry sweep
    tokio::spawn(sweep::run(state.clone()));

    // Start HTTP server
    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("courtside-fulfillment HTTP listening on {http_addr}");

    axum::serve(http_listener, app).await?;

    Ok(())
}
