//! Convene server entry point.

use convene::server::{config, init};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,convene=debug".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let server_config = config::ServerConfig::from_env();
    let db_pool = config::load_database().await?;

    let app = init::create_app(db_pool).await;

    let listener = tokio::net::TcpListener::bind(server_config.bind_addr).await?;
    tracing::info!("Listening on {}", server_config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
