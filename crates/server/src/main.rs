use server::{AppState, routes};
use services::services::{
    config::{ConfigError, ServerConfig},
    email::EmailService,
    notify::Notifier,
    payments::PaymentGateway,
};
use sqlx::Error as SqlxError;
use thiserror::Error;
use tracing_subscriber::{EnvFilter, prelude::*};
use utils::assets::{asset_dir, paper_dir};

#[derive(Debug, Error)]
pub enum ConfdeskError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Sqlx(#[from] SqlxError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[tokio::main]
async fn main() -> Result<(), ConfdeskError> {
    // Load environment variables from `.env` if present.
    dotenv::dotenv().ok();

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let filter_string = format!(
        "warn,server={level},services={level},db={level},utils={level}",
        level = log_level
    );
    let env_filter = EnvFilter::try_new(filter_string).expect("Failed to create tracing filter");
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(env_filter))
        .init();

    // Create asset directories if they don't exist.
    if !asset_dir().exists() {
        std::fs::create_dir_all(asset_dir())?;
    }
    if !paper_dir().exists() {
        std::fs::create_dir_all(paper_dir())?;
    }

    let db = db::DBService::new().await?;

    let mailer = match EmailService::from_env() {
        Ok(mailer) => Some(mailer),
        Err(e) => {
            tracing::warn!("Email delivery disabled: {}", e);
            None
        }
    };

    let config = ServerConfig::from_env()?;
    let state = AppState {
        db,
        notifier: Notifier::new(mailer),
        gateway: PaymentGateway::from_env(),
        config: config.clone(),
    };

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;
    let addr = listener.local_addr()?;
    tracing::info!("Server running on http://{}", addr);

    axum::serve(listener, routes::router(state)).await?;

    Ok(())
}
