pub mod error;
pub mod middleware;
pub mod routes;

use db::DBService;
use services::services::{config::ServerConfig, notify::Notifier, payments::PaymentGateway};

#[derive(Clone)]
pub struct AppState {
    pub db: DBService,
    pub notifier: Notifier,
    pub gateway: PaymentGateway,
    pub config: ServerConfig,
}
