use axum::{
    Router,
    routing::IntoMakeService,
};
use tower_http::cors::CorsLayer;

use crate::AppState;

pub mod auth;
pub mod conferences;
pub mod export;
pub mod health;
pub mod invites;
pub mod notifications;
pub mod papers;
pub mod payments;
pub mod reviews;

pub fn app(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(auth::router())
        .merge(conferences::router())
        .merge(papers::router())
        .merge(reviews::router())
        .merge(invites::router())
        .merge(notifications::router())
        .merge(payments::router())
        .merge(export::router());

    Router::new()
        .merge(health::router())
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub fn router(state: AppState) -> IntoMakeService<Router> {
    app(state).into_make_service()
}
