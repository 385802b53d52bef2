//! # chatrelay_api
//!
//! HTTP API library for chatrelay.

pub mod config;
pub mod cors;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;

use axum::Router;
use axum::routing::get;
use chatrelay_core::relay::ChatRelay;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{messages, service};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Send/fetch orchestration over the injected store and providers.
    pub relay: ChatRelay,
    /// API configuration.
    pub config: ApiConfig,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = cors::cors_layer(&state.config.allowed_origins);

    Router::new()
        .route(routes::ROOT, get(service::root_handler))
        .route(routes::HEALTH, get(service::health_handler))
        .route(routes::HEALTH_READY, get(service::readiness_handler))
        .route(
            routes::API_MESSAGES,
            get(messages::list_messages_handler).post(messages::send_message_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
