//! Service descriptor and health endpoints.

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::State;
use tracing::warn;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{HealthResponse, ServiceDescriptor};
use crate::routes;

/// `GET /`: service name, version and endpoint map.
pub async fn root_handler() -> Json<ServiceDescriptor> {
    let endpoints = BTreeMap::from([
        ("get_messages".to_string(), routes::API_MESSAGES.to_string()),
        (
            "send_message".to_string(),
            format!("{} (POST)", routes::API_MESSAGES),
        ),
    ]);
    Json(ServiceDescriptor {
        message: "AI Chat API".into(),
        version: chatrelay_core::version().into(),
        endpoints,
    })
}

/// `GET /health`: liveness only; dependencies are not checked.
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
    })
}

/// `GET /health/ready`: 200 when the message store answers, 503 otherwise.
pub async fn readiness_handler(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let store = state.relay.store();
    if store.health_check().await {
        Ok(Json(HealthResponse {
            status: "ready".into(),
        }))
    } else {
        warn!(store = store.name(), "readiness check failed");
        Err(AppError::StoreUnavailable(format!(
            "{} message store is unreachable",
            store.name()
        )))
    }
}
