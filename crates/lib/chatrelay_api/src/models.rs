//! Request and response bodies.

use std::collections::BTreeMap;

use chatrelay_core::models::Message;
use serde::{Deserialize, Serialize};

/// Error body for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// `GET /` body.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceDescriptor {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<String, String>,
}

/// `GET /health` and `GET /health/ready` body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
}

/// `GET /api/messages` query. `email` is optional here so that a missing
/// parameter gets the same 400 as a blank one.
#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub email: Option<String>,
}

/// `POST /api/messages` body. Missing fields read as empty and fail
/// validation.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub email: String,
}

/// `POST /api/messages` success body.
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageResponse {
    pub user_message: Message,
    pub ai_message: Message,
    pub status: String,
}
