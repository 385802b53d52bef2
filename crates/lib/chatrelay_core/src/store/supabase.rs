//! Supabase message store.
//!
//! Talks to the project's PostgREST endpoint (`/rest/v1/messages`) with the
//! service key sent both as `apikey` and as a bearer token.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use super::{MessageStore, PersistenceError, new_message_id};
use crate::models::{Message, Role};

const TABLE_PATH: &str = "rest/v1/messages";

#[derive(Serialize)]
struct NewMessage<'a> {
    id: Uuid,
    role: Role,
    content: &'a str,
    email: &'a str,
}

/// Message store backed by a Supabase `messages` table.
#[derive(Debug, Clone)]
pub struct SupabaseMessageStore {
    client: Client,
    table_url: String,
    api_key: String,
}

impl SupabaseMessageStore {
    /// Build a store for the project at `project_url`. `timeout` bounds each
    /// request end to end.
    pub fn new(
        project_url: &str,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PersistenceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersistenceError::Unavailable(format!("HTTP client build failed: {e}")))?;
        Ok(Self {
            client,
            table_url: table_url(project_url),
            api_key: api_key.into(),
        })
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

fn table_url(project_url: &str) -> String {
    format!("{}/{TABLE_PATH}", project_url.trim_end_matches('/'))
}

fn transport_error(e: reqwest::Error) -> PersistenceError {
    PersistenceError::Unavailable(format!("Supabase request failed: {e}"))
}

/// Map non-2xx answers to `Rejected`, keeping the body for diagnostics.
async fn check_status(resp: Response) -> Result<Response, PersistenceError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let body = resp
        .text()
        .await
        .unwrap_or_else(|_| "<no body>".to_string());
    Err(PersistenceError::Rejected(format!("Supabase returned {status}: {body}")))
}

async fn decode_messages(resp: Response) -> Result<Vec<Message>, PersistenceError> {
    resp.json::<Vec<Message>>()
        .await
        .map_err(|e| PersistenceError::Malformed(format!("Supabase response parse error: {e}")))
}

#[async_trait]
impl MessageStore for SupabaseMessageStore {
    async fn insert(
        &self,
        role: Role,
        content: &str,
        email: &str,
    ) -> Result<Message, PersistenceError> {
        let resp = self
            .authorized(self.client.post(&self.table_url))
            .header("Prefer", "return=representation")
            .json(&NewMessage {
                id: new_message_id(),
                role,
                content,
                email,
            })
            .send()
            .await
            .map_err(transport_error)?;

        decode_messages(check_status(resp).await?)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| PersistenceError::Malformed("Supabase returned no inserted row".into()))
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Message>, PersistenceError> {
        let resp = self
            .authorized(self.client.get(&self.table_url))
            .query(&[
                ("select", "*".to_string()),
                ("email", format!("eq.{email}")),
                ("order", "created_at.asc,id.asc".to_string()),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        decode_messages(check_status(resp).await?).await
    }

    async fn health_check(&self) -> bool {
        let result = self
            .authorized(self.client.get(&self.table_url))
            .query(&[("select", "id"), ("limit", "1")])
            .send()
            .await;
        match result {
            Ok(resp) if resp.status().is_success() => true,
            Ok(resp) => {
                warn!(status = %resp.status(), "supabase health check rejected");
                false
            }
            Err(e) => {
                warn!(error = %e, "supabase health check failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "supabase"
    }
}
