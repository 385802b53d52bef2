//! Persistence gateway for chat messages.
//!
//! [`MessageStore`] is the seam between the relay and the durable store.
//! Backends:
//!
//! - [`postgres::PgMessageStore`]: direct PostgreSQL via sqlx
//! - [`supabase::SupabaseMessageStore`]: Supabase REST (PostgREST) over HTTP
//! - [`memory::MemoryMessageStore`]: process-local, for tests and local dev

pub mod memory;
pub mod postgres;
pub mod supabase;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Message, Role};

/// Errors raised by a store backend.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store rejected request: {0}")]
    Rejected(String),

    #[error("Malformed store response: {0}")]
    Malformed(String),
}

impl From<sqlx::Error> for PersistenceError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::Protocol(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => PersistenceError::Unavailable(e.to_string()),
            sqlx::Error::RowNotFound
            | sqlx::Error::TypeNotFound { .. }
            | sqlx::Error::ColumnNotFound(_)
            | sqlx::Error::ColumnDecode { .. }
            | sqlx::Error::Decode(_) => PersistenceError::Malformed(e.to_string()),
            _ => PersistenceError::Rejected(e.to_string()),
        }
    }
}

/// Durable, append-only message log partitioned by normalized email.
///
/// Callers pass an already-normalized email; stores do not normalize.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append one message. The store assigns `id` and `created_at`.
    async fn insert(
        &self,
        role: Role,
        content: &str,
        email: &str,
    ) -> Result<Message, PersistenceError>;

    /// All messages for `email`, oldest first. Empty when none exist.
    async fn list_by_email(&self, email: &str) -> Result<Vec<Message>, PersistenceError>;

    /// Whether the store is reachable. Never fails.
    async fn health_check(&self) -> bool;

    /// Backend identifier for logging.
    fn name(&self) -> &str;
}

/// Generate a message id. UUIDv7 keeps ids sortable by insertion time, which
/// breaks `created_at` ties deterministically.
pub fn new_message_id() -> Uuid {
    Uuid::now_v7()
}
