//! PostgreSQL message store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tracing::warn;
use uuid::Uuid;

use super::{MessageStore, PersistenceError, new_message_id};
use crate::models::{Message, Role};

/// Default pool size; every request holds a connection only for one statement.
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Row returned by message queries.
#[derive(Debug, Clone, sqlx::FromRow)]
struct MessageRow {
    id: Uuid,
    role: String,
    content: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<MessageRow> for Message {
    type Error = PersistenceError;

    fn try_from(row: MessageRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|e| PersistenceError::Malformed(e.to_string()))?;
        Ok(Message {
            id: row.id,
            role,
            content: row.content,
            email: row.email,
            created_at: row.created_at,
        })
    }
}

/// Message store backed by a PostgreSQL `messages` table.
#[derive(Debug, Clone)]
pub struct PgMessageStore {
    pool: PgPool,
}

impl PgMessageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool. `acquire_timeout` bounds how long a request
    /// waits for a connection before failing with `Unavailable`.
    pub async fn connect(
        database_url: &str,
        acquire_timeout: Duration,
    ) -> Result<Self, PersistenceError> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(acquire_timeout)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MessageStore for PgMessageStore {
    async fn insert(
        &self,
        role: Role,
        content: &str,
        email: &str,
    ) -> Result<Message, PersistenceError> {
        let row = sqlx::query_as::<_, MessageRow>(
            r#"
            INSERT INTO messages (id, role, content, email)
            VALUES ($1, $2, $3, $4)
            RETURNING id, role, content, email, created_at
            "#,
        )
        .bind(new_message_id())
        .bind(role.as_str())
        .bind(content)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Message::try_from(row)
    }

    async fn list_by_email(&self, email: &str) -> Result<Vec<Message>, PersistenceError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            r#"
            SELECT id, role, content, email, created_at
            FROM messages
            WHERE email = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Message::try_from).collect()
    }

    async fn health_check(&self) -> bool {
        match sqlx::query("SELECT 1").execute(&self.pool).await {
            Ok(_) => true,
            Err(e) => {
                warn!(error = %e, "postgres health check failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str) -> MessageRow {
        MessageRow {
            id: Uuid::nil(),
            role: role.to_string(),
            content: "Hello".to_string(),
            email: "a@x.com".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_message() {
        let msg = Message::try_from(row("assistant")).unwrap();
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.email, "a@x.com");
    }

    #[test]
    fn row_with_unknown_role_is_malformed() {
        let err = Message::try_from(row("system")).unwrap_err();
        assert!(matches!(err, PersistenceError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_database_fails_health_check() {
        // Lazy pool: no connection is attempted until the first query.
        let pool = PgPoolOptions::new()
            .acquire_timeout(Duration::from_millis(200))
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let store = PgMessageStore::new(pool);
        assert!(!store.health_check().await);
    }
}
