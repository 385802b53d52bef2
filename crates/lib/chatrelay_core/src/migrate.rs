//! Database migration support.
//!
//! Embeds and runs SQL migrations from `chatrelay_core/migrations/`. Only the
//! direct PostgreSQL backend runs them; a Supabase project owns its schema.

use sqlx::PgPool;

/// Run all embedded database migrations against the given pool.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
