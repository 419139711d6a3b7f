//! PostgreSQL implementation of the draft slots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::DraftStore;
use crate::domain::{Draft, TemplateType};
use crate::error::DeskError;

/// PostgreSQL-backed draft store using `sqlx::PgPool`.
///
/// One row per template type in `template_drafts`.
#[derive(Debug, Clone)]
pub struct PostgresDraftStore {
    pool: PgPool,
}

impl PostgresDraftStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `template_drafts` table if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`DeskError::Persistence`] on database failure.
    pub async fn init_schema(&self) -> Result<(), DeskError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS template_drafts (\
                template_type TEXT PRIMARY KEY, \
                template_name TEXT NOT NULL, \
                subject TEXT NOT NULL, \
                body TEXT NOT NULL, \
                saved_at TIMESTAMPTZ NOT NULL)",
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl DraftStore for PostgresDraftStore {
    async fn load(&self, template_type: &TemplateType) -> Result<Option<Draft>, DeskError> {
        let row = sqlx::query_as::<_, (String, String, String, DateTime<Utc>)>(
            "SELECT template_name, subject, body, saved_at FROM template_drafts \
             WHERE template_type = $1",
        )
        .bind(template_type.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(template_name, subject, body, saved_at)| Draft {
            template_name,
            subject,
            body,
            saved_at,
        }))
    }

    async fn store(&self, template_type: &TemplateType, draft: &Draft) -> Result<(), DeskError> {
        sqlx::query(
            "INSERT INTO template_drafts (template_type, template_name, subject, body, saved_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (template_type) DO UPDATE SET \
             template_name = EXCLUDED.template_name, subject = EXCLUDED.subject, \
             body = EXCLUDED.body, saved_at = EXCLUDED.saved_at",
        )
        .bind(template_type.as_str())
        .bind(&draft.template_name)
        .bind(&draft.subject)
        .bind(&draft.body)
        .bind(draft.saved_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear(&self, template_type: &TemplateType) -> Result<(), DeskError> {
        sqlx::query("DELETE FROM template_drafts WHERE template_type = $1")
            .bind(template_type.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
