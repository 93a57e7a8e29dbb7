use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct FormSection {
    pub id: Uuid,
    pub form_id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update payload for a section.
#[derive(Debug, Clone)]
pub struct UpsertFormSection {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i64,
}

impl FormSection {
    const COLUMNS: &str = "id, form_id, title, description, order_index, created_at, updated_at";

    pub async fn find_by_form_id(
        pool: &SqlitePool,
        form_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM form_sections WHERE form_id = $1 ORDER BY order_index",
            Self::COLUMNS
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(form_id)
            .fetch_all(pool)
            .await
    }

    pub async fn upsert<'e, E>(
        executor: E,
        form_id: Uuid,
        section: &UpsertFormSection,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO form_sections (id, form_id, title, description, order_index)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT(id) DO UPDATE SET
                 title = excluded.title,
                 description = excluded.description,
                 order_index = excluded.order_index,
                 updated_at = datetime('now', 'subsec')",
        )
        .bind(section.id)
        .bind(form_id)
        .bind(&section.title)
        .bind(&section.description)
        .bind(section.order_index)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn delete_many<'e, E>(executor: E, ids: &[Uuid]) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut builder = QueryBuilder::new("DELETE FROM form_sections WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }
}
