use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Internship {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub position: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Internship {
    const COLUMNS: &str = "id, company_id, title, position, category, description, is_active, \
        created_at, updated_at";

    /// Active postings for a company, newest first, capped at 10.
    pub async fn find_active_by_company(
        pool: &SqlitePool,
        company_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM internships
             WHERE company_id = $1 AND is_active = 1
             ORDER BY created_at DESC
             LIMIT 10",
            Self::COLUMNS
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(company_id)
            .fetch_all(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        company_id: Uuid,
        title: &str,
        position: Option<&str>,
        category: Option<&str>,
        description: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO internships (id, company_id, title, position, category, description)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {}",
            Self::COLUMNS
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(title)
            .bind(position)
            .bind(category)
            .bind(description)
            .fetch_one(pool)
            .await
    }
}
