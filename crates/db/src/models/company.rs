use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Company {
    pub id: Uuid,
    pub company_name: String,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub website: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    const COLUMNS: &str =
        "id, company_name, description, industry, website, created_at, updated_at";

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM companies WHERE id = $1", Self::COLUMNS);
        sqlx::query_as::<_, Self>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        company_name: &str,
        description: Option<&str>,
        industry: Option<&str>,
        website: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        let query = format!(
            "INSERT INTO companies (id, company_name, description, industry, website)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {}",
            Self::COLUMNS
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(Uuid::new_v4())
            .bind(company_name)
            .bind(description)
            .bind(industry)
            .bind(website)
            .fetch_one(pool)
            .await
    }
}
