use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use uuid::Uuid;

/// Presentation settings for a form. Colors travel as `#rrggbb` strings and
/// are stored as 24-bit integers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub primary_color: String,
    pub background_color: String,
    pub font_family: String,
    pub border_radius: i64,
    pub spacing: i64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_color: "#3b82f6".to_string(),
            background_color: "#ffffff".to_string(),
            font_family: "Inter".to_string(),
            border_radius: 8,
            spacing: 16,
        }
    }
}

/// Render a 24-bit color integer as a `#rrggbb` string.
pub fn color_to_hex(color: i64) -> String {
    format!("#{:06x}", color & 0xffffff)
}

/// Parse a `#rrggbb` string into its 24-bit integer form.
pub fn hex_to_color(hex: &str) -> Option<i64> {
    let digits = hex.strip_prefix('#')?;
    if digits.len() != 6 {
        return None;
    }
    i64::from_str_radix(digits, 16).ok()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct Form {
    pub id: Uuid,
    pub company_id: Uuid,
    pub title: String,
    pub description: String,
    pub primary_color: Option<i64>,
    pub background_color: Option<i64>,
    pub font_family: Option<String>,
    pub border_radius: Option<i64>,
    pub spacing: Option<i64>,
    pub published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Form {
    const COLUMNS: &str = "id, company_id, title, description, primary_color, background_color, \
        font_family, border_radius, spacing, published, created_at, updated_at";

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {} FROM forms WHERE id = $1", Self::COLUMNS);
        sqlx::query_as::<_, Self>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn create(
        pool: &SqlitePool,
        company_id: Uuid,
        title: &str,
        description: &str,
    ) -> Result<Self, sqlx::Error> {
        let theme = Theme::default();
        let query = format!(
            "INSERT INTO forms (id, company_id, title, description, primary_color,
                                background_color, font_family, border_radius, spacing)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING {}",
            Self::COLUMNS
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(Uuid::new_v4())
            .bind(company_id)
            .bind(title)
            .bind(description)
            .bind(hex_to_color(&theme.primary_color))
            .bind(hex_to_color(&theme.background_color))
            .bind(&theme.font_family)
            .bind(theme.border_radius)
            .bind(theme.spacing)
            .fetch_one(pool)
            .await
    }

    /// Update title, description and theme in one statement.
    pub async fn update_meta<'e, E>(
        executor: E,
        id: Uuid,
        title: &str,
        description: &str,
        theme: &Theme,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "UPDATE forms
             SET title = $2, description = $3, primary_color = $4, background_color = $5,
                 font_family = $6, border_radius = $7, spacing = $8,
                 updated_at = datetime('now', 'subsec')
             WHERE id = $1",
        )
        .bind(id)
        .bind(title)
        .bind(description)
        .bind(hex_to_color(&theme.primary_color))
        .bind(hex_to_color(&theme.background_color))
        .bind(&theme.font_family)
        .bind(theme.border_radius)
        .bind(theme.spacing)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn set_published(
        pool: &SqlitePool,
        id: Uuid,
        published: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE forms SET published = $2, updated_at = datetime('now', 'subsec') WHERE id = $1",
        )
        .bind(id)
        .bind(published)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Theme as stored, with defaults filling any unset column.
    pub fn theme(&self) -> Theme {
        let defaults = Theme::default();
        Theme {
            primary_color: self
                .primary_color
                .map(color_to_hex)
                .unwrap_or(defaults.primary_color),
            background_color: self
                .background_color
                .map(color_to_hex)
                .unwrap_or(defaults.background_color),
            font_family: self
                .font_family
                .clone()
                .unwrap_or(defaults.font_family),
            border_radius: self.border_radius.unwrap_or(defaults.border_radius),
            spacing: self.spacing.unwrap_or(defaults.spacing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_round_trip() {
        assert_eq!(hex_to_color("#3b82f6"), Some(0x3b82f6));
        assert_eq!(color_to_hex(0x3b82f6), "#3b82f6");
        assert_eq!(color_to_hex(0x000000), "#000000");
        assert_eq!(hex_to_color("#ffffff"), Some(0xffffff));
    }

    #[test]
    fn color_rejects_malformed_hex() {
        assert_eq!(hex_to_color("3b82f6"), None);
        assert_eq!(hex_to_color("#fff"), None);
        assert_eq!(hex_to_color("#zzzzzz"), None);
        assert_eq!(hex_to_color(""), None);
    }

    #[test]
    fn theme_defaults() {
        let theme = Theme::default();
        assert_eq!(theme.primary_color, "#3b82f6");
        assert_eq!(theme.background_color, "#ffffff");
        assert_eq!(theme.font_family, "Inter");
        assert_eq!(theme.border_radius, 8);
        assert_eq!(theme.spacing, 16);
    }
}
