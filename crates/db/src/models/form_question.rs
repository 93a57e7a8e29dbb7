use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqlitePool};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    sqlx::Type,
    EnumString,
    Display,
    TS,
)]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuestionType {
    ShortText,
    LongText,
    MultipleChoice,
    Checkboxes,
    Dropdown,
    FileUpload,
    VideoUpload,
}

impl QuestionType {
    /// Choice types carry an option list.
    pub fn has_options(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::Checkboxes | QuestionType::Dropdown
        )
    }

    /// Upload types carry file-type and size limits.
    pub fn has_file_config(&self) -> bool {
        matches!(self, QuestionType::FileUpload | QuestionType::VideoUpload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, TS)]
pub struct FormQuestion {
    pub id: Uuid,
    pub section_id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub description: String,
    pub required: bool,
    pub order_index: i64,
    pub placeholder: String,
    pub hint: String,
    /// JSON array of option strings for choice types.
    pub options: Option<String>,
    pub file_types: Option<String>,
    pub max_file_size: Option<i64>,
    pub max_duration: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update payload for a question.
#[derive(Debug, Clone)]
pub struct UpsertFormQuestion {
    pub id: Uuid,
    pub section_id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub description: String,
    pub required: bool,
    pub order_index: i64,
    pub placeholder: String,
    pub hint: String,
    pub options: Option<String>,
    pub file_types: Option<String>,
    pub max_file_size: Option<i64>,
    pub max_duration: Option<i64>,
}

impl FormQuestion {
    const COLUMNS: &str = "q.id, q.section_id, q.question_type, q.question_text, q.description, \
        q.required, q.order_index, q.placeholder, q.hint, q.options, q.file_types, \
        q.max_file_size, q.max_duration, q.created_at, q.updated_at";

    /// Every question under a form, ordered by section then position.
    pub async fn find_by_form_id(
        pool: &SqlitePool,
        form_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {} FROM form_questions q
             JOIN form_sections s ON s.id = q.section_id
             WHERE s.form_id = $1
             ORDER BY s.order_index, q.order_index",
            Self::COLUMNS
        );
        sqlx::query_as::<_, Self>(&query)
            .bind(form_id)
            .fetch_all(pool)
            .await
    }

    pub async fn upsert<'e, E>(
        executor: E,
        question: &UpsertFormQuestion,
    ) -> Result<(), sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO form_questions (id, section_id, question_type, question_text,
                 description, required, order_index, placeholder, hint, options, file_types,
                 max_file_size, max_duration)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
             ON CONFLICT(id) DO UPDATE SET
                 section_id = excluded.section_id,
                 question_type = excluded.question_type,
                 question_text = excluded.question_text,
                 description = excluded.description,
                 required = excluded.required,
                 order_index = excluded.order_index,
                 placeholder = excluded.placeholder,
                 hint = excluded.hint,
                 options = excluded.options,
                 file_types = excluded.file_types,
                 max_file_size = excluded.max_file_size,
                 max_duration = excluded.max_duration,
                 updated_at = datetime('now', 'subsec')",
        )
        .bind(question.id)
        .bind(question.section_id)
        .bind(question.question_type)
        .bind(&question.question_text)
        .bind(&question.description)
        .bind(question.required)
        .bind(question.order_index)
        .bind(&question.placeholder)
        .bind(&question.hint)
        .bind(&question.options)
        .bind(&question.file_types)
        .bind(question.max_file_size)
        .bind(question.max_duration)
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
        let mut builder = QueryBuilder::new("DELETE FROM form_questions WHERE id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
        let result = builder.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Decode the JSON options column. Missing column means no options.
    pub fn options_list(&self) -> Result<Vec<String>, serde_json::Error> {
        match &self.options {
            Some(raw) => serde_json::from_str(raw),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn question_type_strings() {
        assert_eq!(QuestionType::ShortText.to_string(), "short_text");
        assert_eq!(QuestionType::MultipleChoice.to_string(), "multiple_choice");
        assert_eq!(
            QuestionType::from_str("video_upload").unwrap(),
            QuestionType::VideoUpload
        );
        assert!(QuestionType::from_str("essay").is_err());
    }

    #[test]
    fn option_and_file_config_flags() {
        assert!(QuestionType::Dropdown.has_options());
        assert!(QuestionType::Checkboxes.has_options());
        assert!(!QuestionType::ShortText.has_options());
        assert!(QuestionType::FileUpload.has_file_config());
        assert!(!QuestionType::Dropdown.has_file_config());
    }
}
