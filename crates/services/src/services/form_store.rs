use db::{
    DBService,
    models::{
        Form, FormQuestion, FormSection, UpsertFormQuestion, UpsertFormSection,
    },
};
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use super::editor::{FormEditSession, QuestionNode, SectionNode};
use super::wire::{SaveRequest, option_cap};

#[derive(Debug, Error)]
pub enum FormStoreError {
    #[error("form not found: {0}")]
    FormNotFound(Uuid),
    #[error("cannot edit a published form")]
    PublishedFormReadOnly,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt options column: {0}")]
    CorruptOptions(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, TS)]
pub struct SaveOutcome {
    pub sections_saved: usize,
    pub questions_saved: usize,
    pub message: String,
}

/// Loads forms into edit sessions and writes them back in one transaction.
#[derive(Clone)]
pub struct FormStore {
    db: DBService,
}

impl FormStore {
    pub fn new(db: DBService) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    /// Materialize the stored form as an edit session. The `configured` flag
    /// is derived from whichever optional details survived the last save.
    pub async fn load(&self, form_id: Uuid) -> Result<FormEditSession, FormStoreError> {
        let form = Form::find_by_id(&self.db.pool, form_id)
            .await?
            .ok_or(FormStoreError::FormNotFound(form_id))?;
        let sections = FormSection::find_by_form_id(&self.db.pool, form_id).await?;
        let questions = FormQuestion::find_by_form_id(&self.db.pool, form_id).await?;

        let mut nodes: Vec<SectionNode> = sections
            .iter()
            .map(|section| SectionNode {
                id: section.id,
                title: section.title.clone(),
                description: section.description.clone(),
                order_index: section.order_index,
                questions: Vec::new(),
            })
            .collect();
        for question in &questions {
            let mut node = QuestionNode {
                id: question.id,
                question_type: question.question_type,
                question_text: question.question_text.clone(),
                description: question.description.clone(),
                required: question.required,
                order_index: question.order_index,
                placeholder: question.placeholder.clone(),
                hint: question.hint.clone(),
                options: question.options_list()?,
                file_types: question
                    .file_types
                    .as_deref()
                    .map(|raw| {
                        raw.split(',')
                            .map(str::trim)
                            .filter(|part| !part.is_empty())
                            .map(str::to_string)
                            .collect()
                    })
                    .unwrap_or_default(),
                max_file_size: question.max_file_size,
                max_duration: question.max_duration,
                configured: false,
            };
            node.configured = node.derive_configured();
            if let Some(section) = nodes.iter_mut().find(|s| s.id == question.section_id) {
                section.questions.push(node);
            }
        }

        Ok(FormEditSession::from_parts(
            form_id,
            form.title.clone(),
            form.description.clone(),
            form.theme(),
            form.published,
            nodes,
        ))
    }

    /// Persist an edit session. Queued deletions are cleared once the
    /// transaction commits.
    pub async fn save_session(
        &self,
        session: &mut FormEditSession,
        quiet: bool,
    ) -> Result<SaveOutcome, FormStoreError> {
        let request = SaveRequest {
            title: session.title.clone(),
            description: session.description.clone(),
            theme: session.theme.clone(),
            sections: session.sections.clone(),
            deleted_section_ids: session.deleted_sections().to_vec(),
            deleted_question_ids: session.deleted_questions().to_vec(),
        };
        let outcome = self.save_request(session.form_id, &request, quiet).await?;
        session.clear_deletions();
        Ok(outcome)
    }

    /// Persist a decoded save request in one transaction. The stored
    /// `published` flag is the authority and is checked before any write.
    pub async fn save_request(
        &self,
        form_id: Uuid,
        request: &SaveRequest,
        quiet: bool,
    ) -> Result<SaveOutcome, FormStoreError> {
        let form = Form::find_by_id(&self.db.pool, form_id)
            .await?
            .ok_or(FormStoreError::FormNotFound(form_id))?;
        if form.published {
            return Err(FormStoreError::PublishedFormReadOnly);
        }

        let mut tx = self.db.pool.begin().await?;

        Form::update_meta(
            &mut *tx,
            form_id,
            &request.title,
            &request.description,
            &request.theme,
        )
        .await?;

        let mut questions_saved = 0;
        for (s_idx, section) in request.sections.iter().enumerate() {
            FormSection::upsert(
                &mut *tx,
                form_id,
                &UpsertFormSection {
                    id: section.id,
                    title: section.title.clone(),
                    description: section.description.clone(),
                    order_index: s_idx as i64,
                },
            )
            .await?;
            for (q_idx, question) in section.questions.iter().enumerate() {
                FormQuestion::upsert(&mut *tx, &upsert_question(section.id, q_idx, question)?)
                    .await?;
                questions_saved += 1;
            }
        }

        FormQuestion::delete_many(&mut *tx, &request.deleted_question_ids).await?;
        FormSection::delete_many(&mut *tx, &request.deleted_section_ids).await?;

        tx.commit().await?;

        if !quiet {
            info!(
                form_id = %form_id,
                sections = request.sections.len(),
                questions = questions_saved,
                "form saved"
            );
        }
        Ok(SaveOutcome {
            sections_saved: request.sections.len(),
            questions_saved,
            message: "Form saved successfully".to_string(),
        })
    }
}

fn upsert_question(
    section_id: Uuid,
    order_index: usize,
    question: &QuestionNode,
) -> Result<UpsertFormQuestion, FormStoreError> {
    let options = match option_cap(question.question_type) {
        Some(cap) => {
            let capped: Vec<&String> = question.options.iter().take(cap).collect();
            Some(serde_json::to_string(&capped)?)
        }
        None => None,
    };
    let file_types = if question.file_types.is_empty() {
        None
    } else {
        Some(question.file_types.join(","))
    };
    Ok(UpsertFormQuestion {
        id: question.id,
        section_id,
        question_type: question.question_type,
        question_text: question.question_text.clone(),
        description: question.description.clone(),
        required: question.required,
        order_index: order_index as i64,
        placeholder: question.placeholder.clone(),
        hint: question.hint.clone(),
        options,
        file_types,
        max_file_size: question.max_file_size,
        max_duration: question.max_duration,
    })
}
