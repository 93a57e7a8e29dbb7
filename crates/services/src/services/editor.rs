use db::models::{QuestionType, Theme};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum EditorError {
    #[error("no checkpoint to restore")]
    NoCheckpoint,
}

/// One question inside the in-memory form tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct QuestionNode {
    pub id: Uuid,
    pub question_type: QuestionType,
    pub question_text: String,
    pub description: String,
    pub required: bool,
    pub order_index: i64,
    pub placeholder: String,
    pub hint: String,
    pub options: Vec<String>,
    pub file_types: Vec<String>,
    pub max_file_size: Option<i64>,
    pub max_duration: Option<i64>,
    /// True once any optional detail has been filled in. Never flips back.
    pub configured: bool,
}

impl QuestionNode {
    pub fn new(question_type: QuestionType) -> Self {
        let options = if question_type.has_options() {
            vec!["Option 1".to_string()]
        } else {
            Vec::new()
        };
        Self {
            id: Uuid::new_v4(),
            question_type,
            question_text: "New Question".to_string(),
            description: String::new(),
            required: false,
            order_index: 0,
            placeholder: String::new(),
            hint: String::new(),
            options,
            file_types: Vec::new(),
            max_file_size: None,
            max_duration: None,
            configured: false,
        }
    }

    /// Whether any optional detail is set. Used to seed `configured` when a
    /// form is loaded from storage.
    pub fn derive_configured(&self) -> bool {
        !self.description.is_empty()
            || !self.hint.is_empty()
            || !self.placeholder.is_empty()
            || !self.options.is_empty()
            || !self.file_types.is_empty()
            || self.max_file_size.is_some()
            || self.max_duration.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct SectionNode {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub order_index: i64,
    pub questions: Vec<QuestionNode>,
}

impl SectionNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: String::new(),
            order_index: 0,
            questions: Vec::new(),
        }
    }
}

/// Partial update applied to a question by the configuration panel. Absent
/// fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, TS)]
pub struct QuestionPatch {
    pub question_text: Option<String>,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub placeholder: Option<String>,
    pub hint: Option<String>,
    pub options: Option<Vec<String>>,
    pub file_types: Option<Vec<String>>,
    pub max_file_size: Option<i64>,
    pub max_duration: Option<i64>,
}

#[derive(Debug, Clone)]
struct Checkpoint {
    title: String,
    description: String,
    sections: Vec<SectionNode>,
    deleted_sections: Vec<Uuid>,
    deleted_questions: Vec<Uuid>,
}

/// In-memory editing state for one form.
///
/// Every mutation goes through [`FormEditSession::renumber`], so section and
/// question order indices are always dense and zero-based. All mutating
/// operations are no-ops once the form is published.
#[derive(Debug, Clone)]
pub struct FormEditSession {
    pub form_id: Uuid,
    pub title: String,
    pub description: String,
    pub theme: Theme,
    pub published: bool,
    pub sections: Vec<SectionNode>,
    pub active_section: usize,
    deleted_sections: Vec<Uuid>,
    deleted_questions: Vec<Uuid>,
    checkpoint: Option<Checkpoint>,
}

impl FormEditSession {
    pub fn from_parts(
        form_id: Uuid,
        title: String,
        description: String,
        theme: Theme,
        published: bool,
        sections: Vec<SectionNode>,
    ) -> Self {
        let mut session = Self {
            form_id,
            title,
            description,
            theme,
            published,
            sections,
            active_section: 0,
            deleted_sections: Vec::new(),
            deleted_questions: Vec::new(),
            checkpoint: None,
        };
        session.renumber();
        session
    }

    pub fn deleted_sections(&self) -> &[Uuid] {
        &self.deleted_sections
    }

    pub fn deleted_questions(&self) -> &[Uuid] {
        &self.deleted_questions
    }

    /// Reassign dense zero-based order indices at both levels.
    fn renumber(&mut self) {
        for (s_idx, section) in self.sections.iter_mut().enumerate() {
            section.order_index = s_idx as i64;
            for (q_idx, question) in section.questions.iter_mut().enumerate() {
                question.order_index = q_idx as i64;
            }
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        if self.published {
            return;
        }
        self.title = title.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        if self.published {
            return;
        }
        self.description = description.into();
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.published {
            return;
        }
        self.theme = theme;
    }

    pub fn set_active_section(&mut self, index: usize) {
        if index < self.sections.len() {
            self.active_section = index;
        }
    }

    /// Append a new section with default title and make it active.
    pub fn add_section(&mut self) -> Option<Uuid> {
        self.add_section_with(None, None)
    }

    /// Append a new section, filling omitted fields with defaults.
    pub fn add_section_with(
        &mut self,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Option<Uuid> {
        if self.published {
            return None;
        }
        let mut section = SectionNode::new(title.unwrap_or("New Section"));
        if let Some(description) = description {
            section.description = description.to_string();
        }
        let id = section.id;
        self.sections.push(section);
        self.active_section = self.sections.len() - 1;
        self.renumber();
        Some(id)
    }

    pub fn update_section(
        &mut self,
        section_id: Uuid,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> bool {
        if self.published {
            return false;
        }
        let Some(section) = self.sections.iter_mut().find(|s| s.id == section_id) else {
            return false;
        };
        section.title = title.into();
        section.description = description.into();
        true
    }

    /// Remove a section, queueing it and all of its questions for deletion at
    /// the next save.
    pub fn delete_section(&mut self, section_id: Uuid) -> bool {
        if self.published {
            return false;
        }
        let Some(index) = self.sections.iter().position(|s| s.id == section_id) else {
            return false;
        };
        let section = self.sections.remove(index);
        self.deleted_sections.push(section.id);
        for question in &section.questions {
            self.deleted_questions.push(question.id);
        }
        if self.active_section >= self.sections.len() && self.active_section > 0 {
            self.active_section = self.sections.len().saturating_sub(1);
        }
        self.renumber();
        true
    }

    /// Append a new question to the given section.
    pub fn add_question(
        &mut self,
        section_id: Uuid,
        question_type: QuestionType,
    ) -> Option<Uuid> {
        if self.published {
            return None;
        }
        let section = self.sections.iter_mut().find(|s| s.id == section_id)?;
        let question = QuestionNode::new(question_type);
        let id = question.id;
        section.questions.push(question);
        self.renumber();
        Some(id)
    }

    pub fn delete_question(&mut self, question_id: Uuid) -> bool {
        if self.published {
            return false;
        }
        for section in &mut self.sections {
            if let Some(index) = section.questions.iter().position(|q| q.id == question_id) {
                section.questions.remove(index);
                self.deleted_questions.push(question_id);
                self.renumber();
                return true;
            }
        }
        false
    }

    /// Move a question between positions, possibly across sections. Out of
    /// range coordinates leave the tree untouched.
    pub fn reorder_question(
        &mut self,
        src_section: usize,
        src_index: usize,
        dst_section: usize,
        dst_index: usize,
    ) -> bool {
        if self.published {
            return false;
        }
        if src_section >= self.sections.len() || dst_section >= self.sections.len() {
            return false;
        }
        if src_index >= self.sections[src_section].questions.len() {
            return false;
        }
        // Insertion may target one past the end of the destination list.
        let dst_len = if src_section == dst_section {
            self.sections[dst_section].questions.len() - 1
        } else {
            self.sections[dst_section].questions.len()
        };
        if dst_index > dst_len {
            return false;
        }
        let question = self.sections[src_section].questions.remove(src_index);
        self.sections[dst_section].questions.insert(dst_index, question);
        self.renumber();
        true
    }

    /// Id-addressed variant of [`FormEditSession::reorder_question`] for
    /// callers that track sections by id rather than position.
    pub fn reorder_question_between(
        &mut self,
        src_section: Uuid,
        src_index: usize,
        dst_section: Uuid,
        dst_index: usize,
    ) -> bool {
        let Some(src) = self.sections.iter().position(|s| s.id == src_section) else {
            return false;
        };
        let Some(dst) = self.sections.iter().position(|s| s.id == dst_section) else {
            return false;
        };
        self.reorder_question(src, src_index, dst, dst_index)
    }

    /// Apply a partial update to a question. Marks it configured.
    pub fn configure_question(&mut self, question_id: Uuid, patch: QuestionPatch) -> bool {
        if self.published {
            return false;
        }
        for section in &mut self.sections {
            if let Some(question) = section.questions.iter_mut().find(|q| q.id == question_id) {
                if let Some(text) = patch.question_text {
                    question.question_text = text;
                }
                if let Some(description) = patch.description {
                    question.description = description;
                }
                if let Some(required) = patch.required {
                    question.required = required;
                }
                if let Some(placeholder) = patch.placeholder {
                    question.placeholder = placeholder;
                }
                if let Some(hint) = patch.hint {
                    question.hint = hint;
                }
                if let Some(options) = patch.options {
                    question.options = options;
                }
                if let Some(file_types) = patch.file_types {
                    question.file_types = file_types;
                }
                if let Some(max_file_size) = patch.max_file_size {
                    question.max_file_size = Some(max_file_size);
                }
                if let Some(max_duration) = patch.max_duration {
                    question.max_duration = Some(max_duration);
                }
                question.configured = true;
                return true;
            }
        }
        false
    }

    /// Snapshot the editable state. Replaces any previous checkpoint.
    pub fn create_checkpoint(&mut self) {
        self.checkpoint = Some(Checkpoint {
            title: self.title.clone(),
            description: self.description.clone(),
            sections: self.sections.clone(),
            deleted_sections: self.deleted_sections.clone(),
            deleted_questions: self.deleted_questions.clone(),
        });
    }

    /// Roll back to the last checkpoint, consuming it.
    pub fn restore_checkpoint(&mut self) -> Result<(), EditorError> {
        let checkpoint = self.checkpoint.take().ok_or(EditorError::NoCheckpoint)?;
        self.title = checkpoint.title;
        self.description = checkpoint.description;
        self.sections = checkpoint.sections;
        self.deleted_sections = checkpoint.deleted_sections;
        self.deleted_questions = checkpoint.deleted_questions;
        self.active_section = 0;
        self.renumber();
        Ok(())
    }

    pub fn discard_checkpoint(&mut self) {
        self.checkpoint = None;
    }

    /// Swap in a whole new tree, queueing everything it replaces for
    /// deletion at the next save.
    pub fn replace_sections(&mut self, sections: Vec<SectionNode>) -> bool {
        if self.published {
            return false;
        }
        for section in &self.sections {
            self.deleted_sections.push(section.id);
            for question in &section.questions {
                self.deleted_questions.push(question.id);
            }
        }
        self.sections = sections;
        self.active_section = 0;
        self.renumber();
        true
    }

    /// Forget queued deletions. Called after they have been committed.
    pub fn clear_deletions(&mut self) {
        self.deleted_sections.clear();
        self.deleted_questions.clear();
    }
}
