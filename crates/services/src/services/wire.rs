use std::collections::BTreeMap;
use std::str::FromStr;

use db::models::{QuestionType, Theme, form::hex_to_color};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use uuid::Uuid;

use super::editor::{QuestionNode, SectionNode};

/// Option slots exposed for multiple-choice and checkbox questions.
pub const CHOICE_SLOTS: usize = 15;
/// Option slots exposed for dropdown questions.
pub const DROPDOWN_SLOTS: usize = 50;

#[derive(Debug, Error)]
pub enum WireError {
    #[error("unknown question type: {0}")]
    UnknownQuestionType(String),
    #[error("question {question_id} references unknown section {section_id}")]
    UnknownSection {
        question_id: Uuid,
        section_id: Uuid,
    },
}

/// Slot capacity for a question type, if it carries options at all.
pub fn option_cap(question_type: QuestionType) -> Option<usize> {
    match question_type {
        QuestionType::MultipleChoice | QuestionType::Checkboxes => Some(CHOICE_SLOTS),
        QuestionType::Dropdown => Some(DROPDOWN_SLOTS),
        _ => None,
    }
}

fn slot_prefix(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Dropdown => "dropdown",
        _ => "choice",
    }
}

/// Question as it travels over the API. Options are flattened into numbered
/// `choice_N` / `dropdown_N` keys.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WireQuestion {
    pub id: Uuid,
    pub section_id: Uuid,
    #[serde(rename = "type")]
    pub question_type: String,
    pub question_text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub hint: String,
    /// Comma-joined list of allowed extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_types: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration: Option<i64>,
    #[serde(flatten)]
    #[ts(skip)]
    pub slots: BTreeMap<String, Option<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct WireSection {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order_index: i64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<WireQuestion>,
}

/// Body of a form save request. Questions may arrive nested under their
/// section or in the flat `questions` list keyed by `section_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct SaveFormPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub theme: Option<Theme>,
    #[serde(default)]
    pub sections: Vec<WireSection>,
    #[serde(default)]
    pub questions: Vec<WireQuestion>,
    #[serde(default, rename = "deletedSectionIds")]
    pub deleted_section_ids: Vec<Uuid>,
    #[serde(default, rename = "deletedQuestionIds")]
    pub deleted_question_ids: Vec<Uuid>,
}

/// Decoded, validated save request ready for the store.
#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub title: String,
    pub description: String,
    pub theme: Theme,
    pub sections: Vec<SectionNode>,
    pub deleted_section_ids: Vec<Uuid>,
    pub deleted_question_ids: Vec<Uuid>,
}

fn fill_slots(prefix: &str, options: &[String], cap: usize) -> BTreeMap<String, Option<String>> {
    options
        .iter()
        .take(cap)
        .enumerate()
        .map(|(i, option)| (format!("{}_{}", prefix, i + 1), Some(option.clone())))
        .collect()
}

fn collect_slots(prefix: &str, slots: &BTreeMap<String, Option<String>>, cap: usize) -> Vec<String> {
    (1..=cap)
        .filter_map(|i| slots.get(&format!("{}_{}", prefix, i)).cloned().flatten())
        .filter(|option| !option.is_empty())
        .collect()
}

pub fn encode_question(section_id: Uuid, question: &QuestionNode) -> WireQuestion {
    let slots = match option_cap(question.question_type) {
        Some(cap) => fill_slots(slot_prefix(question.question_type), &question.options, cap),
        None => BTreeMap::new(),
    };
    let file_types = if question.file_types.is_empty() {
        None
    } else {
        Some(question.file_types.join(","))
    };
    WireQuestion {
        id: question.id,
        section_id,
        question_type: question.question_type.to_string(),
        question_text: question.question_text.clone(),
        description: question.description.clone(),
        required: question.required,
        order_index: question.order_index,
        placeholder: question.placeholder.clone(),
        hint: question.hint.clone(),
        file_types,
        max_file_size: question.max_file_size,
        max_duration: question.max_duration,
        slots,
    }
}

pub fn decode_question(wire: &WireQuestion) -> Result<(Uuid, QuestionNode), WireError> {
    let question_type = QuestionType::from_str(&wire.question_type)
        .map_err(|_| WireError::UnknownQuestionType(wire.question_type.clone()))?;
    let options = match option_cap(question_type) {
        Some(cap) => collect_slots(slot_prefix(question_type), &wire.slots, cap),
        None => Vec::new(),
    };
    let file_types = wire
        .file_types
        .as_deref()
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let mut node = QuestionNode {
        id: wire.id,
        question_type,
        question_text: wire.question_text.clone(),
        description: wire.description.clone(),
        required: wire.required,
        order_index: wire.order_index,
        placeholder: wire.placeholder.clone(),
        hint: wire.hint.clone(),
        options,
        file_types,
        max_file_size: wire.max_file_size,
        max_duration: wire.max_duration,
        configured: false,
    };
    node.configured = node.derive_configured();
    Ok((wire.section_id, node))
}

pub fn encode_sections(sections: &[SectionNode]) -> Vec<WireSection> {
    sections
        .iter()
        .map(|section| WireSection {
            id: section.id,
            title: section.title.clone(),
            description: section.description.clone(),
            order_index: section.order_index,
            questions: section
                .questions
                .iter()
                .map(|question| encode_question(section.id, question))
                .collect(),
        })
        .collect()
}

/// Replace colors that do not parse as `#rrggbb` with the defaults.
pub fn sanitize_theme(mut theme: Theme) -> Theme {
    let defaults = Theme::default();
    if hex_to_color(&theme.primary_color).is_none() {
        tracing::warn!(color = %theme.primary_color, "unparseable primary color, using default");
        theme.primary_color = defaults.primary_color;
    }
    if hex_to_color(&theme.background_color).is_none() {
        tracing::warn!(color = %theme.background_color, "unparseable background color, using default");
        theme.background_color = defaults.background_color;
    }
    theme
}

/// Validate a save body and group its questions under their sections.
pub fn decode_save_payload(payload: &SaveFormPayload) -> Result<SaveRequest, WireError> {
    let mut sections: Vec<SectionNode> = payload
        .sections
        .iter()
        .map(|wire| {
            let mut questions = Vec::with_capacity(wire.questions.len());
            for question in &wire.questions {
                let (_, node) = decode_question(question)?;
                questions.push(node);
            }
            Ok(SectionNode {
                id: wire.id,
                title: wire.title.clone(),
                description: wire.description.clone(),
                order_index: wire.order_index,
                questions,
            })
        })
        .collect::<Result<_, WireError>>()?;
    sections.sort_by_key(|section| section.order_index);

    for wire in &payload.questions {
        let (section_id, node) = decode_question(wire)?;
        let section = sections
            .iter_mut()
            .find(|section| section.id == section_id)
            .ok_or(WireError::UnknownSection {
                question_id: wire.id,
                section_id,
            })?;
        section.questions.push(node);
    }
    for section in &mut sections {
        section.questions.sort_by_key(|question| question.order_index);
    }

    Ok(SaveRequest {
        title: payload.title.clone(),
        description: payload.description.clone(),
        theme: sanitize_theme(payload.theme.clone().unwrap_or_default()),
        sections,
        deleted_section_ids: payload.deleted_section_ids.clone(),
        deleted_question_ids: payload.deleted_question_ids.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choice_question(count: usize) -> QuestionNode {
        let mut node = QuestionNode::new(QuestionType::MultipleChoice);
        node.options = (1..=count).map(|i| format!("Option {i}")).collect();
        node
    }

    #[test]
    fn choice_options_round_trip_through_slots() {
        let section_id = Uuid::new_v4();
        let node = choice_question(4);
        let wire = encode_question(section_id, &node);
        assert_eq!(wire.slots.get("choice_1"), Some(&Some("Option 1".to_string())));
        assert_eq!(wire.slots.get("choice_4"), Some(&Some("Option 4".to_string())));
        assert!(!wire.slots.contains_key("choice_5"));

        let (decoded_section, decoded) = decode_question(&wire).unwrap();
        assert_eq!(decoded_section, section_id);
        assert_eq!(decoded.options, node.options);
    }

    #[test]
    fn choice_options_truncate_at_fifteen() {
        let wire = encode_question(Uuid::new_v4(), &choice_question(20));
        assert_eq!(wire.slots.len(), CHOICE_SLOTS);
        let (_, decoded) = decode_question(&wire).unwrap();
        assert_eq!(decoded.options.len(), CHOICE_SLOTS);
        assert_eq!(decoded.options[14], "Option 15");
    }

    #[test]
    fn dropdown_uses_its_own_prefix_and_cap() {
        let mut node = QuestionNode::new(QuestionType::Dropdown);
        node.options = (1..=60).map(|i| format!("Item {i}")).collect();
        let wire = encode_question(Uuid::new_v4(), &node);
        assert_eq!(wire.slots.len(), DROPDOWN_SLOTS);
        assert!(wire.slots.contains_key("dropdown_50"));
        assert!(!wire.slots.contains_key("choice_1"));

        let (_, decoded) = decode_question(&wire).unwrap();
        assert_eq!(decoded.options.len(), DROPDOWN_SLOTS);
    }

    #[test]
    fn empty_slots_are_skipped_when_collecting() {
        let mut node = choice_question(3);
        node.options[1] = String::new();
        let mut wire = encode_question(Uuid::new_v4(), &node);
        wire.slots.insert("choice_9".to_string(), None);
        let (_, decoded) = decode_question(&wire).unwrap();
        assert_eq!(decoded.options, vec!["Option 1", "Option 3"]);
    }

    #[test]
    fn file_types_travel_as_comma_string() {
        let mut node = QuestionNode::new(QuestionType::FileUpload);
        node.file_types = vec!["pdf".to_string(), "docx".to_string()];
        node.max_file_size = Some(10);
        let wire = encode_question(Uuid::new_v4(), &node);
        assert_eq!(wire.file_types.as_deref(), Some("pdf,docx"));

        let (_, decoded) = decode_question(&wire).unwrap();
        assert_eq!(decoded.file_types, vec!["pdf", "docx"]);
        assert_eq!(decoded.max_file_size, Some(10));
        assert!(decoded.configured);
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut wire = encode_question(Uuid::new_v4(), &QuestionNode::new(QuestionType::ShortText));
        wire.question_type = "essay".to_string();
        assert!(matches!(
            decode_question(&wire),
            Err(WireError::UnknownQuestionType(_))
        ));
    }

    #[test]
    fn save_payload_groups_flat_questions_by_section() {
        let section_a = Uuid::new_v4();
        let section_b = Uuid::new_v4();
        let mut q1 = encode_question(section_a, &QuestionNode::new(QuestionType::ShortText));
        q1.order_index = 1;
        let mut q2 = encode_question(section_a, &QuestionNode::new(QuestionType::LongText));
        q2.order_index = 0;
        let q3 = encode_question(section_b, &QuestionNode::new(QuestionType::Checkboxes));

        let payload = SaveFormPayload {
            title: "Apply".to_string(),
            description: String::new(),
            theme: None,
            sections: vec![
                WireSection {
                    id: section_b,
                    title: "B".to_string(),
                    description: String::new(),
                    order_index: 1,
                    questions: Vec::new(),
                },
                WireSection {
                    id: section_a,
                    title: "A".to_string(),
                    description: String::new(),
                    order_index: 0,
                    questions: Vec::new(),
                },
            ],
            questions: vec![q1.clone(), q2.clone(), q3],
            deleted_section_ids: Vec::new(),
            deleted_question_ids: Vec::new(),
        };

        let request = decode_save_payload(&payload).unwrap();
        assert_eq!(request.sections[0].id, section_a);
        assert_eq!(request.sections[0].questions[0].id, q2.id);
        assert_eq!(request.sections[0].questions[1].id, q1.id);
        assert_eq!(request.sections[1].questions.len(), 1);
        assert_eq!(request.theme, Theme::default());
    }

    #[test]
    fn save_payload_rejects_orphan_question() {
        let orphan = encode_question(Uuid::new_v4(), &QuestionNode::new(QuestionType::ShortText));
        let payload = SaveFormPayload {
            title: "Apply".to_string(),
            description: String::new(),
            theme: None,
            sections: Vec::new(),
            questions: vec![orphan],
            deleted_section_ids: Vec::new(),
            deleted_question_ids: Vec::new(),
        };
        assert!(matches!(
            decode_save_payload(&payload),
            Err(WireError::UnknownSection { .. })
        ));
    }

    #[test]
    fn deletion_keys_use_camel_case() {
        let payload = SaveFormPayload {
            title: "Apply".to_string(),
            description: String::new(),
            theme: None,
            sections: Vec::new(),
            questions: Vec::new(),
            deleted_section_ids: vec![Uuid::new_v4()],
            deleted_question_ids: vec![Uuid::new_v4()],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("deletedSectionIds").is_some());
        assert!(json.get("deletedQuestionIds").is_some());
    }

    #[test]
    fn bad_colors_fall_back_to_defaults() {
        let theme = Theme {
            primary_color: "blue".to_string(),
            background_color: "#ffeedd".to_string(),
            ..Theme::default()
        };
        let sanitized = sanitize_theme(theme);
        assert_eq!(sanitized.primary_color, "#3b82f6");
        assert_eq!(sanitized.background_color, "#ffeedd");
    }
}
