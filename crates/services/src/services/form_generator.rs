//! AI generation of application forms from company context.

use std::str::FromStr;
use std::time::Duration;

use db::{
    DBService,
    models::{Company, Internship, QuestionType},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use super::editor::{FormEditSession, QuestionNode, SectionNode};
use super::form_store::{FormStore, FormStoreError, SaveOutcome};
use super::openai_api::{OpenAiClient, OpenAiError};

const WEBSITE_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const WEBSITE_TEXT_CAP: usize = 3000;
const GENERATION_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Error)]
pub enum FormGeneratorError {
    #[error("company not found: {0}")]
    CompanyNotFound(Uuid),
    #[error("openai error: {0}")]
    OpenAi(#[from] OpenAiError),
    #[error("store error: {0}")]
    Store(#[from] FormStoreError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("generation cancelled")]
    Cancelled,
}

/// Form structure as the model returns it, before normalization.
#[derive(Debug, Deserialize)]
struct RawFormResponse {
    #[serde(default)]
    summary: String,
    #[serde(default, rename = "matchedOpportunityId")]
    matched_opportunity_id: Option<String>,
    #[serde(default)]
    sections: Vec<RawSection>,
    #[serde(default, rename = "sourcesUsed")]
    sources_used: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    questions: Vec<RawQuestion>,
}

#[derive(Debug, Deserialize)]
struct RawQuestion {
    #[serde(default, rename = "type")]
    question_type: String,
    #[serde(default)]
    question_text: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    placeholder: String,
    #[serde(default)]
    hint: String,
    #[serde(default)]
    options: Vec<String>,
    #[serde(default)]
    file_types: Vec<String>,
    #[serde(default)]
    max_file_size: Option<i64>,
    #[serde(default)]
    max_duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct GeneratedQuestion {
    pub question_type: QuestionType,
    pub question_text: String,
    pub description: String,
    pub required: bool,
    pub placeholder: String,
    pub hint: String,
    pub options: Vec<String>,
    pub file_types: Vec<String>,
    pub max_file_size: Option<i64>,
    pub max_duration: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct GeneratedSection {
    pub title: String,
    pub description: String,
    pub questions: Vec<GeneratedQuestion>,
}

/// Normalized output of one generation run.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedForm {
    pub summary: String,
    pub matched_opportunity_id: Option<Uuid>,
    pub sections: Vec<GeneratedSection>,
    pub sources_used: Vec<String>,
    pub company_name: String,
}

/// Builds application forms from company data, its website and its open
/// internship postings.
#[derive(Clone)]
pub struct FormGenerator {
    db: DBService,
    client: OpenAiClient,
    http: reqwest::Client,
}

impl FormGenerator {
    pub fn new(db: DBService, client: OpenAiClient) -> Self {
        Self {
            db,
            client,
            http: reqwest::Client::new(),
        }
    }

    /// Run one generation for the given company.
    pub async fn generate(&self, company_id: Uuid) -> Result<GeneratedForm, FormGeneratorError> {
        let company = Company::find_by_id(&self.db.pool, company_id)
            .await?
            .ok_or(FormGeneratorError::CompanyNotFound(company_id))?;
        let internships = Internship::find_active_by_company(&self.db.pool, company_id).await?;

        let website_text = match &company.website {
            Some(url) => self.fetch_website_text(url).await,
            None => String::new(),
        };

        let prompt = build_prompt(&company, &internships, &website_text);
        let raw: RawFormResponse = self
            .client
            .ask_json(SYSTEM_PROMPT, &prompt, GENERATION_MAX_TOKENS)
            .await?;

        let matched_opportunity_id =
            match_opportunity(raw.matched_opportunity_id.as_deref(), &internships);

        let mut sources_used = raw.sources_used;
        if sources_used.is_empty() {
            sources_used.push("company profile".to_string());
            if !website_text.is_empty() {
                sources_used.push("company website".to_string());
            }
            if !internships.is_empty() {
                sources_used.push("internship postings".to_string());
            }
        }

        let form = GeneratedForm {
            summary: if raw.summary.is_empty() {
                format!("Generated application form for {}", company.company_name)
            } else {
                raw.summary
            },
            matched_opportunity_id,
            sections: raw
                .sections
                .into_iter()
                .enumerate()
                .map(|(i, section)| normalize_section(i, section))
                .collect(),
            sources_used,
            company_name: company.company_name.clone(),
        };
        info!(
            company_id = %company_id,
            sections = form.sections.len(),
            "generated form structure"
        );
        Ok(form)
    }

    /// Fetch and flatten a company website into plain text. Any failure is
    /// tolerated, generation proceeds without it.
    async fn fetch_website_text(&self, url: &str) -> String {
        let response = match self
            .http
            .get(url)
            .timeout(WEBSITE_FETCH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(url = %url, error = %e, "website fetch failed, continuing without it");
                return String::new();
            }
        };
        let html = match response.text().await {
            Ok(html) => html,
            Err(e) => {
                warn!(url = %url, error = %e, "website body unreadable, continuing without it");
                return String::new();
            }
        };
        strip_html(&html)
    }

    /// Replace the session tree with the generated one and persist it. The
    /// whole tree is built before anything is touched, so a cancellation
    /// leaves the session exactly as it was. A failed save rolls back to the
    /// pre-apply checkpoint.
    pub async fn apply(
        store: &FormStore,
        session: &mut FormEditSession,
        generated: &GeneratedForm,
        cancel: &CancellationToken,
    ) -> Result<SaveOutcome, FormGeneratorError> {
        let mut sections = Vec::with_capacity(generated.sections.len());
        for generated_section in &generated.sections {
            if cancel.is_cancelled() {
                return Err(FormGeneratorError::Cancelled);
            }
            let mut section = SectionNode::new(generated_section.title.clone());
            section.description = generated_section.description.clone();
            for question in &generated_section.questions {
                let mut node = QuestionNode::new(question.question_type);
                node.question_text = question.question_text.clone();
                node.description = question.description.clone();
                node.required = question.required;
                node.placeholder = question.placeholder.clone();
                node.hint = question.hint.clone();
                node.options = question.options.clone();
                node.file_types = question.file_types.clone();
                node.max_file_size = question.max_file_size;
                node.max_duration = question.max_duration;
                node.configured = node.derive_configured();
                section.questions.push(node);
            }
            sections.push(section);
        }
        if cancel.is_cancelled() {
            return Err(FormGeneratorError::Cancelled);
        }

        session.create_checkpoint();
        if !session.replace_sections(sections) {
            session.discard_checkpoint();
            return Err(FormGeneratorError::Store(
                FormStoreError::PublishedFormReadOnly,
            ));
        }
        match store.save_session(session, true).await {
            Ok(outcome) => {
                session.discard_checkpoint();
                Ok(outcome)
            }
            Err(e) => {
                if let Err(restore) = session.restore_checkpoint() {
                    warn!(error = %restore, "could not roll back after failed save");
                }
                Err(e.into())
            }
        }
    }
}

const SYSTEM_PROMPT: &str = "You are an assistant that designs internship application forms. \
Respond with a single JSON object of the shape \
{\"summary\": string, \"matchedOpportunityId\": string or null, \"sourcesUsed\": [string], \
\"sections\": [{\"title\": string, \"description\": string, \"questions\": [{\
\"type\": one of short_text, long_text, multiple_choice, checkboxes, dropdown, file_upload, video_upload, \
\"question_text\": string, \"description\": string, \"required\": bool, \
\"placeholder\": string, \"hint\": string, \"options\": [string], \
\"file_types\": [string], \"max_file_size\": number or null, \"max_duration\": number or null}]}]}. \
Choice questions need at least two options. Keep the form to three or four sections.";

/// Accept the model's matched posting only when it names one of the
/// company's own active internships.
fn match_opportunity(raw: Option<&str>, internships: &[Internship]) -> Option<Uuid> {
    raw.and_then(|id| Uuid::parse_str(id).ok())
        .filter(|id| internships.iter().any(|i| i.id == *id))
}

fn build_prompt(company: &Company, internships: &[Internship], website_text: &str) -> String {
    let mut prompt = format!("Design an internship application form for {}.", company.company_name);
    if let Some(industry) = &company.industry {
        prompt.push_str(&format!(" Industry: {}.", industry));
    }
    if let Some(description) = &company.description {
        prompt.push_str(&format!("\nCompany description: {}", description));
    }
    if !website_text.is_empty() {
        prompt.push_str(&format!("\nWebsite content:\n{}", website_text));
    }
    if !internships.is_empty() {
        prompt.push_str("\nOpen internship postings:");
        for internship in internships {
            prompt.push_str(&format!(
                "\n- id {}: {} ({})",
                internship.id,
                internship.title,
                internship.position.as_deref().unwrap_or("unspecified role")
            ));
        }
        prompt.push_str(
            "\nIf the form clearly targets one posting, set matchedOpportunityId to its id.",
        );
    }
    prompt
}

/// Strip tags and collapse whitespace, keeping at most `WEBSITE_TEXT_CAP`
/// characters of visible text.
fn strip_html(html: &str) -> String {
    static SCRIPT: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    static STYLE: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();
    static TAG: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let script = SCRIPT
        .get_or_init(|| regex::Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
    let style = STYLE
        .get_or_init(|| regex::Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
    let tag = TAG.get_or_init(|| regex::Regex::new(r"<[^>]*>").expect("valid regex"));

    let text = script.replace_all(html, " ");
    let text = style.replace_all(&text, " ");
    let text = tag.replace_all(&text, " ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(WEBSITE_TEXT_CAP).collect()
}

fn normalize_section(index: usize, raw: RawSection) -> GeneratedSection {
    GeneratedSection {
        title: if raw.title.is_empty() {
            format!("Section {}", index + 1)
        } else {
            raw.title
        },
        description: raw.description,
        questions: raw.questions.into_iter().map(normalize_question).collect(),
    }
}

fn normalize_question(raw: RawQuestion) -> GeneratedQuestion {
    let question_type = QuestionType::from_str(&raw.question_type).unwrap_or_else(|_| {
        warn!(
            question_type = %raw.question_type,
            "unknown generated question type, falling back to short_text"
        );
        QuestionType::ShortText
    });

    let mut options = if question_type.has_options() {
        raw.options
            .into_iter()
            .filter(|option| !option.is_empty())
            .collect()
    } else {
        Vec::new()
    };
    if question_type.has_options() {
        while options.len() < 2 {
            options.push(format!("Option {}", options.len() + 1));
        }
    }

    let file_types = if question_type.has_file_config() {
        raw.file_types
    } else {
        Vec::new()
    };

    GeneratedQuestion {
        question_type,
        question_text: if raw.question_text.is_empty() {
            "Untitled Question".to_string()
        } else {
            raw.question_text
        },
        description: raw.description,
        required: raw.required,
        placeholder: raw.placeholder,
        hint: raw.hint,
        options,
        file_types,
        max_file_size: if question_type.has_file_config() {
            raw.max_file_size
        } else {
            None
        },
        max_duration: if question_type.has_file_config() {
            raw.max_duration
        } else {
            None
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::Form;

    fn raw_question(question_type: &str) -> RawQuestion {
        RawQuestion {
            question_type: question_type.to_string(),
            question_text: String::new(),
            description: String::new(),
            required: false,
            placeholder: String::new(),
            hint: String::new(),
            options: Vec::new(),
            file_types: Vec::new(),
            max_file_size: None,
            max_duration: None,
        }
    }

    fn generated_form(sections: Vec<GeneratedSection>) -> GeneratedForm {
        GeneratedForm {
            summary: "test".to_string(),
            matched_opportunity_id: None,
            sections,
            sources_used: Vec::new(),
            company_name: "Acme".to_string(),
        }
    }

    fn generated_section(title: &str, questions: usize) -> GeneratedSection {
        GeneratedSection {
            title: title.to_string(),
            description: String::new(),
            questions: (0..questions)
                .map(|i| GeneratedQuestion {
                    question_type: QuestionType::ShortText,
                    question_text: format!("Question {i}"),
                    description: String::new(),
                    required: false,
                    placeholder: String::new(),
                    hint: String::new(),
                    options: Vec::new(),
                    file_types: Vec::new(),
                    max_file_size: None,
                    max_duration: None,
                })
                .collect(),
        }
    }

    async fn store_with_form() -> (FormStore, Uuid) {
        let db = DBService::new_in_memory().await.unwrap();
        let company = Company::create(&db.pool, "Acme", None, None, None)
            .await
            .unwrap();
        let form = Form::create(&db.pool, company.id, "Draft", "").await.unwrap();
        (FormStore::new(db), form.id)
    }

    #[tokio::test]
    async fn prompt_embeds_company_context_and_postings() {
        let db = DBService::new_in_memory().await.unwrap();
        let company = Company::create(
            &db.pool,
            "Acme",
            Some("We build rockets"),
            Some("Aerospace"),
            None,
        )
        .await
        .unwrap();
        let propulsion = Internship::create(
            &db.pool,
            company.id,
            "Propulsion Intern",
            Some("Engineering"),
            None,
            None,
        )
        .await
        .unwrap();
        Internship::create(&db.pool, company.id, "Marketing Intern", None, None, None)
            .await
            .unwrap();
        let postings = Internship::find_active_by_company(&db.pool, company.id)
            .await
            .unwrap();
        assert_eq!(postings.len(), 2);

        let prompt = build_prompt(&company, &postings, "Acme builds reusable rockets");
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("Aerospace"));
        assert!(prompt.contains("We build rockets"));
        assert!(prompt.contains("Acme builds reusable rockets"));
        assert!(prompt.contains(&propulsion.id.to_string()));
        assert!(prompt.contains("Propulsion Intern (Engineering)"));
        assert!(prompt.contains("Marketing Intern (unspecified role)"));
        assert!(prompt.contains("matchedOpportunityId"));
    }

    #[tokio::test]
    async fn matched_opportunity_must_name_an_active_posting() {
        let db = DBService::new_in_memory().await.unwrap();
        let company = Company::create(&db.pool, "Acme", None, None, None)
            .await
            .unwrap();
        let posting = Internship::create(&db.pool, company.id, "Data Intern", None, None, None)
            .await
            .unwrap();
        let postings = Internship::find_active_by_company(&db.pool, company.id)
            .await
            .unwrap();

        assert_eq!(
            match_opportunity(Some(&posting.id.to_string()), &postings),
            Some(posting.id)
        );
        assert_eq!(
            match_opportunity(Some(&Uuid::new_v4().to_string()), &postings),
            None
        );
        assert_eq!(match_opportunity(Some("not-a-uuid"), &postings), None);
        assert_eq!(match_opportunity(None, &postings), None);
    }

    #[test]
    fn unknown_type_normalizes_to_short_text() {
        let question = normalize_question(raw_question("essay"));
        assert_eq!(question.question_type, QuestionType::ShortText);
        assert_eq!(question.question_text, "Untitled Question");
        assert!(question.options.is_empty());
    }

    #[test]
    fn choice_questions_get_at_least_two_options() {
        let mut raw = raw_question("multiple_choice");
        raw.options = vec!["Only one".to_string(), String::new()];
        let question = normalize_question(raw);
        assert_eq!(question.options, vec!["Only one", "Option 2"]);

        let question = normalize_question(raw_question("dropdown"));
        assert_eq!(question.options, vec!["Option 1", "Option 2"]);
    }

    #[test]
    fn file_config_is_dropped_for_text_questions() {
        let mut raw = raw_question("short_text");
        raw.max_file_size = Some(10);
        raw.file_types = vec!["pdf".to_string()];
        let question = normalize_question(raw);
        assert!(question.file_types.is_empty());
        assert_eq!(question.max_file_size, None);
    }

    #[test]
    fn strip_html_removes_scripts_and_tags() {
        let html = "<html><head><style>body{}</style>\
            <script>var x = 1;</script></head>\
            <body><h1>Acme</h1><p>We   build things.</p></body></html>";
        assert_eq!(strip_html(html), "Acme We build things.");
    }

    #[test]
    fn strip_html_caps_output_length() {
        let html = format!("<p>{}</p>", "a".repeat(5000));
        assert_eq!(strip_html(&html).len(), WEBSITE_TEXT_CAP);
    }

    #[tokio::test]
    async fn apply_replaces_tree_with_fresh_ids_and_saves() {
        let (store, form_id) = store_with_form().await;
        let mut session = store.load(form_id).await.unwrap();
        let old_section = session.add_section().unwrap();
        session
            .add_question(old_section, QuestionType::ShortText)
            .unwrap();
        store.save_session(&mut session, true).await.unwrap();

        let generated = generated_form(vec![
            generated_section("Background", 3),
            generated_section("Motivation", 3),
        ]);
        let cancel = CancellationToken::new();
        let outcome = FormGenerator::apply(&store, &mut session, &generated, &cancel)
            .await
            .unwrap();
        assert_eq!(outcome.sections_saved, 2);
        assert_eq!(outcome.questions_saved, 6);

        let reloaded = store.load(form_id).await.unwrap();
        assert_eq!(reloaded.sections.len(), 2);
        assert_eq!(reloaded.sections[0].title, "Background");
        assert_eq!(reloaded.sections[0].questions.len(), 3);
        assert!(reloaded.sections.iter().all(|s| s.id != old_section));
        assert!(session.deleted_sections().is_empty());
    }

    #[tokio::test]
    async fn cancelled_apply_leaves_session_untouched() {
        let (store, form_id) = store_with_form().await;
        let mut session = store.load(form_id).await.unwrap();
        let section_id = session.add_section().unwrap();
        store.save_session(&mut session, true).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();
        let generated = generated_form(vec![generated_section("Background", 2)]);
        let err = FormGenerator::apply(&store, &mut session, &generated, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, FormGeneratorError::Cancelled));
        assert_eq!(session.sections.len(), 1);
        assert_eq!(session.sections[0].id, section_id);
        assert!(session.deleted_sections().is_empty());
    }

    #[tokio::test]
    async fn failed_save_rolls_back_to_checkpoint() {
        let (store, form_id) = store_with_form().await;
        let mut session = store.load(form_id).await.unwrap();
        let section_id = session.add_section().unwrap();
        store.save_session(&mut session, true).await.unwrap();

        // published behind the session's back, so the save inside apply fails
        Form::set_published(&store.db().pool, form_id, true)
            .await
            .unwrap();

        let generated = generated_form(vec![generated_section("Background", 2)]);
        let cancel = CancellationToken::new();
        let err = FormGenerator::apply(&store, &mut session, &generated, &cancel)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FormGeneratorError::Store(FormStoreError::PublishedFormReadOnly)
        ));
        assert_eq!(session.sections.len(), 1);
        assert_eq!(session.sections[0].id, section_id);
        assert!(session.deleted_sections().is_empty());
    }
}
