use axum::{
    Router,
    extract::{Path, State},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::Theme;
use serde::{Deserialize, Serialize};
use services::services::{
    FormGenerator, FormStore, OpenAiClient,
    form_generator::GeneratedForm,
    form_store::SaveOutcome,
    wire::{SaveFormPayload, WireSection, decode_save_payload, encode_sections},
};
use tokio_util::sync::CancellationToken;
use ts_rs::TS;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{auth::RequireSession, error::ApiError, state::AppState};

#[derive(Debug, Serialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct FormData {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub theme: Theme,
    pub published: bool,
}

#[derive(Debug, Serialize, TS)]
pub struct QuestionsResponse {
    pub sections: Vec<WireSection>,
}

#[derive(Debug, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct AiGenerateRequest {
    pub company_id: Uuid,
    pub form_id: Uuid,
}

/// GET /api/companies/forms/{form_id}
pub async fn get_form(
    State(state): State<AppState>,
    _session: RequireSession,
    Path(form_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<FormData>>, ApiError> {
    let store = FormStore::new(state.db.clone());
    let session = store.load(form_id).await?;

    Ok(ResponseJson(ApiResponse::success(FormData {
        id: session.form_id,
        title: session.title.clone(),
        description: session.description.clone(),
        theme: session.theme.clone(),
        published: session.published,
    })))
}

/// GET /api/companies/forms/{form_id}/questions
/// Full section tree with questions flattened into option slots
pub async fn get_questions(
    State(state): State<AppState>,
    _session: RequireSession,
    Path(form_id): Path<Uuid>,
) -> Result<ResponseJson<ApiResponse<QuestionsResponse>>, ApiError> {
    let store = FormStore::new(state.db.clone());
    let session = store.load(form_id).await?;

    Ok(ResponseJson(ApiResponse::success(QuestionsResponse {
        sections: encode_sections(&session.sections),
    })))
}

/// POST /api/companies/forms/{form_id}/questions
/// Save the whole form: metadata, sections, questions and queued deletions
pub async fn save_questions(
    State(state): State<AppState>,
    _session: RequireSession,
    Path(form_id): Path<Uuid>,
    axum::Json(payload): axum::Json<SaveFormPayload>,
) -> Result<ResponseJson<ApiResponse<SaveOutcome>>, ApiError> {
    let request = decode_save_payload(&payload)?;
    let store = FormStore::new(state.db.clone());
    let outcome = store.save_request(form_id, &request, false).await?;
    let message = outcome.message.clone();

    Ok(ResponseJson(ApiResponse::success_with_message(
        outcome, message,
    )))
}

/// POST /api/companies/forms/ai-generate
/// Generate a form from company context and apply it to the target form
pub async fn ai_generate(
    State(state): State<AppState>,
    _session: RequireSession,
    axum::Json(payload): axum::Json<AiGenerateRequest>,
) -> Result<ResponseJson<ApiResponse<GeneratedForm>>, ApiError> {
    let client = OpenAiClient::from_env()?;
    let generator = FormGenerator::new(state.db.clone(), client);
    let generated = generator.generate(payload.company_id).await?;

    let store = FormStore::new(state.db.clone());
    let mut session = store.load(payload.form_id).await?;
    let cancel = CancellationToken::new();
    FormGenerator::apply(&store, &mut session, &generated, &cancel).await?;

    Ok(ResponseJson(ApiResponse::success(generated)))
}

pub fn router() -> Router<AppState> {
    let forms = Router::new()
        .route("/ai-generate", post(ai_generate))
        .route("/{form_id}", get(get_form))
        .route(
            "/{form_id}/questions",
            get(get_questions).post(save_questions),
        );
    Router::new().nest("/companies/forms", forms)
}
