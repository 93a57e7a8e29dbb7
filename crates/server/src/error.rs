use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use services::services::{
    form_generator::FormGeneratorError, form_store::FormStoreError, openai_api::OpenAiError,
    wire::WireError,
};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    FormStore(#[from] FormStoreError),
    #[error(transparent)]
    Generator(#[from] FormGeneratorError),
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error(transparent)]
    OpenAi(#[from] OpenAiError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Wire(_) => StatusCode::BAD_REQUEST,
            ApiError::FormStore(e) => form_store_status(e),
            ApiError::Generator(e) => match e {
                FormGeneratorError::CompanyNotFound(_) => StatusCode::NOT_FOUND,
                FormGeneratorError::Cancelled => StatusCode::CONFLICT,
                FormGeneratorError::Store(inner) => form_store_status(inner),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::OpenAi(_) | ApiError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn form_store_status(e: &FormStoreError) -> StatusCode {
    match e {
        FormStoreError::FormNotFound(_) => StatusCode::NOT_FOUND,
        FormStoreError::PublishedFormReadOnly => StatusCode::CONFLICT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(ApiResponse::<()>::error(self.to_string()));
        (status, body).into_response()
    }
}
