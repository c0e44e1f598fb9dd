use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::store::StoreError;

/// One rejected form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Collects per-field problems so a form reports all of them at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(pub Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_string(),
            message: message.into(),
        });
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field == field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), AppError> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(AppError::ValidationFailed(self))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("sign-in was cancelled")]
    AuthCancelled,
    #[error("identity provider error: {0}")]
    AuthProvider(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("store operation failed: {0}")]
    StoreOperationFailed(StoreError),
    #[error("{0} not found")]
    NotFound(String),
    #[error("classification failed: {0}")]
    ClassificationFailed(String),
    #[error("generation failed: {0}")]
    GenerationFailed(String),
    #[error("moderation of {field} for interaction {interaction_id} is already running")]
    ModerationInFlight {
        interaction_id: String,
        field: String,
    },
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed")]
    ValidationFailed(ValidationErrors),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => {
                AppError::NotFound(format!("{collection}/{id}"))
            }
            other => AppError::StoreOperationFailed(other),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::AuthCancelled | AppError::AuthProvider(_) | AppError::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ClassificationFailed(_) | AppError::GenerationFailed(_) => {
                StatusCode::BAD_GATEWAY
            }
            AppError::ModerationInFlight { .. } | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::StoreOperationFailed(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let fields = match &self {
            AppError::ValidationFailed(v) => v.0.clone(),
            _ => Vec::new(),
        };
        let body = ErrorBody {
            error: self.to_string(),
            fields,
        };
        (status, Json(body)).into_response()
    }
}
