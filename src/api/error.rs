use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Errors returned by the HTTP handlers.
///
/// Every variant leaves stored state untouched: handlers return these before
/// writing, or in place of a write that did not apply.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing session, or the session user is not the owner/author the
    /// operation requires.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The document changed between read and write.
    #[error("{0} was modified by another request")]
    Conflict(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            Self::Unauthorized => status.into_response(),
            Self::Internal(err) => {
                tracing::error!(?err, "internal server error");
                let body = serde_json::json!({ "error": format!("{err:#}") });
                (status, Json(body)).into_response()
            }
            err => {
                tracing::info!("returning error to client: {err}");
                let body = serde_json::json!({ "error": err.to_string() });
                (status, Json(body)).into_response()
            }
        }
    }
}
