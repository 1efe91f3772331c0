use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledger::LedgerError;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// Route failure carrying the message shown to the client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(&'static str),
    #[error("{message}: {cause:#}")]
    Internal {
        message: &'static str,
        cause: anyhow::Error,
    },
}

impl ApiError {
    /// Validation failures become 400 with `invalid`; everything else is a
    /// 500 with `failed`.
    pub fn classify(err: anyhow::Error, invalid: &'static str, failed: &'static str) -> Self {
        if matches!(
            err.downcast_ref::<LedgerError>(),
            Some(LedgerError::InvalidInput(_))
        ) {
            ApiError::BadRequest(invalid)
        } else {
            ApiError::Internal {
                message: failed,
                cause: err,
            }
        }
    }

    pub fn internal(failed: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |cause| ApiError::Internal {
            message: failed,
            cause,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, *message),
            ApiError::Internal { message, .. } => (StatusCode::INTERNAL_SERVER_ERROR, *message),
        };
        warn!("request failed: {self}");
        (status, Json(ErrorBody { error })).into_response()
    }
}
