//! HTTP error mapping for practiced

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use practice_common::api::ErrorResponse;
use practice_common::PracticeError;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Practice(#[from] PracticeError),

    /// Body missing, not JSON, or the wrong shape
    #[error("Invalid request body: {}", .0.body_text())]
    Body(#[from] JsonRejection),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        let err = match self {
            ApiError::Practice(err) => err,
            ApiError::Body(rejection) => return rejection.status(),
        };
        match err {
            PracticeError::EmptyCredentials => StatusCode::BAD_REQUEST,
            PracticeError::UsernameTaken => StatusCode::CONFLICT,
            PracticeError::InvalidCredentials | PracticeError::NotLoggedIn => {
                StatusCode::UNAUTHORIZED
            }
            PracticeError::AlreadyAnswered | PracticeError::AnswerPending => StatusCode::CONFLICT,
            PracticeError::QuestionsExhausted(_)
            | PracticeError::Hashing(_)
            | PracticeError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        // Internal details stay in the log
        let message = match &self {
            ApiError::Practice(err) if !err.is_user_facing() => {
                "Something went wrong. Please try again.".to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
