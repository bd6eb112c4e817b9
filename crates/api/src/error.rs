use std::fmt::Display;

use axum::{
    Json,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::JsonRejection,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::api::MessageResponse;

use crate::{services::AuthFailure, stories::StoryError};

/// Every failure leaves the API as `{ "success": false, "message": ... }`.
#[derive(Debug)]
pub enum AppError {
    /// Internal errors - logged but return generic 500 to user
    Internal(anyhow::Error),
    /// User-facing errors - message is safe to show
    External(StatusCode, &'static str),
    /// Validation errors - safe to show
    Validation(String),
}

impl AppError {
    pub fn user_not_found() -> Self {
        Self::External(StatusCode::NOT_FOUND, "User not found")
    }

    pub fn invalid_upload() -> Self {
        Self::External(StatusCode::BAD_REQUEST, "Invalid file upload")
    }

    /// The vendor's reason is logged, never returned.
    pub fn upload_failed(reason: impl Display) -> Self {
        tracing::error!(%reason, "media upload failed");
        Self::External(StatusCode::BAD_GATEWAY, "Failed to upload media")
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Internal(err) => {
                tracing::error!("internal error: {:?}", err);
                sentry::capture_error(
                    err.as_ref() as &(dyn std::error::Error + Send + Sync + 'static)
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::External(status, msg) => (status, msg.to_string()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        (status, Json(MessageResponse::failure(message))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(error = %rejection.body_text(), "rejected multipart request");
        Self::invalid_upload()
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        tracing::debug!(error = %err, "malformed multipart field");
        Self::invalid_upload()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<AuthFailure> for AppError {
    fn from(err: AuthFailure) -> Self {
        match err {
            AuthFailure::Unauthenticated => {
                Self::External(StatusCode::UNAUTHORIZED, "User not authenticated")
            }
        }
    }
}

impl From<StoryError> for AppError {
    fn from(err: StoryError) -> Self {
        match err {
            StoryError::Unauthenticated => AuthFailure::Unauthenticated.into(),
            StoryError::UserNotFound => Self::user_not_found(),
            StoryError::MediaRequired => {
                Self::External(StatusCode::BAD_REQUEST, "Media file required")
            }
            StoryError::InvalidUpload => Self::invalid_upload(),
            StoryError::MediaUploadFailed(reason) => Self::upload_failed(reason),
            StoryError::ValidationFailed(msg) => Self::Validation(msg),
            StoryError::Internal(err) => Self::Internal(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn internal_error_returns_500_generic_message() {
        let err = AppError::Internal(anyhow::anyhow!("database connection failed"));
        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = response_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
    }

    #[tokio::test]
    async fn internal_error_hides_sensitive_details() {
        let err = AppError::Internal(anyhow::anyhow!("password=secret123 leaked"));
        let body = response_json(err.into_response()).await.to_string();

        assert!(!body.contains("secret123"));
        assert!(!body.contains("password"));
    }

    #[tokio::test]
    async fn unauthenticated_is_the_only_401() {
        let response = AppError::from(AuthFailure::Unauthenticated).into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response_json(response).await;
        assert_eq!(body["message"], "User not authenticated");
    }

    #[tokio::test]
    async fn story_errors_keep_the_envelope_shape() {
        let cases = [
            (StoryError::UserNotFound, StatusCode::NOT_FOUND),
            (StoryError::MediaRequired, StatusCode::BAD_REQUEST),
            (StoryError::InvalidUpload, StatusCode::BAD_REQUEST),
            (
                StoryError::MediaUploadFailed("timeout".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                StoryError::ValidationFailed("Story must have either content or media".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, status) in cases {
            let response = AppError::from(err).into_response();
            assert_eq!(response.status(), status);
            let body = response_json(response).await;
            assert_eq!(body["success"], false);
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }
    }

    #[tokio::test]
    async fn upload_failure_does_not_leak_vendor_message() {
        let err = StoryError::MediaUploadFailed("API error 403: bad private key".to_string());
        let body = response_json(AppError::from(err).into_response()).await;

        assert_eq!(body["message"], "Failed to upload media");
    }

    #[tokio::test]
    async fn shared_constructors_match_story_errors() {
        let pairs = [
            (AppError::user_not_found(), StoryError::UserNotFound),
            (AppError::invalid_upload(), StoryError::InvalidUpload),
            (
                AppError::upload_failed("timeout"),
                StoryError::MediaUploadFailed("timeout".to_string()),
            ),
        ];

        for (shared, story) in pairs {
            let shared = shared.into_response();
            let story = AppError::from(story).into_response();
            assert_eq!(shared.status(), story.status());
            assert_eq!(response_json(shared).await, response_json(story).await);
        }
    }
}
