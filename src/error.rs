// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP-facing error body and the mapping from domain errors.
//!
//! Internal failures (storage, cipher, hashing) keep their detail in the logs
//! and surface as a generic 500.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::AuthServiceError;
use crate::cards::CardError;
use crate::storage::StorageError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    error_code: &'static str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, code, message)
    }

    /// Log `detail` and return a response that does not carry it.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Request failed with internal error");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            error_code: self.code,
        });
        (self.status, body).into_response()
    }
}

impl From<CardError> for ApiError {
    fn from(err: CardError) -> Self {
        match err {
            CardError::NotFound(_) => ApiError::not_found(err.to_string()),
            CardError::AlreadyExists => ApiError::conflict("card_already_exists", err.to_string()),
            CardError::NotActive(message) => ApiError::conflict("card_not_active", message),
            CardError::InsufficientFunds => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, "insufficient_funds", err.to_string())
            }
            CardError::Operation(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, "card_operation_error", message)
            }
            CardError::Encryption(_) | CardError::Storage(_) => ApiError::internal(err),
        }
    }
}

impl From<AuthServiceError> for ApiError {
    fn from(err: AuthServiceError) -> Self {
        match err {
            AuthServiceError::InvalidCredentials => {
                ApiError::new(StatusCode::UNAUTHORIZED, "invalid_credentials", err.to_string())
            }
            AuthServiceError::DuplicateUsername => ApiError::conflict("username_taken", err.to_string()),
            AuthServiceError::DuplicateEmail => ApiError::conflict("email_taken", err.to_string()),
            AuthServiceError::Validation(message) => {
                ApiError::new(StatusCode::BAD_REQUEST, "validation_error", message)
            }
            AuthServiceError::Password(_) | AuthServiceError::Token(_) | AuthServiceError::Storage(_) => {
                ApiError::internal(err)
            }
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => ApiError::not_found(format!("{what} not found")),
            other => ApiError::internal(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::CipherError;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn card_errors_map_to_statuses() {
        let cases = [
            (CardError::NotFound("Card 3".into()), StatusCode::NOT_FOUND),
            (CardError::AlreadyExists, StatusCode::CONFLICT),
            (CardError::NotActive("inactive".into()), StatusCode::CONFLICT),
            (CardError::InsufficientFunds, StatusCode::UNPROCESSABLE_ENTITY),
            (CardError::operation("Card is expired"), StatusCode::BAD_REQUEST),
            (CardError::Encryption(CipherError::Decrypt), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn auth_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(AuthServiceError::InvalidCredentials).status,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(AuthServiceError::DuplicateUsername).status,
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(AuthServiceError::Validation("bad".into())).status,
            StatusCode::BAD_REQUEST
        );
    }

    #[tokio::test]
    async fn not_found_body_carries_message_and_code() {
        let response = ApiError::from(CardError::NotFound("Card 3".into())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = body_json(response).await;
        assert_eq!(body["error"], "Card 3 not found");
        assert_eq!(body["error_code"], "not_found");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_detail() {
        let err = CardError::Storage(StorageError::NotFound("sequence cards".into()));
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], INTERNAL_MESSAGE);
        assert_eq!(body["error_code"], "internal_error");
    }
}
