use crate::{ocr::ExtractionError, services::store::StoreError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ShieldError {
    #[error("Missing upiId or bankRefId")]
    MissingFields,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<ExtractionError> for ShieldError {
    fn from(err: ExtractionError) -> Self {
        ShieldError::InvalidRequest(err.to_string())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl ShieldError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ShieldError::MissingFields => (StatusCode::BAD_REQUEST, "MISSING_FIELDS"),
            ShieldError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            ShieldError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ShieldError::Store(StoreError::NotFound { .. }) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            ShieldError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
            ShieldError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for ShieldError {
    fn into_response(self) -> Response {
        let request_id = Uuid::new_v4().to_string();
        let (status, error_code) = self.status_and_code();

        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
            error_code: error_code.to_string(),
            timestamp: Utc::now(),
            request_id,
        };

        tracing::error!(
            error = ?self,
            error_code = error_code,
            "Request failed"
        );

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_is_bad_request() {
        let (status, code) = ShieldError::MissingFields.status_and_code();
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(code, "MISSING_FIELDS");
        assert_eq!(
            ShieldError::MissingFields.to_string(),
            "Missing upiId or bankRefId"
        );
    }

    #[test]
    fn store_lookup_miss_maps_to_not_found() {
        let err = ShieldError::from(StoreError::NotFound {
            kind: "receipt",
            id: 7,
        });
        assert_eq!(err.status_and_code().0, StatusCode::NOT_FOUND);
    }

    #[test]
    fn extraction_errors_are_client_errors() {
        let err = ShieldError::from(ExtractionError::EmptyInput);
        assert_eq!(err.status_and_code().0, StatusCode::BAD_REQUEST);
    }
}
