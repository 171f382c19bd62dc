//! Error taxonomy shared by the refresh pipeline, the store and the handlers.

use axum::{http::StatusCode, Json};

use crate::models::crypto::ErrorResponse;

#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Upstream unreachable, non-2xx, malformed or incomplete payload
    AcquisitionFailed(String),
    /// Asset has no persisted record yet
    NotFound(String),
    /// Identifier outside the fixed catalog
    InvalidAsset(String),
    StoreFailure(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::AcquisitionFailed(msg) => write!(f, "Acquisition failed: {}", msg),
            AppError::NotFound(asset) => {
                write!(f, "Cryptocurrency data not found for '{}'", asset)
            }
            AppError::InvalidAsset(_) => write!(f, "Invalid or missing coin parameter"),
            AppError::StoreFailure(msg) => write!(f, "Store failure: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::StoreFailure(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::AcquisitionFailed(err.to_string())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::AcquisitionFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidAsset(_) => StatusCode::BAD_REQUEST,
            AppError::StoreFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error half of the handlers' `Result`
    pub fn into_response_parts(self) -> (StatusCode, Json<ErrorResponse>) {
        (
            self.status_code(),
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
    }
}
