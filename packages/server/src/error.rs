use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use common::storage::StorageError;
use sea_orm::DbErr;
use serde::Serialize;

use crate::repository::RepoError;
use crate::search::{IndexError, SyncError};
use crate::store::StoreError;

/// Structured error response returned by all endpoints on failure.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code. One of: `VALIDATION_ERROR`, `NOT_FOUND`,
    /// `PAYLOAD_TOO_LARGE`, `STORE_UNAVAILABLE`, `COMMIT_FAILED`,
    /// `INDEX_UNAVAILABLE`, `INTERNAL_ERROR`.
    #[schema(example = "NOT_FOUND")]
    pub code: &'static str,
    /// Human-readable error description.
    #[schema(example = "Note 6f1d0c3e9b7a4f25a8e4c1d2b3a49f10 not found")]
    pub message: String,
}

/// Application-level error type.
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    NotFound(String),
    PayloadTooLarge(String),
    /// Primary or blob store unreachable.
    StoreUnavailable(String),
    /// A transaction was rolled back; nothing was written.
    CommitFailed(String),
    /// Search index unreachable on a read path.
    IndexUnavailable(String),
    Internal(String),
}

impl AppError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        match self {
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    code: "VALIDATION_ERROR",
                    message: msg,
                },
            ),
            AppError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    code: "NOT_FOUND",
                    message: msg,
                },
            ),
            AppError::PayloadTooLarge(msg) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                ErrorBody {
                    code: "PAYLOAD_TOO_LARGE",
                    message: msg,
                },
            ),
            AppError::StoreUnavailable(detail) => {
                tracing::error!("Store unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "STORE_UNAVAILABLE",
                        message: "Storage is temporarily unavailable".into(),
                    },
                )
            }
            AppError::CommitFailed(detail) => {
                tracing::error!("Commit failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "COMMIT_FAILED",
                        message: "The change could not be saved".into(),
                    },
                )
            }
            AppError::IndexUnavailable(detail) => {
                tracing::warn!("Search index unavailable: {}", detail);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        code: "INDEX_UNAVAILABLE",
                        message: "Search is temporarily unavailable".into(),
                    },
                )
            }
            AppError::Internal(detail) => {
                tracing::error!("Internal error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        code: "INTERNAL_ERROR",
                        message: "An unexpected error occurred".into(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        AppError::StoreUnavailable(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(e) => AppError::StoreUnavailable(e.to_string()),
            StoreError::CommitFailed(detail) => AppError::CommitFailed(detail),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(hash) => AppError::NotFound(format!("Blob {hash}")),
            StorageError::InvalidHash(detail) => AppError::Validation(detail),
            StorageError::SizeLimitExceeded { actual, limit } => AppError::PayloadTooLarge(
                format!("Content of {actual} bytes exceeds the {limit} byte limit"),
            ),
            StorageError::Unavailable(e) => AppError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(what) => AppError::NotFound(format!("{what} not found")),
            RepoError::Validation(msg) => AppError::Validation(msg),
            RepoError::Store(e) => e.into(),
            RepoError::Blob(e) => e.into(),
            RepoError::Corrupt(detail) => AppError::Internal(detail),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        AppError::IndexUnavailable(err.to_string())
    }
}

impl From<SyncError> for AppError {
    fn from(err: SyncError) -> Self {
        match err {
            SyncError::Index(e) => e.into(),
            SyncError::Repo(e) => e.into(),
            SyncError::Outbox(e) => e.into(),
        }
    }
}
