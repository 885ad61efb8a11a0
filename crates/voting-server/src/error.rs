//! HTTP boundary error mapping (SPEC_FULL.md §7, §10.2). `ApiError` is the
//! only place a `CoreError` (or a request-level validation failure) turns
//! into a status code and a `{"detail": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use voting_types::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ApiError {
    fn status_and_detail(&self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Core(err) => core_status_and_detail(err),
        }
    }
}

/// Classifies a `CoreError` per §7's taxonomy. ValidationError/StateError/
/// QuorumError/CryptoError all surface as 400 (404 for the not-found
/// subset); TransientError surfaces as 500.
fn core_status_and_detail(err: &CoreError) -> (StatusCode, String) {
    let status = match err {
        CoreError::ElectionNotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Validation(_)
        | CoreError::WrongStatus(_)
        | CoreError::AlreadyCeremonied
        | CoreError::CodeConsumed
        | CoreError::TokenReplay
        | CoreError::DuplicateBallot
        | CoreError::UnknownToken
        | CoreError::InvalidCode
        | CoreError::NoCandidates
        | CoreError::NoEligibleVoters
        | CoreError::NoBallots
        | CoreError::InsufficientTrustees { .. }
        | CoreError::InsufficientShares { .. }
        | CoreError::InvalidTokenSignature
        | CoreError::Crypto(_)
        | CoreError::PrimeTooSmall(_) => StatusCode::BAD_REQUEST,
        CoreError::Store(_) | CoreError::BulletinUnreachable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.status_and_detail();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(%detail, "request failed with a transient error");
        } else {
            tracing::warn!(%detail, %status, "request rejected");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
