use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Request-level failure taxonomy. Everything a handler can surface maps to
/// one of these; the `IntoResponse` impl turns each into a status code plus
/// the `{"message": ...}` envelope clients expect.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing user or post. Id-based store reads report absence as `None`;
    /// handlers convert that to this.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Malformed input against the entity shapes.
    #[error("{0}")]
    Validation(String),

    /// The (post, user) pair already holds a kudos.
    #[error("kudos already given to this post")]
    DuplicateKudos,

    /// The participation gate rejected the read, or the caller is not the
    /// post's owner. Distinct from authentication failure.
    #[error("{0}")]
    AccessDenied(String),

    #[error("{0}")]
    Unauthenticated(String),

    /// Username or email already registered.
    #[error("{0}")]
    Conflict(String),

    /// Anything else (store unavailable, hashing failure). Fatal for the
    /// request, never retried.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::DuplicateKudos => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::AccessDenied(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ApiError::Unauthenticated(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ApiError::Internal(e) => {
                error!(error = %e, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(
            ApiError::NotFound("post").into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::DuplicateKudos.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::AccessDenied("nope".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::Internal(anyhow::anyhow!("boom"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
