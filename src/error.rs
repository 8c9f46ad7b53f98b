use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failure kinds surfaced by graph operations and the media workflow.
#[derive(Error, Debug)]
pub enum SocialError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("no {0} relationship")]
    NoRelationship(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("storage failure: {0}")]
    StorageFailure(String),

    #[error("unexpected record shape: {0}")]
    EncodingFailure(String),

    #[error("deadline exceeded during {0}")]
    DeadlineExceeded(&'static str),

    #[error("{0}")]
    Unauthorized(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type SocialResult<T> = Result<T, SocialError>;

impl SocialError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn storage(msg: impl std::fmt::Display) -> Self {
        Self::StorageFailure(msg.to_string())
    }

    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::EncodingFailure(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SocialError::NotFound(_) | SocialError::NoRelationship(_) => StatusCode::NOT_FOUND,
            SocialError::Conflict(_) => StatusCode::CONFLICT,
            SocialError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SocialError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            SocialError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            SocialError::StorageFailure(_)
            | SocialError::EncodingFailure(_)
            | SocialError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<neo4rs::Error> for SocialError {
    fn from(e: neo4rs::Error) -> Self {
        SocialError::StorageFailure(e.to_string())
    }
}

impl From<std::io::Error> for SocialError {
    fn from(e: std::io::Error) -> Self {
        SocialError::StorageFailure(e.to_string())
    }
}

impl IntoResponse for SocialError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_distinct_statuses() {
        assert_eq!(SocialError::not_found("user 1").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            SocialError::NoRelationship("FOLLOWS").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            SocialError::Conflict("Email already in use".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(SocialError::invalid("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SocialError::DeadlineExceeded("user.create").status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            SocialError::encoding("id").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_name_the_missing_thing() {
        assert_eq!(SocialError::not_found("post 7").to_string(), "post 7 not found");
        assert_eq!(
            SocialError::NoRelationship("LIKED").to_string(),
            "no LIKED relationship"
        );
    }
}
