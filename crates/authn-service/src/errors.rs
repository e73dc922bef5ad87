//! Authentication service error types.
//!
//! Every operation returns a single [`AuthnError`]. Store failures are wrapped
//! with context on the way out but keep their [`ErrorKind`], so callers (and
//! the HTTP layer) can still tell a missing record from a broken backend.
//! Client-facing messages are generic; the wrapped detail is logged server-side.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Coarse error classification shared by every layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No authentication bound to a self-scoped request
    Unauthenticated,
    /// Unknown id at the store
    NotFound,
    /// Malformed input, e.g. an undecodable page token
    InvalidArgument,
    /// Unexpected store or transport failure
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::NotFound => "not_found",
            ErrorKind::InvalidArgument => "invalid_argument",
            ErrorKind::Internal => "internal",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthnError {
    #[error("request was not authenticated")]
    Unauthenticated,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// An underlying error with a description of what was being attempted.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<AuthnError>,
    },
}

impl AuthnError {
    /// Wrap this error with a description of the failed operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        AuthnError::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Classification of this error, looking through any context wrappers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthnError::Unauthenticated => ErrorKind::Unauthenticated,
            AuthnError::NotFound(_) => ErrorKind::NotFound,
            AuthnError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            AuthnError::Database(_) | AuthnError::Internal(_) => ErrorKind::Internal,
            AuthnError::Context { source, .. } => source.kind(),
        }
    }

    /// HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients.
    pub fn client_message(&self) -> String {
        match self {
            AuthnError::Context { source, .. } => source.client_message(),
            AuthnError::Unauthenticated => "request was not authenticated".to_string(),
            AuthnError::NotFound(resource) => format!("{resource} not found"),
            AuthnError::InvalidArgument(reason) => reason.clone(),
            AuthnError::Database(_) | AuthnError::Internal(_) => {
                "An internal error occurred".to_string()
            }
        }
    }
}

impl From<sqlx::Error> for AuthnError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => AuthnError::NotFound("authentication".to_string()),
            other => AuthnError::Database(other.to_string()),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for AuthnError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let kind = self.kind();

        if kind == ErrorKind::Internal {
            // Log actual error server-side, return generic message to client
            tracing::error!(target: "authn.errors", error = %self, "Request failed");
        }

        let error_response = ErrorResponse {
            error: ErrorDetail {
                code: kind.as_str().to_ascii_uppercase(),
                message: self.client_message(),
            },
        };

        let mut response = (status, Json(error_response)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = "Bearer realm=\"authn\"".parse() {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}
