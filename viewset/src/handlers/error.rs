//! Request-time errors and their rendering
//!
//! Every failing pipeline stage is wrapped as a [`ViewSetError`] carrying the
//! status code for that stage and the collaborator's original error as its
//! source. The wrapped error is handed to an [`ExceptionHandler`], which
//! writes the terminal response.
//!
//! # Example
//!
//! ```rust
//! use viewset::handlers::{ViewSetError, ViewSetErrorKind};
//!
//! let error = ViewSetError::new(ViewSetErrorKind::NotFound, "Object not found");
//! assert_eq!(error.status_code().as_u16(), 404);
//! assert_eq!(error.to_string(), "Object not found");
//! ```

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::traits::BoxError;
use crate::context::RequestContext;

/// Pipeline stage that failed, and so the status to answer with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewSetErrorKind {
    /// The permission checker denied the action
    PermissionDenied,
    /// The addressed entity could not be loaded
    NotFound,
    /// The payload failed validation or the store rejected a save
    ValidationFailed,
    /// Listing or serialization failed
    InternalFailure,
    /// Any other status, for custom actions
    Status(StatusCode),
}

impl fmt::Display for ViewSetErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied => write!(f, "permission_denied"),
            Self::NotFound => write!(f, "not_found"),
            Self::ValidationFailed => write!(f, "validation_failed"),
            Self::InternalFailure => write!(f, "internal_failure"),
            Self::Status(status) => write!(f, "status_{}", status.as_u16()),
        }
    }
}

impl ViewSetErrorKind {
    /// Get the HTTP status code for this error kind
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::ValidationFailed => StatusCode::BAD_REQUEST,
            Self::InternalFailure => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Status(status) => *status,
        }
    }
}

/// A collaborator failure wrapped with the status of the stage it broke
///
/// The message is the collaborator error's own text; the collaborator error
/// stays reachable through [`std::error::Error::source`].
#[derive(Debug)]
pub struct ViewSetError {
    /// The failing stage
    pub kind: ViewSetErrorKind,
    message: String,
    source: Option<BoxError>,
}

impl ViewSetError {
    /// Create an error with a message and no underlying cause
    pub fn new(kind: ViewSetErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Wrap a collaborator error, reusing its text as the message
    pub fn wrap(kind: ViewSetErrorKind, cause: BoxError) -> Self {
        Self {
            kind,
            message: cause.to_string(),
            source: Some(cause),
        }
    }

    /// Wrap a collaborator error under an explicit status code
    pub fn with_status(status: StatusCode, cause: BoxError) -> Self {
        Self::wrap(ViewSetErrorKind::Status(status), cause)
    }

    /// Wrap a collaborator failure unless it already carries a status
    ///
    /// A [`ViewSetError`] passes through untouched; anything else is wrapped
    /// with `kind`. The standard actions only allow this on the list stage;
    /// the permission check and every other stage always wrap.
    pub fn at_stage(kind: ViewSetErrorKind, cause: BoxError) -> BoxError {
        if cause.is::<Self>() {
            cause
        } else {
            Box::new(Self::wrap(kind, cause))
        }
    }

    /// The status code this error renders with
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// The message rendered to the client
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ViewSetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ViewSetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_deref()
            .map(|err| err as &(dyn std::error::Error + 'static))
    }
}

/// Body written for every failed request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable error message
    pub message: String,
}

impl ErrorBody {
    /// Render `status` with `{"message": ...}`
    pub fn response(status: StatusCode, message: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                message: message.into(),
            }),
        )
            .into_response()
    }
}

/// Writes the terminal response for a failed request
///
/// Implementations must recognize [`ViewSetError`] (via downcasting) to honour
/// its status code; anything else should default to 400.
pub trait ExceptionHandler: Send + Sync {
    /// Render `error` into a response
    fn handle(&self, error: BoxError, ctx: &RequestContext) -> Response;
}

/// Renders [`ViewSetError`]s with their status and anything else as 400
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultExceptionHandler;

impl ExceptionHandler for DefaultExceptionHandler {
    fn handle(&self, error: BoxError, ctx: &RequestContext) -> Response {
        let (status, kind) = match error.downcast_ref::<ViewSetError>() {
            Some(wrapped) => (wrapped.status_code(), Some(wrapped.kind)),
            None => (StatusCode::BAD_REQUEST, None),
        };
        let cause = error
            .source()
            .map(ToString::to_string)
            .unwrap_or_default();

        if status.is_server_error() {
            tracing::error!(
                method = %ctx.method(),
                path = %ctx.uri().path(),
                status = status.as_u16(),
                kind = ?kind,
                cause = %cause,
                "Request failed: {}", error
            );
        } else {
            tracing::warn!(
                method = %ctx.method(),
                path = %ctx.uri().path(),
                status = status.as_u16(),
                kind = ?kind,
                "Request failed: {}", error
            );
        }

        ErrorBody::response(status, error.to_string())
    }
}
