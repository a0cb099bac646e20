//! Construction and configuration errors
//!
//! Request-time failures never surface here: they are wrapped as
//! [`ViewSetError`](crate::handlers::ViewSetError) and rendered by the
//! configured [`ExceptionHandler`](crate::handlers::ExceptionHandler).
//! The variants below describe a view set or configuration that cannot be
//! used at all, so they are raised once, before anything is served.

use axum::http::Method;
use thiserror::Error;

/// Result type alias for view set construction and configuration
pub type Result<T> = std::result::Result<T, Error>;

/// Fatal view set and configuration errors
#[derive(Debug, Error)]
pub enum Error {
    /// A view set was built without a persistence manager
    #[error("persistence manager is required")]
    MissingManager,

    /// Two routes bind the same method to the same path
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute {
        /// HTTP method of the clashing binding
        method: Method,
        /// Full path of the clashing binding
        path: String,
    },

    /// The router cannot dispatch this HTTP method
    #[error("unsupported method: {0}")]
    UnsupportedMethod(Method),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}
