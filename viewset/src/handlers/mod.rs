//! Collaborators of the view set dispatcher
//!
//! Each stage of the request pipeline is delegated to a trait object:
//! storage to a [`PersistenceManager`], payload binding to a
//! [`FormValidator`], response shaping to a [`Serializer`], authorization to
//! a [`PermissionChecker`] and failure rendering to an [`ExceptionHandler`].
//! Every trait has a default implementation in this module except the
//! persistence manager, which must always be supplied (see
//! [`RepositoryManager`](crate::manager::RepositoryManager) for the stock one).
//!
//! # Error Handling
//!
//! Collaborators fail with an opaque [`BoxError`]. The dispatcher wraps it in a
//! [`ViewSetError`] whose [`ViewSetErrorKind`] records the stage that failed:
//!
//! - permission check → 403
//! - entity lookup → 404
//! - validation or save → 400
//! - listing or serialization → 500
//!
//! # Example
//!
//! ```rust
//! use serde::Serialize;
//! use viewset::handlers::{AllowAny, DefaultSerializer, DefaultValidator};
//!
//! #[derive(Serialize)]
//! struct Person { id: u64, name: String }
//!
//! let serializer = DefaultSerializer::<Person>::new().exclude(["id"]);
//! let validator = DefaultValidator::<serde_json::Value>::new();
//! let permission = AllowAny;
//! ```

mod error;
mod permission;
mod response;
mod serializer;
mod traits;
mod validator;

pub use error::{DefaultExceptionHandler, ErrorBody, ExceptionHandler, ViewSetError, ViewSetErrorKind};
pub use permission::AllowAny;
pub use response::{ItemResponse, ListResponse, NoContent};
pub use serializer::{DefaultSerializer, FieldFn};
pub use traits::{
    BoxError, EntityRef, FormValidator, Mapping, PaginatedResult, PermissionChecker,
    PersistenceManager, Serializer,
};
pub use validator::DefaultValidator;

pub(crate) use serializer::to_mapping;
