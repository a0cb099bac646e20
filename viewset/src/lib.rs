//! # viewset
//!
//! Declarative REST resources for axum. A [`ViewSet`] exposes one entity type
//! as the five standard CRUD actions plus any custom routes, and delegates
//! every concern to an injected collaborator.
//!
//! ## Features
//!
//! - **Route table**: list, retrieve, create, update (PUT and PATCH) and
//!   delete, each individually excludable, plus custom routes
//! - **Pluggable collaborators**: persistence, validation, serialization,
//!   permission and error rendering behind async traits
//! - **Fixed status mapping**: each action stage maps its failure to one
//!   status code (403, 404, 400, 500)
//! - **Limit-offset pagination**: `next`/`previous` links and an optional
//!   total count
//! - **In-memory store**: a [`MemoryRepository`](repository::MemoryRepository)
//!   for demos and tests
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use viewset::prelude::*;
//!
//! #[derive(Clone, Serialize, Deserialize)]
//! struct Person {
//!     #[serde(default)]
//!     pk: i64,
//!     name: String,
//!     age: u32,
//! }
//!
//! #[derive(Serialize, Deserialize)]
//! struct PersonRequest {
//!     name: String,
//!     age: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::load()?;
//!     init_tracing(&config);
//!
//!     let people = Arc::new(MemoryRepository::<Person>::new("pk"));
//!     let app: Router = ViewSet::<Person, PersonRequest>::builder("/users", "/{pk}")
//!         .manager(
//!             RepositoryManager::new(people)
//!                 .with_config(&config.viewset)
//!                 .lookup("pk", "pk"),
//!         )
//!         .serializer(DefaultSerializer::new().exclude(["pk"]))
//!         .config(&config.viewset)
//!         .build()?
//!         .into_router();
//!
//!     let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.service.port)).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod config;
pub mod context;
pub mod error;
pub mod handlers;
pub mod manager;
pub mod observability;
pub mod repository;
pub mod routes;
pub mod viewset;

pub use crate::config::Config;
pub use crate::context::RequestContext;
pub use crate::error::{Error, Result};
pub use crate::viewset::{ViewSet, ViewSetBuilder};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::actions;
    pub use crate::config::{Config, ServiceConfig, ViewSetConfig};
    pub use crate::context::RequestContext;
    pub use crate::error::{Error, Result};
    pub use crate::observability::init_tracing;
    pub use crate::routes::Route;
    pub use crate::viewset::{ViewSet, ViewSetBuilder};

    pub use crate::handlers::{
        AllowAny, BoxError, DefaultExceptionHandler, DefaultSerializer, DefaultValidator,
        EntityRef, ErrorBody, ExceptionHandler, FormValidator, ItemResponse, ListResponse,
        Mapping, NoContent, PaginatedResult, PermissionChecker, PersistenceManager, Serializer,
        ViewSetError, ViewSetErrorKind,
    };
    pub use crate::manager::{PaginationWindow, RepositoryManager};
    pub use crate::repository::{
        FilterCondition, FilterOperator, FilterValue, MemoryRepository, Pagination, Repository,
        RepositoryError, RepositoryErrorKind,
    };

    pub use async_trait::async_trait;
    pub use axum::{
        http::{Method, StatusCode},
        response::{IntoResponse, Response},
        Json, Router,
    };
    pub use serde::{Deserialize, Serialize};
}
