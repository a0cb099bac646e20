//! Collaborator contracts consumed by the dispatcher
//!
//! A [`ViewSet`](crate::ViewSet) never touches storage, payloads or response
//! shaping itself. It calls into five collaborators, each injected at
//! construction as a shared trait object:
//!
//! - [`PersistenceManager`]: every read and write against the store
//! - [`FormValidator`]: turns the request payload into validated input
//! - [`Serializer`]: turns entities into generic JSON mappings
//! - [`PermissionChecker`]: allows or denies an action
//! - [`ExceptionHandler`](super::ExceptionHandler): renders failures
//!
//! Collaborator errors are opaque [`BoxError`]s. The dispatcher never looks
//! inside them; it only maps the failing stage to a status code.
//!
//! # Example
//!
//! ```rust,ignore
//! use viewset::prelude::*;
//!
//! struct StaffOnly;
//!
//! #[async_trait]
//! impl PermissionChecker for StaffOnly {
//!     async fn check(&self, action: &str, ctx: &RequestContext) -> Result<(), BoxError> {
//!         match ctx.headers().get("x-staff") {
//!             Some(_) => Ok(()),
//!             None if action == actions::LIST => Ok(()),
//!             None => Err("staff only".into()),
//!         }
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::context::RequestContext;

/// Opaque error returned by collaborators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Generic key-value mapping produced by serializers
pub type Mapping = Map<String, Value>;

/// Reference to the entity a save operates on
///
/// The variant is the only signal separating create from update:
/// [`PersistenceManager::save`] inserts a new row for [`EntityRef::Absent`]
/// and updates in place for [`EntityRef::Present`].
#[derive(Debug, Clone, PartialEq)]
pub enum EntityRef<E> {
    /// No entity yet; saving inserts one
    Absent,
    /// An existing entity; saving updates it
    Present(E),
}

impl<E> EntityRef<E> {
    /// Whether this reference holds an entity
    pub fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }

    /// Borrow the entity, if present
    pub fn as_ref(&self) -> EntityRef<&E> {
        match self {
            Self::Absent => EntityRef::Absent,
            Self::Present(entity) => EntityRef::Present(entity),
        }
    }

    /// The entity, if present
    pub fn into_option(self) -> Option<E> {
        match self {
            Self::Absent => None,
            Self::Present(entity) => Some(entity),
        }
    }
}

impl<E> From<Option<E>> for EntityRef<E> {
    fn from(entity: Option<E>) -> Self {
        match entity {
            Some(entity) => Self::Present(entity),
            None => Self::Absent,
        }
    }
}

/// One page of entities plus pagination metadata
///
/// `meta` carries at least `next` and `previous`, and `count` when the
/// request asked for it.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<E> {
    /// Entities on this page, in store order
    pub entities: Vec<E>,
    /// Pagination metadata rendered under `"meta"`
    pub meta: Mapping,
}

impl<E> PaginatedResult<E> {
    /// Create a page from entities and metadata
    pub fn new(entities: Vec<E>, meta: Mapping) -> Self {
        Self { entities, meta }
    }
}

/// All storage reads and writes for one resource
///
/// # Type Parameters
///
/// - `E`: the entity type
/// - `V`: the validated input produced by the [`FormValidator`]
#[async_trait]
pub trait PersistenceManager<E, V>: Send + Sync
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    /// Look up the entity addressed by the request's path parameters
    ///
    /// Any failure, including "no row matched", is reported as an error and
    /// becomes a 404.
    async fn get_object(&self, ctx: &mut RequestContext) -> Result<E, BoxError>;

    /// Fetch one page of entities and its metadata
    async fn get_objects(&self, ctx: &mut RequestContext) -> Result<PaginatedResult<E>, BoxError>;

    /// Insert (`Absent`) or update in place (`Present`) and return the stored entity
    async fn save(
        &self,
        entity: EntityRef<E>,
        input: V,
        ctx: &mut RequestContext,
    ) -> Result<E, BoxError>;

    /// Remove the row matching the entity's identity
    async fn delete(&self, entity: E, ctx: &mut RequestContext) -> Result<(), BoxError>;
}

/// Shapes entities into response mappings
#[async_trait]
pub trait Serializer<E>: Send + Sync
where
    E: Send + Sync + 'static,
{
    /// Serialize one entity
    async fn serialize(&self, entity: &E, ctx: &RequestContext) -> Result<Mapping, BoxError>;

    /// Serialize a page of entities, preserving order
    ///
    /// The first failing entity aborts the whole page.
    async fn many_serialize(
        &self,
        entities: &[E],
        ctx: &RequestContext,
    ) -> Result<Vec<Mapping>, BoxError> {
        let mut results = Vec::with_capacity(entities.len());
        for entity in entities {
            results.push(self.serialize(entity, ctx).await?);
        }
        Ok(results)
    }
}

/// Decodes and validates the request payload
///
/// The entity being updated is passed as context (`Present`); on create it
/// is `Absent`.
#[async_trait]
pub trait FormValidator<E, V>: Send + Sync
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    /// Produce validated input from the request
    async fn validate(&self, entity: EntityRef<&E>, ctx: &RequestContext) -> Result<V, BoxError>;
}

/// Allows or denies an action before any persistence access
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    /// Return an error to deny `action`
    async fn check(&self, action: &str, ctx: &RequestContext) -> Result<(), BoxError>;
}
