//! Default persistence adapter
//!
//! [`RepositoryManager`] implements
//! [`PersistenceManager`](crate::handlers::PersistenceManager) on top of any
//! [`Repository`](crate::repository::Repository):
//!
//! - list requests are windowed by [`PaginationWindow`] (`limit`, `offset`,
//!   `withCount`) with `next`/`previous` links built by [`paginate`]
//! - detail requests look the entity up by the route's path parameters
//! - saves insert for an absent entity and apply a partial update for a
//!   present one
//!
//! Scope functions narrow every query to what the current request may see,
//! and [`RepositoryManager::with_paginator`] swaps the listing strategy.

mod paginator;
mod repository_manager;

pub use paginator::{paginate, with_offset, PaginationWindow};
pub use repository_manager::{PaginateFn, RepositoryManager, ScopeFn};
