//! Storage abstraction under the default persistence manager
//!
//! [`RepositoryManager`](crate::manager::RepositoryManager) speaks to storage
//! only through the [`Repository`] trait: filtered single-row lookup, windowed
//! listing, counting, insert, partial update and delete. Filters are plain
//! [`FilterCondition`] values, so scope functions and lookup keys compose
//! without knowing the backing store.
//!
//! [`MemoryRepository`] is the bundled implementation, keeping rows in
//! process. A database-backed store implements the same trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use viewset::repository::{FilterCondition, MemoryRepository, Pagination, Repository};
//!
//! let repo = MemoryRepository::<Person>::new("pk");
//! repo.insert(Person { pk: 0, name: "test".into(), age: 20 }).await?;
//!
//! let adults = repo
//!     .find_all(&[FilterCondition::gte("age", 18)], Some(Pagination::new(0, 21)))
//!     .await?;
//! ```

mod error;
mod memory;
mod pagination;
mod traits;

pub use error::{RepositoryError, RepositoryErrorKind, RepositoryOperation};
pub use memory::MemoryRepository;
pub use pagination::{FilterCondition, FilterOperator, FilterValue, Pagination};
pub use traits::{Repository, RepositoryResult};
