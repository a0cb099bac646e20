//! Repository trait definition
//!
//! [`Repository`] is the storage seam under
//! [`RepositoryManager`](crate::manager::RepositoryManager). It uses RPITIT
//! (Return Position Impl Trait In Traits), so implementations are plain
//! `async fn`s and the manager stays generic over the concrete store.
//!
//! # Example
//!
//! ```rust,ignore
//! use viewset::repository::{FilterCondition, Pagination, Repository, RepositoryResult};
//!
//! struct PersonRepository {
//!     pool: PgPool,
//! }
//!
//! impl Repository<Person> for PersonRepository {
//!     async fn find_one(&self, filters: &[FilterCondition]) -> RepositoryResult<Option<Person>> {
//!         let (clause, args) = where_clause(filters);
//!         // SELECT * FROM people WHERE {clause} LIMIT 1
//!     }
//!     // ... other methods
//! }
//! ```

use std::future::Future;

use super::error::RepositoryError;
use super::pagination::{FilterCondition, Pagination};
use crate::handlers::Mapping;

/// Result type for repository operations
pub type RepositoryResult<T> = std::result::Result<T, RepositoryError>;

/// Filtered CRUD access to one kind of entity
///
/// Every read takes the full condition list (scope conditions plus lookup
/// keys); conditions are AND-ed. Rows come back in the store's natural order.
pub trait Repository<E>: Send + Sync {
    /// First row matching every condition, or `None`
    fn find_one(
        &self,
        filters: &[FilterCondition],
    ) -> impl Future<Output = RepositoryResult<Option<E>>> + Send;

    /// Rows matching every condition, windowed by `pagination` when given
    fn find_all(
        &self,
        filters: &[FilterCondition],
        pagination: Option<Pagination>,
    ) -> impl Future<Output = RepositoryResult<Vec<E>>> + Send;

    /// Number of rows matching every condition
    fn count(
        &self,
        filters: &[FilterCondition],
    ) -> impl Future<Output = RepositoryResult<u64>> + Send;

    /// Store a new row and return it as stored (with any generated key)
    fn insert(&self, entity: E) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Apply `changes` to the row identified by `entity` and return the result
    ///
    /// Only the keys present in `changes` are written.
    fn update(
        &self,
        entity: &E,
        changes: Mapping,
    ) -> impl Future<Output = RepositoryResult<E>> + Send;

    /// Remove the row identified by `entity`; `false` if it was already gone
    fn delete(&self, entity: &E) -> impl Future<Output = RepositoryResult<bool>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RepositoryErrorKind, RepositoryOperation};
    use std::sync::Mutex;

    #[test]
    fn test_repository_result_type() {
        let ok_result: RepositoryResult<i32> = Ok(42);
        assert!(ok_result.is_ok());

        let err_result: RepositoryResult<i32> = Err(RepositoryError::not_found("Test"));
        assert!(err_result.is_err());
    }

    // A store of plain integers keyed by value
    struct Numbers(Mutex<Vec<i64>>);

    impl Repository<i64> for Numbers {
        async fn find_one(&self, _filters: &[FilterCondition]) -> RepositoryResult<Option<i64>> {
            Ok(self.0.lock().unwrap().first().copied())
        }

        async fn find_all(
            &self,
            _filters: &[FilterCondition],
            pagination: Option<Pagination>,
        ) -> RepositoryResult<Vec<i64>> {
            let rows = self.0.lock().unwrap();
            let window = pagination.unwrap_or(Pagination::new(0, u64::MAX));
            Ok(rows
                .iter()
                .skip(window.offset as usize)
                .take(window.limit as usize)
                .copied()
                .collect())
        }

        async fn count(&self, _filters: &[FilterCondition]) -> RepositoryResult<u64> {
            Ok(self.0.lock().unwrap().len() as u64)
        }

        async fn insert(&self, entity: i64) -> RepositoryResult<i64> {
            self.0.lock().unwrap().push(entity);
            Ok(entity)
        }

        async fn update(&self, _entity: &i64, _changes: Mapping) -> RepositoryResult<i64> {
            Err(RepositoryError::new(
                RepositoryOperation::Update,
                RepositoryErrorKind::ValidationFailed,
                "numbers are immutable",
            ))
        }

        async fn delete(&self, entity: &i64) -> RepositoryResult<bool> {
            let mut rows = self.0.lock().unwrap();
            let before = rows.len();
            rows.retain(|row| row != entity);
            Ok(rows.len() != before)
        }
    }

    #[tokio::test]
    async fn test_trait_is_implementable_with_async_fn() {
        let repo = Numbers(Mutex::new(vec![1, 2, 3]));
        assert_eq!(repo.count(&[]).await.unwrap(), 3);
        assert_eq!(
            repo.find_all(&[], Some(Pagination::new(1, 5))).await.unwrap(),
            vec![2, 3]
        );
        assert!(repo.delete(&2).await.unwrap());
        assert!(!repo.delete(&2).await.unwrap());
        assert!(repo.update(&1, Mapping::new()).await.is_err());
    }
}
