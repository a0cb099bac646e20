//! In-process [`Repository`] backed by serialized rows
//!
//! Rows are kept as JSON objects in insertion order, so filters compare
//! against each entity's serde representation. An integer key field is
//! assigned on insert when the entity leaves it unset (null or zero).

use std::any::type_name;
use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::{RepositoryError, RepositoryOperation};
use super::pagination::{FilterCondition, FilterOperator, FilterValue, Pagination};
use super::traits::{Repository, RepositoryResult};
use crate::handlers::{to_mapping, Mapping};

struct Rows {
    rows: Vec<Mapping>,
    next_key: i64,
}

/// Rows held in memory, keyed by one field of the entity
///
/// # Example
///
/// ```rust
/// use serde::{Deserialize, Serialize};
/// use viewset::repository::MemoryRepository;
///
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Person { pk: i64, name: String, age: u32 }
///
/// let repo = MemoryRepository::<Person>::new("pk");
/// assert_eq!(repo.key(), "pk");
/// ```
pub struct MemoryRepository<E> {
    key: String,
    state: RwLock<Rows>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> MemoryRepository<E> {
    /// Empty repository identifying rows by `key`
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            state: RwLock::new(Rows {
                rows: Vec::new(),
                next_key: 1,
            }),
            _entity: PhantomData,
        }
    }

    /// Name of the key field
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Number of stored rows
    pub async fn len(&self) -> usize {
        self.state.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl<E> fmt::Debug for MemoryRepository<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRepository")
            .field("entity", &type_name::<E>())
            .field("key", &self.key)
            .finish()
    }
}

impl<E> MemoryRepository<E>
where
    E: Serialize + DeserializeOwned + Send + Sync,
{
    /// Repository pre-filled with `entities`, inserted in order
    pub async fn seeded(
        key: impl Into<String>,
        entities: impl IntoIterator<Item = E>,
    ) -> RepositoryResult<Self> {
        let repo = Self::new(key);
        for entity in entities {
            repo.insert(entity).await?;
        }
        Ok(repo)
    }

    fn entity_name() -> String {
        type_name::<E>().rsplit("::").next().unwrap_or("entity").to_string()
    }

    fn decode(operation: RepositoryOperation, row: &Mapping) -> RepositoryResult<E> {
        serde_json::from_value(Value::Object(row.clone())).map_err(|e| {
            RepositoryError::serialization_error(operation, e.to_string())
                .with_entity(Self::entity_name())
        })
    }

    fn encode(operation: RepositoryOperation, entity: &E) -> RepositoryResult<Mapping> {
        to_mapping(entity).map_err(|e| {
            RepositoryError::serialization_error(operation, e.to_string())
                .with_entity(Self::entity_name())
        })
    }

    fn key_of(&self, operation: RepositoryOperation, entity: &E) -> RepositoryResult<Value> {
        let row = Self::encode(operation, entity)?;
        row.get(&self.key).cloned().ok_or_else(|| {
            RepositoryError::validation_failed(
                operation,
                format!("entity has no `{}` field", self.key),
            )
        })
    }

    fn position(rows: &[Mapping], key_field: &str, key: &Value) -> Option<usize> {
        rows.iter().position(|row| row.get(key_field) == Some(key))
    }
}

fn key_is_unset(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Number(n)) => n.as_i64() == Some(0),
        Some(_) => false,
    }
}

fn compare(field: &Value, target: &FilterValue) -> Option<Ordering> {
    match (field, target) {
        (Value::Number(n), FilterValue::Integer(t)) => match n.as_i64() {
            Some(v) => Some(v.cmp(t)),
            None => n.as_f64().and_then(|v| v.partial_cmp(&(*t as f64))),
        },
        (Value::Number(n), FilterValue::Float(t)) => n.as_f64().and_then(|v| v.partial_cmp(t)),
        (Value::String(s), FilterValue::String(t)) => Some(s.as_str().cmp(t.as_str())),
        // path parameters that look numeric still address string keys
        (Value::String(s), FilterValue::Integer(t)) => (*s == t.to_string()).then_some(Ordering::Equal),
        (Value::Bool(b), FilterValue::Boolean(t)) => Some(b.cmp(t)),
        _ => None,
    }
}

fn contains(field: &Value, target: &FilterValue) -> bool {
    match target {
        FilterValue::StringList(list) => field
            .as_str()
            .is_some_and(|s| list.iter().any(|item| item == s)),
        FilterValue::IntegerList(list) => field.as_i64().is_some_and(|n| list.contains(&n)),
        other => compare(field, other) == Some(Ordering::Equal),
    }
}

fn matches(row: &Mapping, condition: &FilterCondition) -> bool {
    let field = row.get(&condition.field).unwrap_or(&Value::Null);
    let ordering = || compare(field, &condition.value);
    match condition.operator {
        FilterOperator::IsNull => field.is_null(),
        FilterOperator::IsNotNull => !field.is_null(),
        FilterOperator::Equal => ordering() == Some(Ordering::Equal),
        FilterOperator::NotEqual => !field.is_null() && ordering() != Some(Ordering::Equal),
        FilterOperator::GreaterThan => ordering() == Some(Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => {
            matches!(ordering(), Some(Ordering::Greater | Ordering::Equal))
        }
        FilterOperator::LessThan => ordering() == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => {
            matches!(ordering(), Some(Ordering::Less | Ordering::Equal))
        }
        FilterOperator::In => contains(field, &condition.value),
    }
}

fn matches_all(row: &Mapping, filters: &[FilterCondition]) -> bool {
    filters.iter().all(|condition| matches(row, condition))
}

impl<E> Repository<E> for MemoryRepository<E>
where
    E: Serialize + DeserializeOwned + Send + Sync,
{
    async fn find_one(&self, filters: &[FilterCondition]) -> RepositoryResult<Option<E>> {
        let state = self.state.read().await;
        state
            .rows
            .iter()
            .find(|row| matches_all(row, filters))
            .map(|row| Self::decode(RepositoryOperation::FindOne, row))
            .transpose()
    }

    async fn find_all(
        &self,
        filters: &[FilterCondition],
        pagination: Option<Pagination>,
    ) -> RepositoryResult<Vec<E>> {
        let state = self.state.read().await;
        let (offset, limit) = match pagination {
            Some(window) => (
                usize::try_from(window.offset).unwrap_or(usize::MAX),
                usize::try_from(window.limit).unwrap_or(usize::MAX),
            ),
            None => (0, usize::MAX),
        };

        state
            .rows
            .iter()
            .filter(|row| matches_all(row, filters))
            .skip(offset)
            .take(limit)
            .map(|row| Self::decode(RepositoryOperation::FindAll, row))
            .collect()
    }

    async fn count(&self, filters: &[FilterCondition]) -> RepositoryResult<u64> {
        let state = self.state.read().await;
        Ok(state.rows.iter().filter(|row| matches_all(row, filters)).count() as u64)
    }

    async fn insert(&self, entity: E) -> RepositoryResult<E> {
        let mut row = Self::encode(RepositoryOperation::Insert, &entity)?;
        let mut state = self.state.write().await;

        if key_is_unset(row.get(&self.key)) {
            let key = state.next_key;
            row.insert(self.key.clone(), Value::from(key));
        } else if let Some(key) = row.get(&self.key) {
            if Self::position(&state.rows, &self.key, key).is_some() {
                return Err(RepositoryError::already_exists(Self::entity_name(), key));
            }
        }
        if let Some(key) = row.get(&self.key).and_then(Value::as_i64) {
            state.next_key = state.next_key.max(key.saturating_add(1));
        }

        let stored = Self::decode(RepositoryOperation::Insert, &row)?;
        state.rows.push(row);
        Ok(stored)
    }

    async fn update(&self, entity: &E, changes: Mapping) -> RepositoryResult<E> {
        let key = self.key_of(RepositoryOperation::Update, entity)?;
        let mut state = self.state.write().await;
        let index = Self::position(&state.rows, &self.key, &key).ok_or_else(|| {
            RepositoryError::not_found(Self::entity_name())
                .with_operation(RepositoryOperation::Update)
        })?;

        let mut row = state.rows[index].clone();
        for (field, value) in changes {
            if field != self.key {
                row.insert(field, value);
            }
        }

        // decode before committing so a bad change leaves the row untouched
        let updated = Self::decode(RepositoryOperation::Update, &row)?;
        state.rows[index] = row;
        Ok(updated)
    }

    async fn delete(&self, entity: &E) -> RepositoryResult<bool> {
        let key = self.key_of(RepositoryOperation::Delete, entity)?;
        let mut state = self.state.write().await;
        match Self::position(&state.rows, &self.key, &key) {
            Some(index) => {
                state.rows.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Person {
        #[serde(default)]
        pk: i64,
        name: String,
        age: u32,
    }

    fn person(name: &str, age: u32) -> Person {
        Person {
            pk: 0,
            name: name.to_string(),
            age,
        }
    }

    async fn repo_with(people: &[(&str, u32)]) -> MemoryRepository<Person> {
        MemoryRepository::seeded("pk", people.iter().map(|(name, age)| person(name, *age)))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_sequential_keys() {
        let repo = repo_with(&[("a", 1), ("b", 2)]).await;
        let third = repo.insert(person("c", 3)).await.unwrap();
        assert_eq!(third.pk, 3);
        assert_eq!(repo.len().await, 3);
    }

    #[tokio::test]
    async fn test_insert_keeps_explicit_key_and_rejects_duplicates() {
        let repo = MemoryRepository::new("pk");
        let explicit = Person {
            pk: 10,
            ..person("x", 1)
        };
        assert_eq!(repo.insert(explicit.clone()).await.unwrap().pk, 10);
        assert_eq!(repo.insert(person("y", 2)).await.unwrap().pk, 11);

        let err = repo.insert(explicit).await.unwrap_err();
        assert_eq!(err.kind, RepositoryErrorKind::AlreadyExists);
        assert_eq!(repo.len().await, 2);
    }

    #[tokio::test]
    async fn test_find_one_by_param_value() {
        let repo = repo_with(&[("a", 1), ("b", 2)]).await;
        let found = repo
            .find_one(&[FilterCondition::eq("pk", FilterValue::from_param("2"))])
            .await
            .unwrap();
        assert_eq!(found.map(|p| p.name), Some("b".to_string()));

        let missing = repo.find_one(&[FilterCondition::eq("pk", 9)]).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_filters_are_conjunctive() {
        let repo = repo_with(&[("a", 10), ("b", 20), ("c", 30), ("d", 40)]).await;
        let filters = [FilterCondition::gte("age", 20), FilterCondition::lt("age", 40)];
        let names: Vec<_> = repo
            .find_all(&filters, None)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["b", "c"]);
        assert_eq!(repo.count(&filters).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_in_and_null_operators() {
        let repo = repo_with(&[("a", 10), ("b", 20), ("c", 30)]).await;
        let picked = repo
            .find_all(&[FilterCondition::in_strings("name", vec!["a".into(), "c".into()])], None)
            .await
            .unwrap();
        assert_eq!(picked.len(), 2);

        assert_eq!(repo.count(&[FilterCondition::is_null("email")]).await.unwrap(), 3);
        assert_eq!(repo.count(&[FilterCondition::ne("name", "a")]).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_find_all_window() {
        let repo = repo_with(&[("a", 1), ("b", 2), ("c", 3)]).await;
        let page = repo
            .find_all(&[], Some(Pagination::new(1, 5)))
            .await
            .unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].name, "b");

        let past_end = repo.find_all(&[], Some(Pagination::new(7, 5))).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn test_update_applies_only_given_fields() {
        let repo = repo_with(&[("a", 1)]).await;
        let current = repo.find_one(&[]).await.unwrap().unwrap();

        let mut changes = Mapping::new();
        changes.insert("age".to_string(), json!(99));
        changes.insert("pk".to_string(), json!(500));
        let updated = repo.update(&current, changes).await.unwrap();

        assert_eq!(updated, Person { pk: 1, name: "a".to_string(), age: 99 });
        assert_eq!(repo.find_one(&[]).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_update_with_bad_value_leaves_row_untouched() {
        let repo = repo_with(&[("a", 1)]).await;
        let current = repo.find_one(&[]).await.unwrap().unwrap();

        let mut changes = Mapping::new();
        changes.insert("age".to_string(), json!("old"));
        let err = repo.update(&current, changes).await.unwrap_err();

        assert_eq!(err.kind, RepositoryErrorKind::SerializationError);
        assert_eq!(repo.find_one(&[]).await.unwrap(), Some(current));
    }

    #[tokio::test]
    async fn test_update_missing_row_is_not_found() {
        let repo = MemoryRepository::<Person>::new("pk");
        let ghost = Person { pk: 4, ..person("ghost", 1) };
        let err = repo.update(&ghost, Mapping::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_reports_whether_a_row_went() {
        let repo = repo_with(&[("a", 1), ("b", 2)]).await;
        let first = repo.find_one(&[]).await.unwrap().unwrap();
        assert!(repo.delete(&first).await.unwrap());
        assert!(!repo.delete(&first).await.unwrap());
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn test_string_keys_match_numeric_params() {
        #[derive(Debug, Serialize, Deserialize)]
        struct Tag {
            slug: String,
        }

        let repo = MemoryRepository::seeded("slug", [Tag { slug: "42".to_string() }])
            .await
            .unwrap();
        let found = repo
            .find_one(&[FilterCondition::eq("slug", FilterValue::from_param("42"))])
            .await
            .unwrap();
        assert!(found.is_some());
    }
}
