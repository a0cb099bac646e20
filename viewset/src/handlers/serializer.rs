//! Default serializer: reflect entity fields, then merge computed ones

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use super::traits::{BoxError, Mapping, Serializer};
use crate::context::RequestContext;

/// A computed response field
///
/// Receives the entity and the request; an error fails the whole
/// serialization.
pub type FieldFn<E> =
    Arc<dyn Fn(&E, &RequestContext) -> Result<Value, BoxError> + Send + Sync>;

/// Reflects an entity's serde fields into a mapping
///
/// Keys listed with [`exclude`](Self::exclude) are dropped; fields added with
/// [`with_field`](Self::with_field) are computed per request and overwrite
/// reflected keys of the same name.
///
/// # Example
///
/// ```rust
/// use serde::Serialize;
/// use serde_json::json;
/// use viewset::handlers::DefaultSerializer;
///
/// #[derive(Serialize)]
/// struct Person { id: u64, name: String, age: u32 }
///
/// let serializer = DefaultSerializer::<Person>::new()
///     .exclude(["id"])
///     .with_field("adult", |p, _| Ok(json!(p.age >= 18)));
/// ```
pub struct DefaultSerializer<E> {
    excluded: BTreeSet<String>,
    fields: BTreeMap<String, FieldFn<E>>,
}

impl<E> DefaultSerializer<E> {
    /// Reflect every field, no computed fields
    pub fn new() -> Self {
        Self {
            excluded: BTreeSet::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Drop these keys from the reflected mapping
    #[must_use]
    pub fn exclude<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(keys.into_iter().map(Into::into));
        self
    }

    /// Add a computed field
    #[must_use]
    pub fn with_field<F>(mut self, name: impl Into<String>, field: F) -> Self
    where
        F: Fn(&E, &RequestContext) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.fields.insert(name.into(), Arc::new(field));
        self
    }
}

impl<E> Default for DefaultSerializer<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for DefaultSerializer<E> {
    fn clone(&self) -> Self {
        Self {
            excluded: self.excluded.clone(),
            fields: self.fields.clone(),
        }
    }
}

impl<E> fmt::Debug for DefaultSerializer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultSerializer")
            .field("excluded", &self.excluded)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Serialize a value that must come out as a JSON object
pub(crate) fn to_mapping<T: Serialize + ?Sized>(value: &T) -> Result<Mapping, BoxError> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(format!("expected a mapping, got {}", json_type(&other)).into()),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl<E> Serializer<E> for DefaultSerializer<E>
where
    E: Serialize + Send + Sync + 'static,
{
    async fn serialize(&self, entity: &E, ctx: &RequestContext) -> Result<Mapping, BoxError> {
        let mut mapping = to_mapping(entity)?;
        mapping.retain(|key, _| !self.excluded.contains(key));

        for (name, field) in &self.fields {
            mapping.insert(name.clone(), field(entity, ctx)?);
        }
        Ok(mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, Uri};
    use serde_json::json;

    #[derive(Serialize)]
    struct Person {
        id: u64,
        name: String,
        age: u32,
    }

    fn person() -> Person {
        Person {
            id: 1,
            name: "test".to_string(),
            age: 20,
        }
    }

    fn ctx() -> RequestContext {
        RequestContext::new(Method::GET, Uri::from_static("/users/1"))
    }

    #[tokio::test]
    async fn test_reflects_all_fields() {
        let mapping = DefaultSerializer::new().serialize(&person(), &ctx()).await.unwrap();
        assert_eq!(Value::Object(mapping), json!({"id": 1, "name": "test", "age": 20}));
    }

    #[tokio::test]
    async fn test_excluded_fields_are_dropped() {
        let serializer = DefaultSerializer::new().exclude(["id"]);
        let mapping = serializer.serialize(&person(), &ctx()).await.unwrap();
        assert_eq!(Value::Object(mapping), json!({"name": "test", "age": 20}));
    }

    #[tokio::test]
    async fn test_computed_field_sees_request() {
        let serializer = DefaultSerializer::<Person>::new()
            .with_field("path", |_, ctx| Ok(json!(ctx.uri().path())));
        let mapping = serializer.serialize(&person(), &ctx()).await.unwrap();
        assert_eq!(mapping["path"], "/users/1");
        assert_eq!(mapping["name"], "test");
    }

    #[tokio::test]
    async fn test_failing_computed_field_fails_serialization() {
        let serializer = DefaultSerializer::<Person>::new()
            .with_field("broken", |_, _| Err("no value".into()));
        let err = serializer.serialize(&person(), &ctx()).await.unwrap_err();
        assert_eq!(err.to_string(), "no value");
    }

    #[tokio::test]
    async fn test_non_object_entity_is_rejected() {
        let err = DefaultSerializer::<u32>::new()
            .serialize(&7, &ctx())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[tokio::test]
    async fn test_many_serialize_uses_each_entity() {
        let serializer = DefaultSerializer::new().exclude(["id", "age"]);
        let mut second = person();
        second.name = "other".to_string();
        let results = serializer
            .many_serialize(&[person(), second], &ctx())
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[1]["name"], "other");
    }
}
