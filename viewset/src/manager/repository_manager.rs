//! [`PersistenceManager`] over any [`Repository`]

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Uri;
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};

use super::paginator::{paginate, PaginationWindow};
use crate::config::ViewSetConfig;
use crate::context::RequestContext;
use crate::handlers::{
    to_mapping, BoxError, EntityRef, Mapping, PaginatedResult, PersistenceManager, ViewSetError,
    ViewSetErrorKind,
};
use crate::repository::{
    FilterCondition, FilterValue, Repository, RepositoryError, RepositoryOperation,
    RepositoryResult,
};

/// Derives filter conditions from a request
///
/// Every scope function registered on a manager runs once per request, and
/// its conditions narrow list, retrieve, update and delete lookups.
pub type ScopeFn = Arc<dyn Fn(&RequestContext) -> Vec<FilterCondition> + Send + Sync>;

/// Replaces [`paginate`] as the listing strategy
///
/// Receives the repository, the request scope, the bound window and the URI
/// the client sent, and returns the page with its metadata.
pub type PaginateFn<E, R> = Arc<
    dyn for<'a> Fn(
            &'a R,
            &'a [FilterCondition],
            PaginationWindow,
            &'a Uri,
        ) -> BoxFuture<'a, RepositoryResult<PaginatedResult<E>>>
        + Send
        + Sync,
>;

static NEXT_MANAGER_ID: AtomicU64 = AtomicU64::new(1);

/// Composed scope conditions, cached per manager for one request
#[derive(Debug, Clone, Default)]
struct ScopeCache(HashMap<u64, Arc<[FilterCondition]>>);

/// The default persistence manager
///
/// Lookups turn the request's path parameters into equality filters on top
/// of the request scope. Saving branches on the entity reference: an absent
/// entity is built from the whole validated input and inserted; a present
/// one receives only the non-null fields of the input.
///
/// Inserts rebuild `E` from `V`'s serde representation, so fields of `E` that
/// `V` does not carry (typically the key) need `#[serde(default)]`.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use viewset::manager::RepositoryManager;
/// use viewset::repository::{FilterCondition, MemoryRepository};
///
/// let people = Arc::new(MemoryRepository::<Person>::new("id"));
/// let manager = RepositoryManager::<Person, PersonRequest, _>::new(people)
///     .lookup("pk", "id")
///     .with_scope(|ctx| match ctx.headers().get("x-tenant") {
///         Some(tenant) => vec![FilterCondition::eq("tenant", tenant.to_str().unwrap_or_default())],
///         None => Vec::new(),
///     });
/// ```
pub struct RepositoryManager<E, V, R> {
    repository: Arc<R>,
    scopes: Vec<ScopeFn>,
    lookups: HashMap<String, String>,
    paginator: Option<PaginateFn<E, R>>,
    config: ViewSetConfig,
    id: u64,
    _types: PhantomData<fn() -> (E, V)>,
}

impl<E, V, R> RepositoryManager<E, V, R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            scopes: Vec::new(),
            lookups: HashMap::new(),
            paginator: None,
            config: ViewSetConfig::default(),
            id: NEXT_MANAGER_ID.fetch_add(1, Ordering::Relaxed),
            _types: PhantomData,
        }
    }

    /// Pagination defaults and limits
    #[must_use]
    pub fn with_config(mut self, config: &ViewSetConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Add a scope function
    #[must_use]
    pub fn with_scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(&RequestContext) -> Vec<FilterCondition> + Send + Sync + 'static,
    {
        self.scopes.push(Arc::new(scope));
        self
    }

    /// List with `paginator` instead of [`paginate`]
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// // no links, just the rows and the total
    /// let manager = manager.with_paginator(|repo, filters, window, _uri| {
    ///     Box::pin(async move {
    ///         let page = Pagination::new(window.offset, window.limit);
    ///         let entities = repo.find_all(filters, Some(page)).await?;
    ///         let mut meta = Mapping::new();
    ///         meta.insert("count".into(), repo.count(filters).await?.into());
    ///         Ok::<_, RepositoryError>(PaginatedResult::new(entities, meta))
    ///     })
    /// });
    /// ```
    #[must_use]
    pub fn with_paginator<F>(mut self, paginator: F) -> Self
    where
        F: for<'a> Fn(
                &'a R,
                &'a [FilterCondition],
                PaginationWindow,
                &'a Uri,
            ) -> BoxFuture<'a, RepositoryResult<PaginatedResult<E>>>
            + Send
            + Sync
            + 'static,
    {
        self.paginator = Some(Arc::new(paginator));
        self
    }

    /// Filter on `field` with the value of path parameter `param`
    ///
    /// Parameters without a mapping filter the field of the same name.
    #[must_use]
    pub fn lookup(mut self, param: impl Into<String>, field: impl Into<String>) -> Self {
        self.lookups.insert(param.into(), field.into());
        self
    }

    /// The underlying repository
    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Conditions from every scope function, computed once per request
    pub fn scope(&self, ctx: &mut RequestContext) -> Arc<[FilterCondition]> {
        if let Some(cached) = ctx
            .extensions()
            .get::<ScopeCache>()
            .and_then(|cache| cache.0.get(&self.id))
        {
            return Arc::clone(cached);
        }

        let conditions: Arc<[FilterCondition]> = self
            .scopes
            .iter()
            .flat_map(|scope| scope(ctx))
            .collect::<Vec<_>>()
            .into();
        tracing::debug!(
            manager = self.id,
            conditions = conditions.len(),
            "Composed request scope"
        );

        let extensions = ctx.extensions_mut();
        let mut cache = extensions.remove::<ScopeCache>().unwrap_or_default();
        cache.0.insert(self.id, Arc::clone(&conditions));
        extensions.insert(cache);
        conditions
    }

    /// Scope conditions plus one equality per path parameter
    fn lookup_filters(&self, ctx: &mut RequestContext) -> Result<Vec<FilterCondition>, RepositoryError> {
        let mut params: Vec<(&String, &String)> = ctx.params().iter().collect();
        if params.is_empty() {
            return Err(RepositoryError::validation_failed(
                RepositoryOperation::FindOne,
                "no lookup parameters in path",
            ));
        }
        params.sort();

        let keys: Vec<FilterCondition> = params
            .into_iter()
            .map(|(param, raw)| {
                let field = self.lookups.get(param).unwrap_or(param);
                FilterCondition::eq(field.as_str(), FilterValue::from_param(raw))
            })
            .collect();

        let mut filters = self.scope(ctx).to_vec();
        filters.extend(keys);
        Ok(filters)
    }
}

impl<E, V, R> Clone for RepositoryManager<E, V, R> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            scopes: self.scopes.clone(),
            lookups: self.lookups.clone(),
            paginator: self.paginator.clone(),
            config: self.config.clone(),
            id: self.id,
            _types: PhantomData,
        }
    }
}

impl<E, V, R: fmt::Debug> fmt::Debug for RepositoryManager<E, V, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RepositoryManager")
            .field("repository", &self.repository)
            .field("scopes", &self.scopes.len())
            .field("lookups", &self.lookups)
            .field("custom_paginator", &self.paginator.is_some())
            .field("config", &self.config)
            .finish()
    }
}

fn entity_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}

/// Non-null fields of the validated input, for a partial update
fn changes_of<V: Serialize>(input: &V) -> Result<Mapping, BoxError> {
    let mut changes = to_mapping(input)?;
    changes.retain(|_, value| !value.is_null());
    Ok(changes)
}

#[async_trait]
impl<E, V, R> PersistenceManager<E, V> for RepositoryManager<E, V, R>
where
    E: Serialize + DeserializeOwned + Send + Sync + 'static,
    V: Serialize + Send + 'static,
    R: Repository<E> + 'static,
{
    async fn get_object(&self, ctx: &mut RequestContext) -> Result<E, BoxError> {
        let filters = self.lookup_filters(ctx)?;
        let entity = self.repository.find_one(&filters).await?;
        entity.ok_or_else(|| RepositoryError::not_found(entity_name::<E>()).into())
    }

    async fn get_objects(&self, ctx: &mut RequestContext) -> Result<PaginatedResult<E>, BoxError> {
        let window = PaginationWindow::from_request(ctx, &self.config)
            .map_err(|rejection| {
                ViewSetError::wrap(ViewSetErrorKind::ValidationFailed, rejection.into())
            })?;
        let filters = self.scope(ctx);

        tracing::debug!(
            limit = window.limit,
            offset = window.offset,
            with_count = window.with_count,
            "Listing page"
        );
        let repository = self.repository.as_ref();
        let page = match &self.paginator {
            Some(paginator) => paginator(repository, &filters[..], window, ctx.original_uri()).await?,
            None => paginate(repository, &filters[..], window, ctx.original_uri()).await?,
        };
        Ok(page)
    }

    async fn save(
        &self,
        entity: EntityRef<E>,
        input: V,
        _ctx: &mut RequestContext,
    ) -> Result<E, BoxError> {
        match entity {
            EntityRef::Absent => {
                let entity: E = serde_json::from_value(serde_json::to_value(&input)?)?;
                Ok(self.repository.insert(entity).await?)
            }
            EntityRef::Present(entity) => {
                let changes = changes_of(&input)?;
                Ok(self.repository.update(&entity, changes).await?)
            }
        }
    }

    async fn delete(&self, entity: E, _ctx: &mut RequestContext) -> Result<(), BoxError> {
        if self.repository.delete(&entity).await? {
            Ok(())
        } else {
            Err(RepositoryError::not_found(entity_name::<E>())
                .with_operation(RepositoryOperation::Delete)
                .into())
        }
    }
}
