//! The view set dispatcher
//!
//! A [`ViewSet`] ties a route table to its collaborators. Once built it is
//! frozen: [`ViewSet::into_router`] moves it into an `Arc` shared by every
//! bound handler, so requests only ever see one immutable snapshot.
//!
//! Every request runs the same pipeline:
//!
//! 1. The request head is taken apart into a [`RequestContext`].
//! 2. The [`PermissionChecker`] is asked about the route's action, before
//!    the body is read; a denial is always a 403 and nothing else runs.
//! 3. The body is read up to the configured limit; an unreadable body is a
//!    400.
//! 4. The route's action procedure runs and writes the response.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use axum::{
    extract::Request,
    http::Method,
    response::Response,
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use futures::future::BoxFuture;
use serde::{de::DeserializeOwned, Serialize};
use tracing::Instrument;

use crate::config::ViewSetConfig;
use crate::context::RequestContext;
use crate::error::{Error, Result};
use crate::handlers::{
    AllowAny, BoxError, DefaultExceptionHandler, DefaultSerializer, DefaultValidator,
    ExceptionHandler, FormValidator, PermissionChecker, PersistenceManager, Serializer,
    ViewSetError, ViewSetErrorKind,
};
use crate::routes::{build_table, join_path, ActionHandler, Route};

/// A resource exposed as standard CRUD actions plus custom ones
///
/// # Type Parameters
///
/// - `E`: the entity type
/// - `V`: the validated input bound from request payloads
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use viewset::prelude::*;
///
/// let people = Arc::new(MemoryRepository::<Person>::new("pk"));
/// let router: Router = ViewSet::<Person, PersonRequest>::builder("/users", "/{pk}")
///     .manager(RepositoryManager::new(people))
///     .serializer(DefaultSerializer::new().exclude(["pk"]))
///     .exclude([actions::DELETE])
///     .build()?
///     .into_router();
/// ```
pub struct ViewSet<E, V> {
    base_path: String,
    routes: Vec<Route<E, V>>,
    config: ViewSetConfig,
    manager: Arc<dyn PersistenceManager<E, V>>,
    serializer: Arc<dyn Serializer<E>>,
    validator: Arc<dyn FormValidator<E, V>>,
    permission: Arc<dyn PermissionChecker>,
    exception_handler: Arc<dyn ExceptionHandler>,
}

impl<E, V> ViewSet<E, V>
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    /// Start describing a view set mounted at `base_path`, with entity
    /// routes at `detail_path` (one path parameter, e.g. `/{pk}`)
    pub fn builder(base_path: impl Into<String>, detail_path: impl Into<String>) -> ViewSetBuilder<E, V> {
        ViewSetBuilder::new(base_path, detail_path)
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Bound routes: standard actions first, then custom ones
    pub fn routes(&self) -> &[Route<E, V>] {
        &self.routes
    }

    pub fn config(&self) -> &ViewSetConfig {
        &self.config
    }

    pub fn manager(&self) -> &Arc<dyn PersistenceManager<E, V>> {
        &self.manager
    }

    pub fn serializer(&self) -> &Arc<dyn Serializer<E>> {
        &self.serializer
    }

    pub fn validator(&self) -> &Arc<dyn FormValidator<E, V>> {
        &self.validator
    }

    pub fn permission(&self) -> &Arc<dyn PermissionChecker> {
        &self.permission
    }

    pub fn exception_handler(&self) -> &Arc<dyn ExceptionHandler> {
        &self.exception_handler
    }

    /// Render a failure through the configured exception handler
    pub fn handle_error(&self, error: BoxError, ctx: &RequestContext) -> Response {
        self.exception_handler.handle(error, ctx)
    }

    /// Freeze the view set and bind its routes onto a fresh router
    pub fn into_router<S>(self) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        self.register(Router::new())
    }

    /// Freeze the view set and bind its routes onto `router`
    ///
    /// Paths already present on `router` gain the view set's methods; a
    /// method bound on both sides panics, as with any axum route clash.
    pub fn register<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let viewset = Arc::new(self);

        let mut paths: Vec<(String, Vec<(MethodFilter, &Route<E, V>)>)> = Vec::new();
        for route in &viewset.routes {
            let Ok(filter) = MethodFilter::try_from(route.method().clone()) else {
                tracing::warn!(method = %route.method(), "Skipping route with unroutable method");
                continue;
            };
            let path = join_path(&viewset.base_path, route.sub_path());
            match paths.iter_mut().find(|(existing, _)| *existing == path) {
                Some((_, bindings)) => bindings.push((filter, route)),
                None => paths.push((path, vec![(filter, route)])),
            }
        }

        let mut router = router;
        for (path, bindings) in paths {
            let mut method_router: Option<MethodRouter<S>> = None;
            for (filter, route) in bindings {
                let handler = Self::bind(&viewset, route);
                method_router = Some(match method_router {
                    Some(existing) => existing.on(filter, handler),
                    None => on(filter, handler),
                });
            }
            if let Some(method_router) = method_router {
                tracing::debug!(path = %path, "Registered view set path");
                router = router.route(&path, method_router);
            }
        }
        router
    }

    fn bind(
        viewset: &Arc<Self>,
        route: &Route<E, V>,
    ) -> impl Fn(Request) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static {
        let viewset = Arc::clone(viewset);
        let action = route.action().to_string();
        let handler = Arc::clone(route.handler());
        move |request: Request| -> BoxFuture<'static, Response> {
            Box::pin(Arc::clone(&viewset).dispatch(action.clone(), Arc::clone(&handler), request))
        }
    }

    async fn dispatch(self: Arc<Self>, action: String, handler: ActionHandler<E, V>, request: Request) -> Response {
        let span = tracing::info_span!(
            "viewset",
            action = %action,
            method = %request.method(),
            path = %request.uri().path(),
        );

        async move {
            let (parts, body) = request.into_parts();
            let mut ctx = RequestContext::from_parts(parts).await;

            if let Err(cause) = self.permission.check(&action, &ctx).await {
                let error = ViewSetError::wrap(ViewSetErrorKind::PermissionDenied, cause);
                return self.handle_error(Box::new(error), &ctx);
            }

            if let Err(cause) = ctx.read_body(body, self.config.body_limit_bytes).await {
                let error = ViewSetError::wrap(ViewSetErrorKind::ValidationFailed, cause);
                return self.handle_error(Box::new(error), &ctx);
            }

            let response = handler(action, Arc::clone(&self), ctx).await;
            tracing::debug!(status = response.status().as_u16(), "Action completed");
            response
        }
        .instrument(span)
        .await
    }
}

impl<E, V> fmt::Debug for ViewSet<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewSet")
            .field("base_path", &self.base_path)
            .field("routes", &self.routes)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ViewSet`]
///
/// Only the persistence manager is required; every other collaborator has a
/// default ([`DefaultSerializer`], [`DefaultValidator`], [`AllowAny`],
/// [`DefaultExceptionHandler`]).
pub struct ViewSetBuilder<E, V> {
    base_path: String,
    detail_path: String,
    excluded: Vec<String>,
    custom: Vec<Route<E, V>>,
    config: ViewSetConfig,
    manager: Option<Arc<dyn PersistenceManager<E, V>>>,
    serializer: Option<Arc<dyn Serializer<E>>>,
    validator: Option<Arc<dyn FormValidator<E, V>>>,
    permission: Option<Arc<dyn PermissionChecker>>,
    exception_handler: Option<Arc<dyn ExceptionHandler>>,
}

impl<E, V> ViewSetBuilder<E, V>
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    pub fn new(base_path: impl Into<String>, detail_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            detail_path: detail_path.into(),
            excluded: Vec::new(),
            custom: Vec::new(),
            config: ViewSetConfig::default(),
            manager: None,
            serializer: None,
            validator: None,
            permission: None,
            exception_handler: None,
        }
    }

    /// Leave these standard actions unbound
    #[must_use]
    pub fn exclude<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(actions.into_iter().map(Into::into));
        self
    }

    /// Append a custom route
    #[must_use]
    pub fn route(mut self, route: Route<E, V>) -> Self {
        self.custom.push(route);
        self
    }

    /// Dispatcher settings (request body limit)
    #[must_use]
    pub fn config(mut self, config: &ViewSetConfig) -> Self {
        self.config = config.clone();
        self
    }

    #[must_use]
    pub fn manager(mut self, manager: impl PersistenceManager<E, V> + 'static) -> Self {
        self.manager = Some(Arc::new(manager));
        self
    }

    #[must_use]
    pub fn serializer(mut self, serializer: impl Serializer<E> + 'static) -> Self {
        self.serializer = Some(Arc::new(serializer));
        self
    }

    #[must_use]
    pub fn validator(mut self, validator: impl FormValidator<E, V> + 'static) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    #[must_use]
    pub fn permission(mut self, permission: impl PermissionChecker + 'static) -> Self {
        self.permission = Some(Arc::new(permission));
        self
    }

    #[must_use]
    pub fn exception_handler(mut self, handler: impl ExceptionHandler + 'static) -> Self {
        self.exception_handler = Some(Arc::new(handler));
        self
    }

    /// Fill in defaults, build the route table and check it
    ///
    /// # Errors
    ///
    /// - [`Error::MissingManager`] when no persistence manager was given
    /// - [`Error::UnsupportedMethod`] when a custom route uses a method the
    ///   router cannot dispatch
    /// - [`Error::DuplicateRoute`] when two routes bind the same method and path
    pub fn build(self) -> Result<ViewSet<E, V>>
    where
        E: Serialize,
        V: DeserializeOwned,
    {
        let manager = self.manager.ok_or(Error::MissingManager)?;
        let routes = build_table(&self.detail_path, &self.excluded, self.custom);

        let mut seen: HashSet<(String, Method)> = HashSet::new();
        for route in &routes {
            if MethodFilter::try_from(route.method().clone()).is_err() {
                return Err(Error::UnsupportedMethod(route.method().clone()));
            }
            let path = join_path(&self.base_path, route.sub_path());
            if !seen.insert((path.clone(), route.method().clone())) {
                return Err(Error::DuplicateRoute {
                    method: route.method().clone(),
                    path,
                });
            }
        }

        tracing::debug!(
            base_path = %self.base_path,
            routes = routes.len(),
            "Built view set"
        );

        Ok(ViewSet {
            base_path: self.base_path,
            routes,
            config: self.config,
            manager,
            serializer: self
                .serializer
                .unwrap_or_else(|| Arc::new(DefaultSerializer::<E>::new())),
            validator: self
                .validator
                .unwrap_or_else(|| Arc::new(DefaultValidator::<V>::new())),
            permission: self.permission.unwrap_or_else(|| Arc::new(AllowAny)),
            exception_handler: self
                .exception_handler
                .unwrap_or_else(|| Arc::new(DefaultExceptionHandler)),
        })
    }
}
