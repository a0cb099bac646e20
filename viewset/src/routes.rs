//! Route table for a view set
//!
//! The five standard actions map onto two paths:
//!
//! | Action | Method | Sub-path |
//! |---|---|---|
//! | `list` | GET | `/` |
//! | `retrieve` | GET | detail |
//! | `create` | POST | `/` |
//! | `update` | PUT, PATCH | detail |
//! | `delete` | DELETE | detail |
//!
//! Each is bound unless its name is excluded; custom routes follow in the
//! order they were added and are never excluded.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use axum::{http::Method, response::Response};
use futures::future::BoxFuture;

use crate::actions;
use crate::context::RequestContext;
use crate::viewset::ViewSet;

/// Procedure run for a route once permission is granted
///
/// Receives the action name, the shared view set and the request context, and
/// renders the whole response, failures included.
pub type ActionHandler<E, V> =
    Arc<dyn Fn(String, Arc<ViewSet<E, V>>, RequestContext) -> BoxFuture<'static, Response> + Send + Sync>;

/// One action bound to a method and sub-path
pub struct Route<E, V> {
    action: String,
    sub_path: String,
    method: Method,
    handler: ActionHandler<E, V>,
}

impl<E, V> Route<E, V> {
    /// Bind `handler` as `action` on `method` at `sub_path`
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// use axum::{http::Method, response::IntoResponse};
    /// use viewset::routes::Route;
    ///
    /// let count = Route::new("count", "/count", Method::GET, |_action, viewset, mut ctx| async move {
    ///     match viewset.manager().get_objects(&mut ctx).await {
    ///         Ok(page) => page.entities.len().to_string().into_response(),
    ///         Err(err) => viewset.handle_error(err, &ctx),
    ///     }
    /// });
    /// ```
    pub fn new<F, Fut>(
        action: impl Into<String>,
        sub_path: impl Into<String>,
        method: Method,
        handler: F,
    ) -> Self
    where
        F: Fn(String, Arc<ViewSet<E, V>>, RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let handler: ActionHandler<E, V> = Arc::new(
            move |action: String,
                  viewset: Arc<ViewSet<E, V>>,
                  ctx: RequestContext|
                  -> BoxFuture<'static, Response> { Box::pin(handler(action, viewset, ctx)) },
        );
        Self {
            action: action.into(),
            sub_path: sub_path.into(),
            method,
            handler,
        }
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn sub_path(&self) -> &str {
        &self.sub_path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn handler(&self) -> &ActionHandler<E, V> {
        &self.handler
    }
}

impl<E, V> Clone for Route<E, V> {
    fn clone(&self) -> Self {
        Self {
            action: self.action.clone(),
            sub_path: self.sub_path.clone(),
            method: self.method.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<E, V> fmt::Debug for Route<E, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("action", &self.action)
            .field("sub_path", &self.sub_path)
            .field("method", &self.method)
            .finish_non_exhaustive()
    }
}

/// Whether a standard action survives the exclusion list (exact name match)
pub fn should_add_action<S: AsRef<str>>(action: &str, excluded: &[S]) -> bool {
    !excluded.iter().any(|name| name.as_ref() == action)
}

/// Standard routes minus `excluded`, followed by `custom`
pub(crate) fn build_table<E, V>(
    detail_path: &str,
    excluded: &[String],
    custom: Vec<Route<E, V>>,
) -> Vec<Route<E, V>>
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    let mut routes = Vec::with_capacity(6 + custom.len());

    if should_add_action(actions::LIST, excluded) {
        routes.push(Route::new(actions::LIST, "/", Method::GET, actions::list::<E, V>));
    }
    if should_add_action(actions::RETRIEVE, excluded) {
        routes.push(Route::new(
            actions::RETRIEVE,
            detail_path,
            Method::GET,
            actions::retrieve::<E, V>,
        ));
    }
    if should_add_action(actions::CREATE, excluded) {
        routes.push(Route::new(actions::CREATE, "/", Method::POST, actions::create::<E, V>));
    }
    if should_add_action(actions::UPDATE, excluded) {
        let update = Route::new(actions::UPDATE, detail_path, Method::PUT, actions::update::<E, V>);
        let mut partial = update.clone();
        partial.method = Method::PATCH;
        routes.push(update);
        routes.push(partial);
    }
    if should_add_action(actions::DELETE, excluded) {
        routes.push(Route::new(
            actions::DELETE,
            detail_path,
            Method::DELETE,
            actions::delete::<E, V>,
        ));
    }

    routes.extend(custom);
    routes
}

/// Full route path: `base` followed by `sub`, with no trailing slash
/// except for the root
pub fn join_path(base: &str, sub: &str) -> String {
    let joined = format!(
        "/{}/{}",
        base.trim_matches('/'),
        sub.trim_start_matches('/')
    );

    let mut path = String::with_capacity(joined.len());
    for segment in joined.split('/').filter(|segment| !segment.is_empty()) {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}
