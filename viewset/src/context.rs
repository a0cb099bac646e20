//! Per-request context handed to every collaborator
//!
//! A [`RequestContext`] is built once per inbound request, before the
//! permission check runs, and lives exactly as long as that request. It
//! carries the parts of the request collaborators are allowed to look at
//! (method, URI, headers, path parameters, body) plus an extension map that
//! persistence managers use as request-scoped storage.

use std::collections::HashMap;

use axum::{
    body::{Body, Bytes},
    extract::{rejection::QueryRejection, FromRequestParts, OriginalUri, Query, RawPathParams},
    http::{header, request::Parts, Extensions, HeaderMap, HeaderValue, Method, Uri},
};
use serde::de::DeserializeOwned;

use crate::handlers::BoxError;

/// The request as seen by view set collaborators
#[derive(Debug)]
pub struct RequestContext {
    method: Method,
    uri: Uri,
    original_uri: Uri,
    headers: HeaderMap,
    params: HashMap<String, String>,
    body: Bytes,
    extensions: Extensions,
}

impl RequestContext {
    /// Create a context with no headers, parameters or body
    ///
    /// Mostly useful for driving collaborators directly in tests.
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            original_uri: uri.clone(),
            uri,
            headers: HeaderMap::new(),
            params: HashMap::new(),
            body: Bytes::new(),
            extensions: Extensions::new(),
        }
    }

    /// Add a path parameter
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Add a header, replacing any previous value
    #[must_use]
    pub fn with_header(mut self, name: header::HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set the raw request body
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Build a context from the request head; the body stays empty
    ///
    /// Extensions inserted by upstream middleware (authentication state, request
    /// ids) move into the context so collaborators can read them. The URI as
    /// received, before any `Router::nest` prefix was stripped, is kept apart
    /// from the routed one.
    pub(crate) async fn from_parts(mut parts: Parts) -> Self {
        let params = match RawPathParams::from_request_parts(&mut parts, &()).await {
            Ok(raw) => raw
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            Err(_) => HashMap::new(),
        };
        let original_uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or_else(|| parts.uri.clone(), |OriginalUri(uri)| uri.clone());

        Self {
            method: parts.method,
            uri: parts.uri,
            original_uri,
            headers: parts.headers,
            params,
            body: Bytes::new(),
            extensions: parts.extensions,
        }
    }

    /// Read at most `body_limit` bytes of `body` into the context
    pub(crate) async fn read_body(&mut self, body: Body, body_limit: usize) -> Result<(), BoxError> {
        self.body = axum::body::to_bytes(body, body_limit).await?;
        Ok(())
    }

    /// HTTP method of the request
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request URI as routed, including the query string
    ///
    /// Under `Router::nest` the mount prefix is already stripped.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request URI exactly as the client sent it, nest prefixes included
    pub fn original_uri(&self) -> &Uri {
        &self.original_uri
    }

    /// Request headers
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Value of the `Content-Type` header, if it is valid UTF-8
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
    }

    /// A single path parameter by placeholder name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All path parameters matched by the route
    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// Raw request body
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the query string into `T`
    pub fn query<T: DeserializeOwned>(&self) -> Result<T, QueryRejection> {
        Query::<T>::try_from_uri(&self.uri).map(|Query(value)| value)
    }

    /// Request-scoped storage
    pub fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    /// Mutable request-scoped storage
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Request;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Window {
        limit: u64,
        #[serde(default)]
        offset: u64,
    }

    #[test]
    fn test_query_binding() {
        let ctx = RequestContext::new(Method::GET, Uri::from_static("/users?limit=5"));
        let window: Window = ctx.query().unwrap();
        assert_eq!(window, Window { limit: 5, offset: 0 });
    }

    #[test]
    fn test_query_binding_rejects_negative_unsigned() {
        let ctx = RequestContext::new(Method::GET, Uri::from_static("/users?limit=5&offset=-1"));
        assert!(ctx.query::<Window>().is_err());
    }

    #[test]
    fn test_builder_helpers() {
        let ctx = RequestContext::new(Method::POST, Uri::from_static("/users"))
            .with_param("pk", "7")
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .with_body(r#"{"name":"a"}"#);

        assert_eq!(ctx.param("pk"), Some("7"));
        assert_eq!(ctx.param("id"), None);
        assert_eq!(ctx.content_type(), Some("application/json"));
        assert_eq!(ctx.body().as_ref(), br#"{"name":"a"}"#);
    }

    #[tokio::test]
    async fn test_from_parts_keeps_extensions_and_reads_body() {
        #[derive(Clone, Debug, PartialEq)]
        struct Tenant(&'static str);

        let mut request = Request::builder()
            .method(Method::PUT)
            .uri("/users/1?x=1")
            .body(Body::from("payload"))
            .unwrap();
        request.extensions_mut().insert(Tenant("acme"));
        let (parts, body) = request.into_parts();

        let mut ctx = RequestContext::from_parts(parts).await;
        assert!(ctx.body().is_empty());
        ctx.read_body(body, 1024).await.unwrap();

        assert_eq!(ctx.method(), Method::PUT);
        assert_eq!(ctx.uri().query(), Some("x=1"));
        assert_eq!(ctx.original_uri(), ctx.uri());
        assert_eq!(ctx.body().as_ref(), b"payload");
        assert_eq!(ctx.extensions().get::<Tenant>(), Some(&Tenant("acme")));
        assert!(ctx.params().is_empty());
    }

    #[tokio::test]
    async fn test_from_parts_prefers_original_uri() {
        let mut request = Request::builder()
            .uri("/users?offset=1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(OriginalUri(Uri::from_static("/api/users?offset=1")));
        let (parts, _) = request.into_parts();

        let ctx = RequestContext::from_parts(parts).await;
        assert_eq!(ctx.uri().path(), "/users");
        assert_eq!(ctx.original_uri().path(), "/api/users");
    }

    #[tokio::test]
    async fn test_read_body_enforces_limit() {
        let mut ctx = RequestContext::new(Method::POST, Uri::from_static("/users"));
        let body = Body::from(vec![b'x'; 64]);
        assert!(ctx.read_body(body, 16).await.is_err());
    }
}
