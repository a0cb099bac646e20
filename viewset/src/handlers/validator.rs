//! Default payload binding

use std::fmt;
use std::marker::PhantomData;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::{Form, FromRequest, Request},
    http::header,
};
use serde::de::DeserializeOwned;

use super::traits::{BoxError, EntityRef, FormValidator};
use crate::context::RequestContext;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Binds the request body into `V`
///
/// Bodies sent as `application/x-www-form-urlencoded` are decoded as a form;
/// everything else is decoded as JSON. The entity under update is ignored, so
/// a missing required field fails an update the same way it fails a create.
pub struct DefaultValidator<V> {
    _input: PhantomData<fn() -> V>,
}

impl<V> DefaultValidator<V> {
    pub fn new() -> Self {
        Self {
            _input: PhantomData,
        }
    }
}

impl<V> Default for DefaultValidator<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for DefaultValidator<V> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for DefaultValidator<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultValidator").finish()
    }
}

fn is_form(ctx: &RequestContext) -> bool {
    ctx.content_type()
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}

async fn bind_form<V: DeserializeOwned>(ctx: &RequestContext) -> Result<V, BoxError> {
    let request = Request::builder()
        .method(ctx.method().clone())
        .uri(ctx.uri().clone())
        .header(header::CONTENT_TYPE, FORM_CONTENT_TYPE)
        .body(Body::from(ctx.body().clone()))?;

    let Form(input) = Form::<V>::from_request(request, &()).await?;
    Ok(input)
}

#[async_trait]
impl<E, V> FormValidator<E, V> for DefaultValidator<V>
where
    E: Send + Sync + 'static,
    V: DeserializeOwned + Send + 'static,
{
    async fn validate(&self, _entity: EntityRef<&E>, ctx: &RequestContext) -> Result<V, BoxError> {
        if is_form(ctx) {
            return bind_form(ctx).await;
        }
        Ok(serde_json::from_slice(ctx.body())?)
    }
}
