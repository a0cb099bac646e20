//! Standard action procedures
//!
//! Each procedure runs its stages in a fixed order and stops at the first
//! failing one. A failure is wrapped with the status of its stage and
//! rendered by the view set's exception handler. The list `get_objects`
//! stage alone lets a [`ViewSetError`] from the manager keep its own status
//! (see [`ViewSetError::at_stage`]), so a malformed page window is a 400:
//!
//! | Action | Stages (status on failure) | Success |
//! |---|---|---|
//! | list | get_objects (500), many_serialize (500) | 200 |
//! | retrieve | get_object (404), serialize (500) | 200 |
//! | create | validate (400), save (400), serialize (500) | 201 |
//! | update | get_object (404), validate (400), save (400), serialize (500) | 200 |
//! | delete | get_object (404), delete (400) | 204 |

use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::context::RequestContext;
use crate::handlers::{
    BoxError, EntityRef, ItemResponse, ListResponse, NoContent, ViewSetError, ViewSetErrorKind,
};
use crate::viewset::ViewSet;

pub const LIST: &str = "list";
pub const RETRIEVE: &str = "retrieve";
pub const CREATE: &str = "create";
pub const UPDATE: &str = "update";
pub const DELETE: &str = "delete";

fn stage(kind: ViewSetErrorKind) -> impl FnOnce(BoxError) -> BoxError {
    move |cause| Box::new(ViewSetError::wrap(kind, cause))
}

/// Render `outcome`, sending failures through the exception handler
fn respond<E, V>(
    viewset: &ViewSet<E, V>,
    ctx: &RequestContext,
    outcome: Result<Response, BoxError>,
) -> Response
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    outcome.unwrap_or_else(|error| viewset.handle_error(error, ctx))
}

/// `GET /`: one page of serialized entities with pagination metadata
pub async fn list<E, V>(_action: String, viewset: Arc<ViewSet<E, V>>, mut ctx: RequestContext) -> Response
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    let outcome = async {
        let page = viewset
            .manager()
            .get_objects(&mut ctx)
            .await
            .map_err(|cause| ViewSetError::at_stage(ViewSetErrorKind::InternalFailure, cause))?;
        let results = viewset
            .serializer()
            .many_serialize(&page.entities, &ctx)
            .await
            .map_err(stage(ViewSetErrorKind::InternalFailure))?;
        Ok::<_, BoxError>(ListResponse::new(page.meta, results).into_response())
    }
    .await;
    respond(&viewset, &ctx, outcome)
}

/// `GET /{key}`: the addressed entity
pub async fn retrieve<E, V>(
    _action: String,
    viewset: Arc<ViewSet<E, V>>,
    mut ctx: RequestContext,
) -> Response
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    let outcome = async {
        let entity = viewset
            .manager()
            .get_object(&mut ctx)
            .await
            .map_err(stage(ViewSetErrorKind::NotFound))?;
        let data = viewset
            .serializer()
            .serialize(&entity, &ctx)
            .await
            .map_err(stage(ViewSetErrorKind::InternalFailure))?;
        Ok::<_, BoxError>(ItemResponse::ok(data).into_response())
    }
    .await;
    respond(&viewset, &ctx, outcome)
}

/// `POST /`: validate, insert, and return the stored entity
pub async fn create<E, V>(_action: String, viewset: Arc<ViewSet<E, V>>, mut ctx: RequestContext) -> Response
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    let outcome = async {
        let input = viewset
            .validator()
            .validate(EntityRef::Absent, &ctx)
            .await
            .map_err(stage(ViewSetErrorKind::ValidationFailed))?;
        let entity = viewset
            .manager()
            .save(EntityRef::Absent, input, &mut ctx)
            .await
            .map_err(stage(ViewSetErrorKind::ValidationFailed))?;
        let data = viewset
            .serializer()
            .serialize(&entity, &ctx)
            .await
            .map_err(stage(ViewSetErrorKind::InternalFailure))?;
        Ok::<_, BoxError>(ItemResponse::created(data).into_response())
    }
    .await;
    respond(&viewset, &ctx, outcome)
}

/// `PUT|PATCH /{key}`: validate against the addressed entity and update it in place
pub async fn update<E, V>(_action: String, viewset: Arc<ViewSet<E, V>>, mut ctx: RequestContext) -> Response
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    let outcome = async {
        let entity = viewset
            .manager()
            .get_object(&mut ctx)
            .await
            .map_err(stage(ViewSetErrorKind::NotFound))?;
        let input = viewset
            .validator()
            .validate(EntityRef::Present(&entity), &ctx)
            .await
            .map_err(stage(ViewSetErrorKind::ValidationFailed))?;
        let entity = viewset
            .manager()
            .save(EntityRef::Present(entity), input, &mut ctx)
            .await
            .map_err(stage(ViewSetErrorKind::ValidationFailed))?;
        let data = viewset
            .serializer()
            .serialize(&entity, &ctx)
            .await
            .map_err(stage(ViewSetErrorKind::InternalFailure))?;
        Ok::<_, BoxError>(ItemResponse::ok(data).into_response())
    }
    .await;
    respond(&viewset, &ctx, outcome)
}

/// `DELETE /{key}`: remove the addressed entity
pub async fn delete<E, V>(_action: String, viewset: Arc<ViewSet<E, V>>, mut ctx: RequestContext) -> Response
where
    E: Send + Sync + 'static,
    V: Send + 'static,
{
    let outcome = async {
        let entity = viewset
            .manager()
            .get_object(&mut ctx)
            .await
            .map_err(stage(ViewSetErrorKind::NotFound))?;
        viewset
            .manager()
            .delete(entity, &mut ctx)
            .await
            .map_err(stage(ViewSetErrorKind::ValidationFailed))?;
        Ok::<_, BoxError>(NoContent.into_response())
    }
    .await;
    respond(&viewset, &ctx, outcome)
}
