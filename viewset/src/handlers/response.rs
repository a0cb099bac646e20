//! Success responses written by the standard actions

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use super::traits::Mapping;

/// Paginated list body: `{"meta": {...}, "results": [...]}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    /// Pagination metadata from the persistence manager
    pub meta: Mapping,
    /// Serialized entities, in page order
    pub results: Vec<Mapping>,
}

impl ListResponse {
    /// Create a new list response
    pub fn new(meta: Mapping, results: Vec<Mapping>) -> Self {
        Self { meta, results }
    }
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// A single serialized entity rendered with a chosen status
///
/// # Example
///
/// ```rust
/// use axum::http::StatusCode;
/// use viewset::handlers::ItemResponse;
///
/// let created = ItemResponse::created(serde_json::Map::new());
/// assert_eq!(created.status, StatusCode::CREATED);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ItemResponse {
    /// Status line
    pub status: StatusCode,
    /// Serialized entity
    pub data: Mapping,
}

impl ItemResponse {
    /// 200 OK with the mapping
    pub fn ok(data: Mapping) -> Self {
        Self {
            status: StatusCode::OK,
            data,
        }
    }

    /// 201 Created with the mapping
    pub fn created(data: Mapping) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
        }
    }
}

impl IntoResponse for ItemResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.data)).into_response()
    }
}

/// HTTP 204 No Content, with an empty body
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        StatusCode::NO_CONTENT.into_response()
    }
}
