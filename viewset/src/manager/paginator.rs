//! Limit-offset pagination over a [`Repository`]

use axum::{extract::rejection::QueryRejection, http::Uri};
use serde::Deserialize;
use serde_json::Value;

use crate::config::ViewSetConfig;
use crate::context::RequestContext;
use crate::handlers::{Mapping, PaginatedResult};
use crate::repository::{FilterCondition, Pagination, Repository, RepositoryResult};

/// Raw query parameters, before defaults and clamping
#[derive(Debug, Default, Deserialize)]
struct WindowQuery {
    limit: Option<u64>,
    offset: Option<u64>,
    #[serde(rename = "withCount", alias = "with_count")]
    with_count: Option<bool>,
}

/// Page requested by a list call
///
/// Bound from the `limit`, `offset` and `withCount` query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    /// Maximum rows on the page
    pub limit: u64,
    /// Rows skipped before the page
    pub offset: u64,
    /// Whether to report the total row count
    pub with_count: bool,
}

impl PaginationWindow {
    pub const fn new(limit: u64, offset: u64, with_count: bool) -> Self {
        Self {
            limit,
            offset,
            with_count,
        }
    }

    /// Bind the window from the request's query string
    ///
    /// Missing values fall back to `config.default_limit`, offset 0 and no
    /// count; the limit is then clamped to `config.max_limit`. Negative or
    /// non-numeric values, and non-boolean flags, are rejected.
    pub fn from_request(
        ctx: &RequestContext,
        config: &ViewSetConfig,
    ) -> Result<Self, QueryRejection> {
        let query: WindowQuery = ctx.query()?;
        Ok(Self {
            limit: config.clamp_limit(query.limit.unwrap_or(config.default_limit)),
            offset: query.offset.unwrap_or(0),
            with_count: query.with_count.unwrap_or(false),
        })
    }

    /// Offset of the following page
    pub const fn next_offset(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }

    /// Offset of the preceding page, never below zero
    pub const fn previous_offset(&self) -> u64 {
        self.offset.saturating_sub(self.limit)
    }
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_LIMIT, 0, false)
    }
}

/// Fetch one page of `repository` and build its metadata
///
/// One extra row past the window is fetched to learn whether a next page
/// exists. `next` and `previous` are the current request URI with only the
/// `offset` parameter changed, or null at either end.
pub async fn paginate<E, R>(
    repository: &R,
    filters: &[FilterCondition],
    window: PaginationWindow,
    uri: &Uri,
) -> RepositoryResult<PaginatedResult<E>>
where
    R: Repository<E>,
{
    let mut meta = Mapping::new();

    if window.with_count {
        let count = repository.count(filters).await?;
        meta.insert("count".to_string(), Value::from(count));
    }

    let fetch = Pagination::new(window.offset, window.limit.saturating_add(1));
    let mut entities = repository.find_all(filters, Some(fetch)).await?;

    let has_next = entities.len() as u64 > window.limit;
    entities.truncate(usize::try_from(window.limit).unwrap_or(usize::MAX));

    let next = has_next.then(|| with_offset(uri, window.next_offset()));
    let previous = (window.offset > 0).then(|| with_offset(uri, window.previous_offset()));
    meta.insert("next".to_string(), next.map_or(Value::Null, Value::String));
    meta.insert("previous".to_string(), previous.map_or(Value::Null, Value::String));

    Ok(PaginatedResult::new(entities, meta))
}

/// `uri` as path and query, with `offset` set to `offset`
///
/// Other parameters keep their order and encoding. The first `offset` pair is
/// replaced and any repeats dropped; without one, it is appended.
pub fn with_offset(uri: &Uri, offset: u64) -> String {
    let replacement = format!("offset={offset}");
    let mut pairs: Vec<String> = Vec::new();
    let mut replaced = false;

    for pair in uri.query().unwrap_or_default().split('&') {
        if pair.is_empty() {
            continue;
        }
        let name = pair.split_once('=').map_or(pair, |(name, _)| name);
        if name == "offset" {
            if !replaced {
                pairs.push(replacement.clone());
                replaced = true;
            }
        } else {
            pairs.push(pair.to_string());
        }
    }
    if !replaced {
        pairs.push(replacement);
    }

    format!("{}?{}", uri.path(), pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MemoryRepository;
    use axum::http::Method;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Row {
        #[serde(default)]
        id: i64,
        n: u64,
    }

    async fn rows(count: u64) -> MemoryRepository<Row> {
        MemoryRepository::seeded("id", (0..count).map(|n| Row { id: 0, n }))
            .await
            .unwrap()
    }

    fn ctx(uri: &'static str) -> RequestContext {
        RequestContext::new(Method::GET, Uri::from_static(uri))
    }

    #[test]
    fn test_window_defaults() {
        let window = PaginationWindow::from_request(&ctx("/rows"), &ViewSetConfig::default()).unwrap();
        assert_eq!(window, PaginationWindow::new(20, 0, false));
        assert_eq!(window, PaginationWindow::default());
    }

    #[test]
    fn test_window_binding_and_alias() {
        let config = ViewSetConfig::default();
        let window =
            PaginationWindow::from_request(&ctx("/rows?limit=5&offset=10&withCount=true"), &config)
                .unwrap();
        assert_eq!(window, PaginationWindow::new(5, 10, true));

        let window = PaginationWindow::from_request(&ctx("/rows?with_count=true"), &config).unwrap();
        assert!(window.with_count);
    }

    #[test]
    fn test_window_binding_rejects_bad_values() {
        let config = ViewSetConfig::default();
        assert!(PaginationWindow::from_request(&ctx("/rows?offset=-1"), &config).is_err());
        assert!(PaginationWindow::from_request(&ctx("/rows?limit=many"), &config).is_err());
        assert!(PaginationWindow::from_request(&ctx("/rows?withCount=maybe"), &config).is_err());
    }

    #[test]
    fn test_window_limit_is_clamped() {
        let config = ViewSetConfig {
            default_limit: 10,
            max_limit: Some(50),
            ..ViewSetConfig::default()
        };
        let window = PaginationWindow::from_request(&ctx("/rows?limit=500"), &config).unwrap();
        assert_eq!(window.limit, 50);
        let window = PaginationWindow::from_request(&ctx("/rows"), &config).unwrap();
        assert_eq!(window.limit, 10);
    }

    #[test]
    fn test_with_offset_rewrites_only_offset() {
        let uri = Uri::from_static("/rows?limit=2&offset=4&withCount=true");
        assert_eq!(with_offset(&uri, 6), "/rows?limit=2&offset=6&withCount=true");

        let uri = Uri::from_static("/rows?limit=2");
        assert_eq!(with_offset(&uri, 2), "/rows?limit=2&offset=2");

        let uri = Uri::from_static("/rows");
        assert_eq!(with_offset(&uri, 20), "/rows?offset=20");

        let uri = Uri::from_static("/rows?offset=1&name=a%20b&offset=9");
        assert_eq!(with_offset(&uri, 0), "/rows?offset=0&name=a%20b");
    }

    #[tokio::test]
    async fn test_paginate_matches_window_formula() {
        let uri = Uri::from_static("/rows?limit=3");
        for n in [0u64, 1, 3, 4, 7, 10] {
            let repo = rows(n).await;
            for limit in [1u64, 3, 5] {
                for offset in [0u64, 1, 2, 3, 6, 12] {
                    let window = PaginationWindow::new(limit, offset, false);
                    let page = paginate(&repo, &[], window, &uri).await.unwrap();

                    let expected = limit.min(n.saturating_sub(offset));
                    assert_eq!(page.entities.len() as u64, expected, "n={n} l={limit} o={offset}");
                    if let Some(first) = page.entities.first() {
                        assert_eq!(first.n, offset);
                    }

                    let next = page.meta["next"].as_str();
                    if n.saturating_sub(offset) > limit {
                        let expected = format!("offset={}", offset + limit);
                        assert!(next.unwrap().ends_with(&expected));
                    } else {
                        assert!(next.is_none());
                    }

                    let previous = page.meta["previous"].as_str();
                    if offset > 0 {
                        let expected = format!("offset={}", offset.saturating_sub(limit));
                        assert!(previous.unwrap().ends_with(&expected));
                    } else {
                        assert!(previous.is_none());
                    }
                    assert!(!page.meta.contains_key("count"));
                }
            }
        }
    }

    #[tokio::test]
    async fn test_paginate_reports_count_when_asked() {
        let repo = rows(4).await;
        let uri = Uri::from_static("/rows");
        let window = PaginationWindow::new(2, 0, true);
        let page = paginate(&repo, &[], window, &uri).await.unwrap();

        assert_eq!(page.meta["count"], 4);
        assert_eq!(page.meta["next"], "/rows?offset=2");
        assert!(page.meta["previous"].is_null());
    }

    #[tokio::test]
    async fn test_paginate_applies_filters_before_window() {
        let repo = rows(10).await;
        let uri = Uri::from_static("/rows");
        let filters = [FilterCondition::gte("n", 6)];
        let page = paginate(&repo, &filters, PaginationWindow::new(3, 0, true), &uri)
            .await
            .unwrap();

        assert_eq!(page.meta["count"], 4);
        assert_eq!(page.entities.iter().map(|r| r.n).collect::<Vec<_>>(), [6, 7, 8]);
        assert_eq!(page.meta["next"], "/rows?offset=3");
    }
}
