pub mod handlers;
pub mod models;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use viewset::prelude::*;
use viewset::repository::RepositoryResult;

pub use models::{Person, PersonRequest};

/// Store shared by every `/users` request
pub type People = Arc<MemoryRepository<Person>>;

/// In-memory store holding the single seed person
pub async fn seed() -> RepositoryResult<People> {
    let people = [Person {
        pk: 1,
        name: "test".to_string(),
        age: 20,
    }];
    Ok(Arc::new(MemoryRepository::seeded("pk", people).await?))
}

/// `/health` plus the `/users` view set, traced per request
pub fn app(config: &Config, people: People) -> Result<Router> {
    let manager = RepositoryManager::<Person, PersonRequest, _>::new(people)
        .with_config(&config.viewset)
        .lookup("pk", "pk");

    let users = ViewSet::builder("/users", "/{pk}")
        .manager(manager)
        .serializer(DefaultSerializer::new().exclude(["pk"]))
        .config(&config.viewset)
        .build()?;

    let router = Router::new().route("/health", get(handlers::health));
    Ok(users.register(router).layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_seeded_person_is_listed() {
        let app = app(&Config::default(), seed().await.unwrap()).unwrap();

        let (status, body) = get_json(&app, "/users?withCount=true").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["count"], 1);
        assert_eq!(body["results"], json!([{"name": "test", "age": 20}]));
    }

    #[tokio::test]
    async fn test_retrieve_and_missing() {
        let app = app(&Config::default(), seed().await.unwrap()).unwrap();

        let (status, body) = get_json(&app, "/users/1").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"name": "test", "age": 20}));

        let (status, body) = get_json(&app, "/users/2").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({"message": "Object not found"}));
    }

    #[tokio::test]
    async fn test_health_route_survives_registration() {
        let app = app(&Config::default(), seed().await.unwrap()).unwrap();
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
