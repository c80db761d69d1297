//! Router-level tests driving the full axum app

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tagbox_config::{ServerConfig, UnauthenticatedStatus};
use tagbox_core::{AccessPolicy, Argon2Hasher, Argon2Params, TagboxService, UserCreate};
use tagbox_sqlite::SqliteStore;
use tagbox_web::{build_router, AppState};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new(policy: AccessPolicy, unauthenticated: UnauthenticatedStatus) -> Self {
        let hasher = Argon2Hasher::new(Argon2Params {
            memory_kib: 8,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let service = TagboxService::new(SqliteStore::memory().unwrap(), policy, Arc::new(hasher));
        let state = AppState::new(service);
        let router =
            build_router(state.clone(), &ServerConfig::default(), unauthenticated).unwrap();
        Self { router, state }
    }

    fn with_defaults() -> Self {
        Self::new(AccessPolicy::default(), UnauthenticatedStatus::Unauthorized)
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Token {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    /// Register `username` with password "secret" and return its key
    async fn user(&self, username: &str) -> String {
        let (status, _) = self
            .send(
                Method::POST,
                "/api/users",
                None,
                Some(json!({ "username": username, "password": "secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .send(
                Method::POST,
                "/api/auth/login",
                None,
                Some(json!({ "username": username, "password": "secret" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["key"].as_str().unwrap().to_string()
    }

    async fn create(&self, token: &str, title: &str, tags: &[&str]) -> Value {
        let tags: Vec<Value> = tags.iter().map(|t| json!({ "name": t })).collect();
        let (status, body) = self
            .send(
                Method::POST,
                "/api/elements",
                Some(token),
                Some(json!({ "title": title, "tags": tags })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body
    }
}

fn tag_names(element: &Value) -> Vec<String> {
    element["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::with_defaults();
    let (status, body) = app.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_create_and_retrieve_element() {
    let app = TestApp::with_defaults();
    let token = app.user("owner").await;

    let created = app.create(&token, "first", &["x", "y"]).await;
    assert_eq!(tag_names(&created), vec!["x", "y"]);
    assert!(created["owner"].is_i64());

    let id = created["id"].as_i64().unwrap();
    let (status, fetched) = app
        .send(Method::GET, &format!("/api/elements/{id}"), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (_, tags) = app.send(Method::GET, "/api/tags", None, None).await;
    assert_eq!(tags["count"], 2);
}

#[tokio::test]
async fn test_update_detaches_with_to_delete_flag() {
    let app = TestApp::with_defaults();
    let token = app.user("owner").await;
    let created = app.create(&token, "e", &["a"]).await;
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = app
        .send(
            Method::PATCH,
            &format!("/api/elements/{id}"),
            Some(&token),
            Some(json!({ "tags": [{ "name": "b" }, { "name": "a", "to_delete": true }] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag_names(&updated), vec!["b"]);
    assert_eq!(updated["title"], "e");
}

#[tokio::test]
async fn test_non_owner_update_is_forbidden() {
    let app = TestApp::with_defaults();
    let owner = app.user("owner").await;
    let other = app.user("other").await;
    let created = app.create(&owner, "mine", &["a"]).await;
    let id = created["id"].as_i64().unwrap();

    let (status, body) = app
        .send(
            Method::PATCH,
            &format!("/api/elements/{id}"),
            Some(&other),
            Some(json!({ "title": "stolen", "tags": [{ "name": "a", "delete": true }] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthorized");

    let (_, fetched) = app
        .send(Method::GET, &format!("/api/elements/{id}"), None, None)
        .await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_anonymous_create_rejected_by_default() {
    let app = TestApp::with_defaults();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/elements")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "title": "anon" }).to_string()))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Token"
    );
}

#[tokio::test]
async fn test_unauthenticated_status_can_be_403() {
    let app = TestApp::new(AccessPolicy::default(), UnauthenticatedStatus::Forbidden);
    let (status, body) = app
        .send(
            Method::POST,
            "/api/elements",
            None,
            Some(json!({ "title": "anon" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "unauthenticated");
}

#[tokio::test]
async fn test_anonymous_elements_are_open_to_any_user() {
    let app = TestApp::new(
        AccessPolicy {
            allow_anonymous_create: true,
        },
        UnauthenticatedStatus::Unauthorized,
    );
    let (status, created) = app
        .send(
            Method::POST,
            "/api/elements",
            None,
            Some(json!({ "title": "anon", "tags": [{ "name": "a" }] })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(created["owner"].is_null());
    let id = created["id"].as_i64().unwrap();

    let token = app.user("someone").await;
    let (status, updated) = app
        .send(
            Method::PATCH,
            &format!("/api/elements/{id}"),
            Some(&token),
            Some(json!({ "description": "added" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["description"], "added");
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let app = TestApp::with_defaults();
    let (status, _) = app
        .send(
            Method::POST,
            "/api/elements",
            Some("not-a-key"),
            Some(json!({ "title": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_filters() {
    let app = TestApp::with_defaults();
    let token = app.user("owner").await;
    app.create(&token, "both", &["a", "b"]).await;
    app.create(&token, "only a", &["a"]).await;
    app.create(&token, "none", &[]).await;

    let (_, all) = app
        .send(Method::GET, "/api/elements?tags=a,b", None, None)
        .await;
    assert_eq!(all["count"], 1);
    assert_eq!(all["results"][0]["title"], "both");

    let (_, any) = app
        .send(Method::GET, "/api/elements?tags=a,b&any=true", None, None)
        .await;
    assert_eq!(any["count"], 2);

    let (_, limited) = app
        .send(Method::GET, "/api/elements?limit=1", None, None)
        .await;
    assert_eq!(limited["count"], 1);

    let (_, searched) = app
        .send(Method::GET, "/api/elements?search=ONLY", None, None)
        .await;
    assert_eq!(searched["count"], 1);
}

#[tokio::test]
async fn test_tag_routes_are_read_only() {
    let app = TestApp::with_defaults();
    let token = app.user("owner").await;
    app.create(&token, "e", &["rust"]).await;

    let (status, tag) = app.send(Method::GET, "/api/tags/rust", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(tag["name"], "rust");

    let (status, _) = app.send(Method::GET, "/api/tags/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/tags",
            Some(&token),
            Some(json!({ "name": "new" })),
        )
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = app
        .send(Method::DELETE, "/api/tags/rust", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_delete_element() {
    let app = TestApp::with_defaults();
    let owner = app.user("owner").await;
    let other = app.user("other").await;
    let created = app.create(&owner, "e", &["keep"]).await;
    let uri = format!("/api/elements/{}", created["id"]);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&other), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&owner), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::GET, "/api/tags/keep", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_me_resolves_key() {
    let app = TestApp::with_defaults();
    let token = app.user("alice").await;

    let (status, me) = app
        .send(Method::POST, "/api/me", None, Some(json!({ "key": token })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert!(me.get("password").is_none());
    assert!(me.get("password_hash").is_none());

    let (status, _) = app
        .send(Method::POST, "/api/me", None, Some(json!({ "key": "bogus" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_login_with_wrong_password() {
    let app = TestApp::with_defaults();
    app.user("alice").await;
    let (status, body) = app
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_user_visibility() {
    let app = TestApp::with_defaults();
    let alice = app.user("alice").await;
    let _bob = app.user("bob").await;

    let (status, listed) = app.send(Method::GET, "/api/users", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["results"][0]["username"], "alice");
    let alice_id = listed["results"][0]["id"].as_i64().unwrap();

    let admin = app
        .state
        .service
        .create_admin(UserCreate {
            username: "root".into(),
            password: "secret".into(),
        })
        .await
        .unwrap();
    let admin_key = app.state.service.login("root", "secret").await.unwrap();
    let (_, everyone) = app
        .send(Method::GET, "/api/users", Some(&admin_key), None)
        .await;
    assert_eq!(everyone["count"], 3);

    let (status, _) = app
        .send(
            Method::GET,
            &format!("/api/users/{}", admin.id),
            Some(&alice),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, renamed) = app
        .send(
            Method::PATCH,
            &format!("/api/users/{alice_id}"),
            Some(&alice),
            Some(json!({ "username": "alicia" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(renamed["username"], "alicia");
    assert_eq!(renamed["is_admin"], false);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = TestApp::with_defaults();
    let token = app.user("owner").await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/elements")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Token {token}"))
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(
            Method::POST,
            "/api/elements",
            Some(&token),
            Some(json!({ "title": "x".repeat(501) })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation");
}

#[tokio::test]
async fn test_unparsable_path_id_gets_json_error() {
    let app = TestApp::with_defaults();
    let token = app.user("owner").await;

    let request = Request::builder()
        .uri("/api/elements/abc")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "validation");
    assert!(body["message"].as_str().unwrap().contains("abc"));

    for (method, uri) in [
        (Method::PATCH, "/api/elements/abc"),
        (Method::DELETE, "/api/elements/abc"),
        (Method::GET, "/api/users/abc"),
        (Method::PATCH, "/api/users/abc"),
    ] {
        let (status, body) = app
            .send(method, uri, Some(&token), Some(json!({})))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "validation", "{uri}");
    }
}
