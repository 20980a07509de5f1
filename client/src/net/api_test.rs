use super::*;

use std::collections::HashMap;

use axum::extract::{Path, Query};
use axum::http::HeaderMap;
use axum::routing::{delete, get, post};
use axum::{Json, Router};

async fn spawn_backend(router: Router) -> ApiClient {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, Router::new().nest("/api", router)).await.unwrap();
    });
    let config = ClientConfig { api_base_url: format!("http://{addr}/api/"), ..ClientConfig::default() };
    ApiClient::new(&config).unwrap()
}

fn auth_header(headers: &HeaderMap) -> serde_json::Value {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map_or(serde_json::Value::Null, |v| serde_json::Value::String(v.to_owned()))
}

// =============================================================================
// Pure helpers
// =============================================================================

#[test]
fn encode_segment_passes_unreserved_and_escapes_rest() {
    assert_eq!(encode_segment("hello-world_1.0~x"), "hello-world_1.0~x");
    assert_eq!(encode_segment("a b/c?d"), "a%20b%2Fc%3Fd");
    assert_eq!(encode_segment("đ"), "%C4%91");
}

#[test]
fn resource_paths_format_expected() {
    assert_eq!(post_path("my-post"), "/blog/posts/my-post");
    assert_eq!(project_path("42"), "/projects/42");
    assert_eq!(contact_path("c 1"), "/contact/c%201");
}

#[test]
fn extract_error_message_prefers_message_then_error() {
    assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, r#"{"message":"bad title"}"#), "bad title");
    assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, r#"{"error":"nope"}"#), "nope");
    assert_eq!(extract_error_message(StatusCode::BAD_REQUEST, r#"{"error":{"message":"nested"}}"#), "nested");
}

#[test]
fn extract_error_message_falls_back_to_reason() {
    assert_eq!(extract_error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    assert_eq!(extract_error_message(StatusCode::UNAUTHORIZED, r#"{"message":"  "}"#), "Unauthorized");
    let odd = StatusCode::from_u16(599).unwrap();
    assert_eq!(extract_error_message(odd, "<html>"), "Request failed with status 599");
}

#[test]
fn new_trims_trailing_slash_and_starts_without_token() {
    let config = ClientConfig { api_base_url: "http://example.test/api/".into(), ..ClientConfig::default() };
    let client = ApiClient::new(&config).unwrap();
    assert_eq!(client.base_url(), "http://example.test/api");
    assert_eq!(client.token(), None);
}

// =============================================================================
// HTTP behavior
// =============================================================================

#[tokio::test]
async fn bearer_token_is_attached_and_removed() {
    let router = Router::new().route(
        "/auth/me",
        get(|headers: HeaderMap| async move {
            Json(serde_json::json!({ "data": { "id": 1, "email": "a@x.io", "name": auth_header(&headers) } }))
        }),
    );
    let client = spawn_backend(router).await;

    let anonymous = client.current_user().await.unwrap();
    assert_eq!(anonymous.name, None);

    client.set_token(Some("tok-123".into()));
    let authed = client.current_user().await.unwrap();
    assert_eq!(authed.name.as_deref(), Some("Bearer tok-123"));

    client.set_token(None);
    let cleared = client.current_user().await.unwrap();
    assert_eq!(cleared.name, None);
}

#[tokio::test]
async fn non_success_status_becomes_api_error_with_server_message() {
    let router = Router::new().route(
        "/auth/login",
        post(|| async {
            (axum::http::StatusCode::UNAUTHORIZED, Json(serde_json::json!({ "message": "Invalid credentials" })))
        }),
    );
    let client = spawn_backend(router).await;

    let err = client.login("a@x.io", "wrong-pass").await.unwrap_err();
    assert_eq!(err, ClientError::Api { status: 401, message: "Invalid credentials".into() });
    assert!(err.is_unauthorized());
}

#[tokio::test]
async fn login_posts_credentials_and_unwraps_envelope() {
    let router = Router::new().route(
        "/auth/login",
        post(|Json(body): Json<serde_json::Value>| async move {
            Json(serde_json::json!({
                "data": {
                    "user": { "id": "u1", "email": body["email"] },
                    "token": format!("token-for-{}", body["password"].as_str().unwrap_or_default()),
                }
            }))
        }),
    );
    let client = spawn_backend(router).await;

    let payload = client.login("ada@example.com", "secret1").await.unwrap();
    assert_eq!(payload.user.email, "ada@example.com");
    assert_eq!(payload.token, "token-for-secret1");
    assert_eq!(payload.expires_at, None);
}

#[tokio::test]
async fn list_posts_sends_filters_and_decodes_page() {
    let router = Router::new().route(
        "/blog/posts",
        get(|Query(params): Query<HashMap<String, String>>| async move {
            Json(serde_json::json!({
                "data": [{ "id": 1, "title": params.get("search").cloned().unwrap_or_default(), "slug": "s" }],
                "count": 1,
                "pagination": { "page": params.get("page").and_then(|p| p.parse::<u32>().ok()).unwrap_or(1),
                                "limit": 10, "total": 1, "totalPages": 1 }
            }))
        }),
    );
    let client = spawn_backend(router).await;

    let query = PostQuery { page: Some(3), search: Some("rust async".into()), ..PostQuery::default() };
    let page = client.list_posts(&query).await.unwrap();
    assert_eq!(page.items[0].title, "rust async");
    assert_eq!(page.pagination.page, 3);
}

#[tokio::test]
async fn get_post_encodes_slug() {
    let router = Router::new().route(
        "/blog/posts/{slug}",
        get(|Path(slug): Path<String>| async move {
            Json(serde_json::json!({ "data": { "id": "p1", "title": slug, "slug": "x" } }))
        }),
    );
    let client = spawn_backend(router).await;

    let post = client.get_post("hello world").await.unwrap();
    assert_eq!(post.title, "hello world");
}

#[tokio::test]
async fn delete_ignores_empty_body() {
    let router = Router::new().route("/projects/{id}", delete(|| async { axum::http::StatusCode::NO_CONTENT }));
    let client = spawn_backend(router).await;
    client.delete_project("9").await.unwrap();
}

#[tokio::test]
async fn missing_route_reports_reason_phrase() {
    let client = spawn_backend(Router::new().route("/health", get(|| async { "ok" }))).await;
    let err = client.list_tags().await.unwrap_err();
    assert_eq!(err, ClientError::Api { status: 404, message: "Not Found".into() });
}

#[tokio::test]
async fn malformed_success_body_is_api_error() {
    let router = Router::new().route("/analytics/summary", get(|| async { "not json" }));
    let client = spawn_backend(router).await;
    let err = client.analytics_summary().await.unwrap_err();
    assert_eq!(err.status(), Some(200));
    assert!(err.to_string().contains("invalid response body"));
}

#[tokio::test]
async fn unreachable_backend_is_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig { api_base_url: format!("http://{addr}/api"), ..ClientConfig::default() };
    let client = ApiClient::new(&config).unwrap();
    let err = client.list_projects().await.unwrap_err();
    assert!(matches!(err, ClientError::Network(_)), "got {err:?}");
    assert_eq!(err.user_message(), "An error occurred");
}
