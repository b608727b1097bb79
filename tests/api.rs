//! End-to-end tests for the HTTP API

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chirpy::{app::build_app, state::AppState};
use http_body_util::BodyExt; // for .collect().await
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot`

fn test_app() -> (Router, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::fake(dir.path().join("database.json"));
    (build_app(state), dir)
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, auth: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(auth) = auth {
        builder = builder.header("Authorization", auth);
    }
    builder.body(Body::empty()).unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn register_and_login(app: &Router, email: &str, password: &str) -> Value {
    let creds = json!({ "email": email, "password": password });
    let (status, _) = send(app, json_request("POST", "/api/users", None, creds.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(app, json_request("POST", "/api/login", None, creds)).await;
    assert_eq!(status, StatusCode::OK);
    body
}

#[tokio::test]
async fn test_healthz() {
    let (app, _dir) = test_app();
    let response = app.oneshot(empty_request("GET", "/api/healthz", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_register_hides_password() {
    let (app, _dir) = test_app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/users", None, json!({ "email": "a@x.com", "password": "pw1" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["id"], 1);
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["is_chirpy_red"], false);
    assert!(body.get("password").is_none());
    assert!(body.get("password_hash").is_none());
}

#[tokio::test]
async fn test_login_refresh_revoke_flow() {
    let (app, _dir) = test_app();
    let creds = json!({ "email": "a@x.com", "password": "pw1" });
    send(&app, json_request("POST", "/api/users", None, creds)).await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/login", None, json!({ "email": "a@x.com", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, login) = send(
        &app,
        json_request("POST", "/api/login", None, json!({ "email": "a@x.com", "password": "pw1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = format!("Bearer {}", login["refresh_token"].as_str().unwrap());

    let (status, body) = send(&app, empty_request("POST", "/api/refresh", Some(&refresh))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, _) = send(&app, empty_request("POST", "/api/revoke", Some(&refresh))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, empty_request("POST", "/api/refresh", Some(&refresh))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_chirp_lifecycle_and_ownership() {
    let (app, _dir) = test_app();
    let alice = register_and_login(&app, "alice@x.com", "pw").await;
    let bob = register_and_login(&app, "bob@x.com", "pw").await;
    let alice_auth = format!("Bearer {}", alice["token"].as_str().unwrap());
    let bob_auth = format!("Bearer {}", bob["token"].as_str().unwrap());

    let (status, chirp) = send(
        &app,
        json_request(
            "POST",
            "/api/chirps",
            Some(&alice_auth),
            json!({ "body": "what a Kerfuffle today" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(chirp["body"], "what a **** today");
    assert_eq!(chirp["author_id"], alice["id"]);
    let uri = format!("/api/chirps/{}", chirp["id"]);

    let (status, fetched) = send(&app, empty_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, chirp);

    let (status, _) = send(&app, empty_request("DELETE", &uri, Some(&bob_auth))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, empty_request("DELETE", &uri, Some(&alice_auth))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, empty_request("GET", &uri, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, empty_request("DELETE", &uri, Some(&alice_auth))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_chirp_requires_access_token() {
    let (app, _dir) = test_app();
    let user = register_and_login(&app, "a@x.com", "pw").await;
    let body = json!({ "body": "hello" });

    let (status, _) = send(&app, json_request("POST", "/api/chirps", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let refresh = format!("Bearer {}", user["refresh_token"].as_str().unwrap());
    let (status, _) =
        send(&app, json_request("POST", "/api/chirps", Some(&refresh), body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/chirps", Some("Bearer not.a.jwt"), body),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_too_long_chirp_rejected() {
    let (app, _dir) = test_app();
    let user = register_and_login(&app, "a@x.com", "pw").await;
    let auth = format!("Bearer {}", user["token"].as_str().unwrap());

    let (status, body) = send(
        &app,
        json_request("POST", "/api/chirps", Some(&auth), json!({ "body": "x".repeat(141) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Chirp is too long");

    let (status, list) = send(&app, empty_request("GET", "/api/chirps", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_list_chirps_filter_and_sort() {
    let (app, _dir) = test_app();
    let alice = register_and_login(&app, "alice@x.com", "pw").await;
    let bob = register_and_login(&app, "bob@x.com", "pw").await;
    for (user, text) in [(&alice, "a1"), (&bob, "b1"), (&alice, "a2")] {
        let auth = format!("Bearer {}", user["token"].as_str().unwrap());
        let (status, _) = send(
            &app,
            json_request("POST", "/api/chirps", Some(&auth), json!({ "body": text })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let bodies = |v: Value| {
        v.as_array()
            .unwrap()
            .iter()
            .map(|c| c["body"].as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    };

    let (_, all) = send(&app, empty_request("GET", "/api/chirps", None)).await;
    assert_eq!(bodies(all), ["a1", "b1", "a2"]);

    let (_, desc) = send(&app, empty_request("GET", "/api/chirps?sort=desc", None)).await;
    assert_eq!(bodies(desc), ["a2", "b1", "a1"]);

    let uri = format!("/api/chirps?author_id={}&sort=asc", alice["id"]);
    let (_, mine) = send(&app, empty_request("GET", &uri, None)).await;
    assert_eq!(bodies(mine), ["a1", "a2"]);

    let (status, _) = send(&app, empty_request("GET", "/api/chirps?sort=sideways", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_user() {
    let (app, _dir) = test_app();
    let user = register_and_login(&app, "a@x.com", "pw1").await;
    let auth = format!("Bearer {}", user["token"].as_str().unwrap());

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            "/api/users",
            Some(&auth),
            json!({ "email": "new@x.com", "password": "pw2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "new@x.com");

    let (status, _) = send(
        &app,
        json_request("POST", "/api/login", None, json!({ "email": "new@x.com", "password": "pw2" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        json_request("PUT", "/api/users", None, json!({ "email": "x@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_polka_webhook() {
    let (app, _dir) = test_app();
    let user = register_and_login(&app, "a@x.com", "pw").await;
    let upgrade = json!({ "event": "user.upgraded", "data": { "user_id": user["id"] } });

    let (status, _) = send(
        &app,
        json_request("POST", "/api/polka/webhooks", Some("ApiKey wrong"), upgrade.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/polka/webhooks",
            Some("ApiKey test-polka-key"),
            json!({ "event": "user.payment_failed", "data": { "user_id": 999 } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            "/api/polka/webhooks",
            Some("ApiKey test-polka-key"),
            json!({ "event": "user.upgraded", "data": { "user_id": 999 } }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        json_request("POST", "/api/polka/webhooks", Some("ApiKey test-polka-key"), upgrade),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, login) = send(
        &app,
        json_request("POST", "/api/login", None, json!({ "email": "a@x.com", "password": "pw" })),
    )
    .await;
    assert_eq!(login["is_chirpy_red"], true);
}

#[tokio::test]
async fn test_metrics_count_app_hits() {
    let (app, _dir) = test_app();
    for _ in 0..3 {
        // the static dir does not exist, so these are 404s, but still counted
        app.clone()
            .oneshot(empty_request("GET", "/app/index.html", None))
            .await
            .unwrap();
    }
    let response = app
        .clone()
        .oneshot(empty_request("GET", "/admin/metrics", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let html = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&html).contains("visited 3 times"));

    let response = app
        .clone()
        .oneshot(empty_request("POST", "/api/reset", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let response = app.oneshot(empty_request("GET", "/admin/metrics", None)).await.unwrap();
    let html = response.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&html).contains("visited 0 times"));
}

#[tokio::test]
async fn test_polka_webhook_without_user_data() {
    let (app, _dir) = test_app();
    let key = Some("ApiKey test-polka-key");

    for ignored in [
        json!({ "event": "user.payment_failed" }),
        json!({ "event": "user.payment_failed", "data": {} }),
        json!({ "event": "user.payment_failed", "data": null }),
    ] {
        let (status, _) = send(&app, json_request("POST", "/api/polka/webhooks", key, ignored)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    for upgrade in [
        json!({ "event": "user.upgraded" }),
        json!({ "event": "user.upgraded", "data": {} }),
    ] {
        let (status, body) =
            send(&app, json_request("POST", "/api/polka/webhooks", key, upgrade)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let (app, _dir) = test_app();
    let user = register_and_login(&app, "a@x.com", "pw").await;
    let auth = format!("Bearer {}", user["token"].as_str().unwrap());

    let cases = [
        json_request("POST", "/api/chirps", Some(&auth), json!({ "body": 5 })),
        json_request("POST", "/api/users", None, json!({ "email": 1 })),
        json_request("POST", "/api/login", None, json!("not an object")),
        json_request("PUT", "/api/users", Some(&auth), json!({ "password": false })),
        json_request("POST", "/api/polka/webhooks", Some("ApiKey test-polka-key"), json!({})),
        empty_request("GET", "/api/chirps/abc", None),
        empty_request("DELETE", "/api/chirps/abc", Some(&auth)),
    ];
    for req in cases {
        let uri = req.uri().to_string();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{uri}");
    }

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/api/users")
        .body(Body::from(r#"{"email":"b@x.com","password":"pw"}"#))
        .unwrap();
    let (status, body) = send(&app, no_content_type).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_non_numeric_author_id_lists_everything() {
    let (app, _dir) = test_app();
    let alice = register_and_login(&app, "alice@x.com", "pw").await;
    let bob = register_and_login(&app, "bob@x.com", "pw").await;
    for (user, text) in [(&alice, "a1"), (&bob, "b1")] {
        let auth = format!("Bearer {}", user["token"].as_str().unwrap());
        send(&app, json_request("POST", "/api/chirps", Some(&auth), json!({ "body": text }))).await;
    }

    for uri in ["/api/chirps?author_id=abc", "/api/chirps?author_id=", "/api/chirps?author_id=-1"] {
        let (status, body) = send(&app, empty_request("GET", uri, None)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
        assert_eq!(body.as_array().map(Vec::len), Some(2), "{uri}");
    }
}
