use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use babylog_api::{
    build_router,
    config::{Config, StoreBackend},
    store::MemoryStore,
    AppState,
};

fn app() -> Router {
    let config = Config {
        store_backend: StoreBackend::Memory,
        database_url: None,
        jwt_secret: "integration-secret".into(),
        jwt_expiry_seconds: 3600,
        bcrypt_cost: 4,
        invitation_expiry_hours: 24,
        host: "127.0.0.1".into(),
        port: 0,
        app_base_url: "http://localhost".into(),
    };
    build_router(AppState::new(Arc::new(MemoryStore::new()), config))
}

async fn call(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        req = req.header("Authorization", format!("Bearer {token}"));
    }
    let req = match body {
        Some(body) => req
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => req.body(Body::empty()).unwrap(),
    };

    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, email: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": email, "password": "long enough", "name": "Parent" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["access_token"].as_str().unwrap().to_string()
}

/// Registers a user with a family and one child; returns (token, child id).
async fn family_with_child(app: &Router, email: &str) -> (String, String) {
    let token = register(app, email).await;
    let (status, _) = call(app, Method::POST, "/family", Some(&token), Some(json!({ "name": "Home" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, child) = call(app, Method::POST, "/children", Some(&token), Some(json!({ "name": "Ada" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    (token, child["id"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, _) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn register_rejects_duplicates_and_login_works() {
    let app = app();
    register(&app, "pat@example.com").await;

    let (status, _) = call(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "email": "PAT@example.com", "password": "long enough", "name": "Pat" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = call(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": "pat@example.com", "password": "long enough" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token = body["access_token"].as_str().unwrap();

    let (status, me) = call(&app, Method::GET, "/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], "pat@example.com");

    let (status, _) = call(&app, Method::GET, "/auth/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn records_need_a_family() {
    let app = app();
    let token = register(&app, "solo@example.com").await;
    let (status, _) = call(&app, Method::GET, "/children", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn sleep_session_lifecycle() {
    let app = app();
    let (token, child) = family_with_child(&app, "night@example.com").await;
    let base = format!("/children/{child}/sleeps");

    let (status, body) = call(&app, Method::GET, &format!("{base}/status"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sleeping"], false);

    let (status, started) = call(&app, Method::POST, &format!("{base}/start"), Some(&token), None).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(started["ended_at"].is_null());

    let (status, _) = call(&app, Method::POST, &format!("{base}/start"), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = call(&app, Method::GET, &format!("{base}/status"), Some(&token), None).await;
    assert_eq!(body["sleeping"], true);
    assert_eq!(body["session"]["id"], started["id"]);

    let (status, ended) = call(&app, Method::POST, &format!("{base}/end"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ended["id"], started["id"]);
    assert!(!ended["ended_at"].is_null());

    let (status, _) = call(&app, Method::POST, &format!("{base}/end"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, list) = call(&app, Method::GET, &base, Some(&token), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn stats_and_graphs() {
    let app = app();
    let (token, child) = family_with_child(&app, "stats@example.com").await;
    let an_hour_ago = (Utc::now() - Duration::hours(1)).to_rfc3339();

    for amount in [3.0, 5.0] {
        let (status, _) = call(
            &app,
            Method::POST,
            &format!("/children/{child}/feedings"),
            Some(&token),
            Some(json!({ "type": "bottle", "amount": amount, "recorded_at": an_hour_ago })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/children/{child}/feedings"),
        Some(&token),
        Some(json!({ "type": "bottle", "amount": 100.0, "recorded_at": (Utc::now() - Duration::days(3)).to_rfc3339() })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, stats) = call(&app, Method::GET, &format!("/children/{child}/feedings/stats"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"]["bottle"], 8.0);
    assert_eq!(stats["range"]["bottle"], 2);
    assert_eq!(stats["mean"]["bottle"], 4.0);
    assert_eq!(stats["data"].as_array().unwrap().len(), 2);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/children/{child}/wastes"),
        Some(&token),
        Some(json!({ "type": 2, "recorded_at": an_hour_ago })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, graph) = call(&app, Method::GET, &format!("/children/{child}/wastes/graph"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = graph["dataset"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["type"], 2);
    assert_eq!(rows[0]["count"], 1);

    let (status, sleeps) = call(&app, Method::GET, &format!("/children/{child}/sleeps/stats"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(sleeps["mean"].is_null());

    let (status, _) = call(&app, Method::GET, &format!("/children/{child}/feedings/graph"), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn invited_member_shares_children_and_strangers_do_not() {
    let app = app();
    let (owner, child) = family_with_child(&app, "owner@example.com").await;
    let partner = register(&app, "partner@example.com").await;

    let (status, invitation) = call(
        &app,
        Method::POST,
        "/family/invitations",
        Some(&owner),
        Some(json!({ "email": "partner@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, mine) = call(&app, Method::GET, "/invitations", Some(&partner), None).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);

    let code = invitation["code"].as_str().unwrap();
    let (status, _) = call(
        &app,
        Method::POST,
        "/invitations/accept",
        Some(&partner),
        Some(json!({ "code": "wrong" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(
        &app,
        Method::POST,
        "/invitations/accept",
        Some(&partner),
        Some(json!({ "code": code })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&app, Method::GET, &format!("/children/{child}"), Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Ada");

    let (status, family) = call(&app, Method::GET, "/family", Some(&partner), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(family["members"].as_array().unwrap().len(), 2);

    let (stranger, _) = family_with_child(&app, "stranger@example.com").await;
    let (status, _) = call(&app, Method::GET, &format!("/children/{child}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(&app, Method::POST, &format!("/children/{child}/sleeps/start"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn negative_list_limit_is_a_bad_request() {
    let app = app();
    let (token, child) = family_with_child(&app, "limits@example.com").await;

    for kind in ["feedings", "sleeps", "wastes"] {
        let uri = format!("/children/{child}/{kind}?limit=-1");
        let (status, body) = call(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{kind}: {body}");

        let uri = format!("/children/{child}/{kind}?limit=0");
        let (status, body) = call(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().is_empty());
    }
}
