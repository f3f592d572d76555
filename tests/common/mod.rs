//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use movies_api::config::ApiConfig;
use movies_api::http::ApiServer;
use movies_api::routes::store::DocumentStore;

pub const CLIENT: &str = "203.0.113.7:51000";

/// Config with a fixed secret and defaults elsewhere.
pub fn test_config() -> ApiConfig {
    let mut config = ApiConfig::default();
    config.auth.jwt_secret = "integration-secret".to_string();
    config
}

/// A fully layered app plus a handle on its store.
pub fn app(config: ApiConfig) -> (Router, Arc<DocumentStore>) {
    let server = ApiServer::new(config);
    let addr: SocketAddr = CLIENT.parse().unwrap();
    (server.router().layer(MockConnectInfo(addr)), server.store())
}

pub fn json_request(method: Method, path: &str, body: Option<Value>, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request and return status, headers and the JSON body (`Null` when empty).
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, headers, body)
}

/// Create an account and sign in; returns the token.
pub async fn signup_and_signin(app: &Router, email: &str) -> String {
    let (status, _, _) = send(
        app,
        json_request(
            Method::POST,
            "/signup",
            Some(json!({"name": "Tester", "email": email, "password": "hunter22"})),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _, body) = send(
        app,
        json_request(
            Method::POST,
            "/signin",
            Some(json!({"email": email, "password": "hunter22"})),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_string()
}

pub fn movie(movie_id: i64) -> Value {
    json!({
        "country": "USA",
        "director": "Jane Doe",
        "duration": 104,
        "year": "2001",
        "description": "A film about films",
        "image": "https://example.com/poster.jpg",
        "trailerLink": "https://example.com/trailer",
        "thumbnail": "https://example.com/thumb.jpg",
        "movieId": movie_id,
        "nameRU": "Фильм",
        "nameEN": "Film"
    })
}
