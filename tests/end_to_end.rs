//! End-to-end run against a real listener.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::net::TcpListener;

use movies_api::http::ApiServer;
use movies_api::lifecycle::Shutdown;

mod common;

#[tokio::test]
async fn test_signup_signin_and_list_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let server = ApiServer::new(common::test_config());
    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.clone();
    let handle = tokio::spawn(async move { server.run(listener, &server_shutdown).await });

    let client = reqwest::Client::new();
    let res = client
        .post(format!("{base}/signup"))
        .json(&json!({"name": "Remote", "email": "remote@example.com", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    assert!(res.headers().contains_key("x-request-id"));

    let res = client
        .post(format!("{base}/signin"))
        .json(&json!({"email": "remote@example.com", "password": "pw"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let token = res.json::<Value>().await.unwrap()["token"].as_str().unwrap().to_string();

    let res = client
        .get(format!("{base}/movies"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.json::<Value>().await.unwrap(), json!([]));

    let res = client
        .get(format!("{base}/movies"))
        .header("Authorization", "Bearer garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
    assert_eq!(
        res.json::<Value>().await.unwrap(),
        json!({"message": "Authorization required"})
    );

    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
}
