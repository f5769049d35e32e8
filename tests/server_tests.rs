//! Socket-level tests against a server on an ephemeral port.

use serde_json::{json, Value};
use std::time::Duration;

use route_registrar::config::ServerConfig;

mod common;

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_serves_routes_over_tcp() {
    let (addr, shutdown, handle) = common::start_server(ServerConfig::default()).await;
    let client = client();

    let res = client
        .post(format!("http://{}/api/cases/connectors", addr))
        .json(&json!({"id": "sw", "name": "Swimlane", "type": ".swimlane", "fields": null}))
        .send()
        .await
        .expect("server unreachable");
    assert_eq!(res.status(), 200);
    assert!(res.headers().contains_key("x-request-id"));

    let res = client
        .get(format!("http://{}/api/cases/connectors", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body.as_array().map(Vec::len), Some(1));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("server did not shut down")
        .unwrap();
}

#[tokio::test]
async fn test_error_body_over_tcp() {
    let (addr, shutdown, handle) = common::start_server(ServerConfig::default()).await;

    let res = client()
        .get(format!("http://{}/api/cases/connectors/missing", addr))
        .header("x-request-id", "trace-me")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(res.headers()["x-request-id"], "trace-me");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body, json!({"message": "Connector 'missing' not found"}));

    shutdown.trigger();
    let _ = tokio::time::timeout(Duration::from_secs(5), handle).await;
}
