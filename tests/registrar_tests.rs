//! End-to-end behavior of the registrar through the axum adapter.

use axum::http::{Method, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use route_registrar::codec::Schema;
use route_registrar::http::{register_routes, AbortSignal, AxumServerSetup, HttpServer};
use route_registrar::routing::{
    EndpointDescriptor, HandlerResources, Reply, RouteOptions, RouteRepository,
};
use route_registrar::{DomainError, RouteError, UpstreamError};

mod common;
use common::{request, send};

#[derive(Default)]
struct TestDeps {
    calls: AtomicUsize,
    slow_abort: Mutex<Option<AbortSignal>>,
}

fn descriptor<F, Fut>(endpoint: &str, handler: F) -> EndpointDescriptor<TestDeps>
where
    F: Fn(HandlerResources<TestDeps>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Reply, RouteError>> + Send + 'static,
{
    EndpointDescriptor::new(endpoint, handler).unwrap()
}

fn repository() -> RouteRepository<TestDeps> {
    let path_item = Schema::exact()
        .required("path", Schema::exact().required("item_id", Schema::String).build())
        .build();
    let search = Schema::exact()
        .required(
            "query",
            Schema::exact()
                .required("perPage", Schema::NumberFromString)
                .optional("tag", Schema::union([Schema::String, Schema::array(Schema::String)]))
                .build(),
        )
        .build();

    RouteRepository::new()
        .add(descriptor("GET /ping", |r| async move {
            r.dependencies.calls.fetch_add(1, Ordering::SeqCst);
            Reply::ok(&json!({"pong": true}))
        }))
        .unwrap()
        .add(
            descriptor("GET /items/:item_id", |r| async move {
                let id = r.params.path_str("item_id")?.to_string();
                Ok(Reply::Json(json!({"id": id, "requestId": &*r.context.request_id})))
            })
            .with_params(path_item),
        )
        .unwrap()
        .add(
            descriptor("GET /search", |r| async move {
                Ok(Reply::Json(r.params.into_value()))
            })
            .with_params(search),
        )
        .unwrap()
        .add(descriptor("POST /fail/domain", |_| async {
            Err(DomainError::not_found("No such thing").into())
        }))
        .unwrap()
        .add(descriptor("POST /fail/upstream", |_| async {
            Err(UpstreamError::new(503, "index unavailable").into())
        }))
        .unwrap()
        .add(descriptor("POST /fail/aborted", |_| async {
            Err(UpstreamError::request_aborted("Request was aborted").into())
        }))
        .unwrap()
        .add(descriptor("POST /fail/aborted-direct", |_| async {
            Err(RouteError::Aborted)
        }))
        .unwrap()
        .add(descriptor("POST /fail/unexpected", |_| async {
            Err(RouteError::unexpected("kaboom"))
        }))
        .unwrap()
        .add(descriptor("POST /fail/panic", |_| async {
            let reason: Option<&str> = None;
            Ok(Reply::Json(json!(reason.expect("handler invariant broken"))))
        }))
        .unwrap()
        .add(descriptor("GET /slow", |r| async move {
            *r.dependencies.slow_abort.lock().unwrap() = Some(r.context.abort.clone());
            tokio::time::sleep(Duration::from_secs(3)).await;
            Reply::ok(&json!({"late": true}))
        }))
        .unwrap()
        .add(descriptor("DELETE /things/{id}", |_| async { Ok(Reply::NoContent) }).with_params(
            Schema::exact()
                .required("path", Schema::exact().required("id", Schema::String).build())
                .build(),
        ))
        .unwrap()
        .add(
            descriptor("POST /upload", |r| async move {
                Ok(Reply::Json(r.params.body().cloned().unwrap_or(Value::Null)))
            })
            .with_params(Schema::exact().optional("body", Schema::Unknown).build())
            .with_options(RouteOptions {
                max_body_bytes: Some(16),
                ..RouteOptions::default()
            }),
        )
        .unwrap()
        .add(
            descriptor("GET /secret", |_| async { Reply::ok(&json!({"secret": 42})) })
                .with_options(RouteOptions::tagged(["access:admin"])),
        )
        .unwrap()
}

fn router_with(setup: AxumServerSetup, deps: Arc<TestDeps>) -> Router {
    let routes = register_routes(&setup, &repository(), deps).into_router();
    HttpServer::new(routes).router()
}

fn router() -> Router {
    router_with(AxumServerSetup::new(), Arc::new(TestDeps::default()))
}

#[tokio::test]
async fn test_route_without_params_accepts_bare_request() {
    let deps = Arc::new(TestDeps::default());
    let router = router_with(AxumServerSetup::new(), Arc::clone(&deps));

    let (status, body) = send(&router, request(Method::GET, "/ping", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"pong": true}));
    assert_eq!(deps.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_undeclared_input_is_rejected_before_handler() {
    let deps = Arc::new(TestDeps::default());
    let router = router_with(AxumServerSetup::new(), Arc::clone(&deps));

    let (status, body) = send(&router, request(Method::GET, "/ping?debug=1", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Excess key \"query\" found at (root)");
    assert_eq!(deps.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_path_params_are_decoded() {
    let (status, body) = send(&router(), request(Method::GET, "/items/a%20b", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], "a b");
}

#[tokio::test]
async fn test_request_id_reaches_handler() {
    let req = axum::http::Request::get("/items/1")
        .header("x-request-id", "req-123")
        .body(axum::body::Body::empty())
        .unwrap();
    let (_, body) = send(&router(), req).await;
    assert_eq!(body["requestId"], "req-123");
}

#[tokio::test]
async fn test_query_strings_convert_to_numbers() {
    let (status, body) = send(&router(), request(Method::GET, "/search?perPage=25&tag=a&tag=b", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"query": {"perPage": 25, "tag": ["a", "b"]}}));

    let (status, body) = send(&router(), request(Method::GET, "/search?perPage=lots", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let message = body["message"].as_str().unwrap();
    assert!(message.starts_with("Invalid value \"lots\" supplied to query/perPage"), "{}", message);
}

#[tokio::test]
async fn test_missing_required_query_is_rejected() {
    let (status, body) = send(&router(), request(Method::GET, "/search", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("undefined supplied to query"));
}

#[tokio::test]
async fn test_error_classification() {
    let router = router();

    let (status, body) = send(&router, request(Method::POST, "/fail/domain", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"message": "No such thing"}));

    let (status, body) = send(&router, request(Method::POST, "/fail/upstream", None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({"message": "index unavailable"}));

    let (status, body) = send(&router, request(Method::POST, "/fail/aborted", None)).await;
    assert_eq!(status.as_u16(), 499);
    assert_eq!(body, json!({"message": "Client closed request"}));

    let (status, body) = send(&router, request(Method::POST, "/fail/aborted-direct", None)).await;
    assert_eq!(status.as_u16(), 499);
    assert_eq!(body, json!({"message": "Client closed request"}));

    let (status, body) = send(&router, request(Method::POST, "/fail/unexpected", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "kaboom"}));
}

#[tokio::test]
async fn test_panicking_handler_becomes_500() {
    let (status, body) = send(&router(), request(Method::POST, "/fail/panic", None)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"message": "handler invariant broken"}));
}

#[tokio::test]
async fn test_no_content_reply() {
    let (status, body) = send(&router(), request(Method::DELETE, "/things/7", None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_body_limit_and_unparsable_body() {
    let router = router();

    let (status, body) = send(&router, request(Method::POST, "/upload", Some(json!({"a": 1})))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"a": 1}));

    let big = json!({"payload": "x".repeat(64)});
    let (status, _) = send(&router, request(Method::POST, "/upload", Some(big))).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);

    let req = axum::http::Request::post("/upload")
        .body(axum::body::Body::from("{oops"))
        .unwrap();
    let (status, body) = send(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().starts_with("Invalid value unparsable body"));
}

#[tokio::test]
async fn test_wrong_method_and_unknown_path() {
    let router = router();
    let (status, _) = send(&router, request(Method::POST, "/ping", None)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _) = send(&router, request(Method::GET, "/nowhere", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_tag_requires_api_key_when_configured() {
    let router = router_with(
        AxumServerSetup::new().with_admin_api_key("s3cret"),
        Arc::new(TestDeps::default()),
    );

    let (status, body) = send(&router, request(Method::GET, "/secret", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"message": "Unauthorized"}));

    let req = axum::http::Request::get("/secret")
        .header("authorization", "Bearer wrong")
        .body(axum::body::Body::empty())
        .unwrap();
    assert_eq!(send(&router, req).await.0, StatusCode::UNAUTHORIZED);

    let req = axum::http::Request::get("/secret")
        .header("authorization", "Bearer s3cret")
        .body(axum::body::Body::empty())
        .unwrap();
    let (status, body) = send(&router, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"secret": 42}));

    // Untagged routes are unaffected.
    assert_eq!(send(&router, request(Method::GET, "/ping", None)).await.0, StatusCode::OK);
}

#[tokio::test]
async fn test_admin_tag_is_open_without_api_key() {
    let (status, _) = send(&router(), request(Method::GET, "/secret", None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_slow_handler_times_out_with_json_error() {
    let deps = Arc::new(TestDeps::default());
    let router = router_with(
        AxumServerSetup::new().with_request_timeout(Duration::from_millis(100)),
        Arc::clone(&deps),
    );

    let (status, body) = send(&router, request(Method::GET, "/slow", None)).await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
    assert_eq!(body, json!({"message": "Request timed out"}));

    let signal = deps.slow_abort.lock().unwrap().take().expect("handler ran");
    assert!(!signal.is_aborted());

    // Fast routes are unaffected by the limit.
    assert_eq!(send(&router, request(Method::GET, "/ping", None)).await.0, StatusCode::OK);
}
