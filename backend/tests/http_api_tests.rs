//! End-to-end checks of the REST surface through the full router.

mod support;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tower::ServiceExt;

use purretys::http::{create_router, AppState};

fn app() -> Router {
    let state = AppState::new(support::test_repository(), support::test_settings());
    create_router(state)
}

async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

/// Register a user and return its access token.
async fn register(app: &Router, name: &str) -> String {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({
            "email": format!("{name}@example.com"),
            "username": name,
            "password": "correct-horse",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
    body["access_token"].as_str().unwrap().to_string()
}

async fn create_pet(app: &Router, token: &str, name: &str) -> i64 {
    let (status, body) = call(
        app,
        Method::POST,
        "/api/v1/pets",
        Some(token),
        Some(json!({ "name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create pet failed: {body}");
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_status() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"], "connected");

    let (status, body) = call(&app, Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["realtime"]["clients"], 0);
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/pets", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, _) = call(&app, Method::GET, "/api/v1/pets", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_refresh_and_logout() {
    let app = app();
    let access = register(&app, "alice").await;

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "correct-horse" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    let (status, _) = call(
        &app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "email": "alice@example.com", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = call(
        &app,
        Method::POST,
        "/api/v1/auth/refresh",
        None,
        Some(json!({ "refresh_token": refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].is_string());

    let (status, body) = call(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");

    let (status, _) = call(&app, Method::POST, "/api/v1/auth/logout", Some(&access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, "/api/v1/auth/me", Some(&access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_feed_with_empty_body_and_version_precondition() {
    let app = app();
    let token = register(&app, "alice").await;
    let pet = create_pet(&app, &token, "Mochi").await;

    let uri = format!("/api/v1/pets/{pet}/feed");
    let (status, body) = call(&app, Method::POST, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["cost"], 10);
    assert_eq!(body["version"], 2);

    let (status, body) = call(
        &app,
        Method::POST,
        &uri,
        Some(&token),
        Some(json!({ "food_type": "milk-bowl", "expected_version": 1 })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "VERSION_CONFLICT");
    assert_eq!(body["details"]["current_version"], 2);

    let (status, body) = call(
        &app,
        Method::POST,
        &uri,
        Some(&token),
        Some(json!({ "food_type": "lasagna" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_purchase_beyond_wallet_reports_amounts() {
    let app = app();
    let token = register(&app, "alice").await;
    let pet = create_pet(&app, &token, "Mochi").await;

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/items/6/purchase"),
        Some(&token),
        Some(json!({ "quantity": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INSUFFICIENT_FUNDS");
    assert_eq!(body["details"]["required"], 150);
    assert_eq!(body["details"]["available"], 100);

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/pets/{pet}/inventory"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_sharing_flow_over_http() {
    let app = app();
    let alice = register(&app, "alice").await;
    let bob = register(&app, "bob").await;
    let pet = create_pet(&app, &alice, "Mochi").await;

    // Bob cannot see the pet yet.
    let (status, _) = call(&app, Method::GET, &format!("/api/v1/pets/{pet}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/invite"),
        Some(&alice),
        Some(json!({ "email": "bob@example.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let invite_token = body["token"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/invitations/{invite_token}/accept"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["owners"].as_array().unwrap().len(), 2);

    let (status, body) = call(&app, Method::GET, "/api/v1/pets", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["id"], pet);

    // Accepting twice is refused.
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/invitations/{invite_token}/accept"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/messages"),
        Some(&bob),
        Some(json!({ "content": "hi Mochi" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/pets/{pet}/messages"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["content"], "hi Mochi");

    // The owner cannot leave; the co-owner can.
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/leave"),
        Some(&alice),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/leave"),
        Some(&bob),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&app, Method::GET, &format!("/api/v1/pets/{pet}"), Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_task_lifecycle_over_http() {
    let app = app();
    let token = register(&app, "alice").await;
    let pet = create_pet(&app, &token, "Mochi").await;

    let (status, task) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/tasks"),
        Some(&token),
        Some(json!({ "title": "Brush Mochi", "currency_reward": 20 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{task}");
    let task_id = task["id"].as_i64().unwrap();

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/pets/{pet}/tasks"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = call(
        &app,
        Method::POST,
        &format!("/api/v1/pets/{pet}/tasks/{task_id}/complete"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/api/v1/pets/{pet}/transactions"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body
        .as_array()
        .unwrap()
        .iter()
        .any(|tx| tx["kind"] == "task_reward"));
}

#[tokio::test]
async fn test_catalog_is_public() {
    let app = app();
    let (status, body) = call(&app, Method::GET, "/api/v1/items", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().iter().any(|i| i["slug"] == "catnip"));
}

#[tokio::test]
async fn test_pet_events_stream_ends_on_disconnect_all() {
    let state = AppState::new(support::test_repository(), support::test_settings());
    let hub = state.hub.clone();
    let app = create_router(state);
    let token = register(&app, "alice").await;
    let pet_id = create_pet(&app, &token, "Mochi").await;

    let (status, _) = call(&app, Method::GET, &format!("/api/v1/pets/{pet_id}/events"), None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri(format!("/api/v1/pets/{pet_id}/events"))
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(hub.stats().clients, 1);

    assert_eq!(hub.disconnect_all(), 1);
    let bytes = tokio::time::timeout(
        Duration::from_secs(5),
        to_bytes(response.into_body(), usize::MAX),
    )
    .await
    .expect("event stream should finish once clients are dropped")
    .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("event: connect"));
    assert!(text.contains("event: pet_metrics_update"));
}

/// Serve `app` on an ephemeral port.
async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Send a WebSocket upgrade request and return the status line with the
/// reader positioned after the response headers.
async fn upgrade(addr: SocketAddr, query: &str) -> (String, BufReader<TcpStream>) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET /api/v1/ws?{query} HTTP/1.1\r\n\
         Host: {addr}\r\n\
         Connection: Upgrade\r\n\
         Upgrade: websocket\r\n\
         Sec-WebSocket-Version: 13\r\n\
         Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut reader = BufReader::new(stream);
    let mut status_line = String::new();
    reader.read_line(&mut status_line).await.unwrap();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        if line == "\r\n" || line.is_empty() {
            break;
        }
    }
    (status_line, reader)
}

/// Read one unmasked server text frame and parse it as JSON.
async fn read_text_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Value {
    let mut head = [0u8; 2];
    reader.read_exact(&mut head).await.unwrap();
    assert_eq!(head[0], 0x81, "expected a final text frame");
    let len = match head[1] & 0x7f {
        126 => {
            let mut ext = [0u8; 2];
            reader.read_exact(&mut ext).await.unwrap();
            usize::from(u16::from_be_bytes(ext))
        }
        127 => {
            let mut ext = [0u8; 8];
            reader.read_exact(&mut ext).await.unwrap();
            u64::from_be_bytes(ext) as usize
        }
        n => usize::from(n),
    };
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await.unwrap();
    serde_json::from_slice(&payload).unwrap()
}

#[tokio::test]
async fn test_websocket_handshake_joins_pet_room() {
    let app = app();
    let token = register(&app, "alice").await;
    let pet_id = create_pet(&app, &token, "Mochi").await;
    let addr = serve(app).await;

    let (status_line, _) = upgrade(addr, "token=not-a-jwt").await;
    assert!(status_line.starts_with("HTTP/1.1 401"), "{status_line}");

    let (status_line, mut reader) = upgrade(addr, &format!("token={token}&pet_id={pet_id}")).await;
    assert!(status_line.starts_with("HTTP/1.1 101"), "{status_line}");
    let frames = async {
        let connect = read_text_frame(&mut reader).await;
        let snapshot = read_text_frame(&mut reader).await;
        (connect, snapshot)
    };
    let (connect, snapshot) = tokio::time::timeout(Duration::from_secs(5), frames)
        .await
        .expect("server should greet the socket");
    assert_eq!(connect["type"], "connect");
    assert_eq!(snapshot["type"], "pet_metrics_update");
    assert_eq!(snapshot["pet_id"], pet_id);
    assert_eq!(snapshot["data"]["name"], "Mochi");
}

#[tokio::test]
async fn test_only_documented_diagnostics_are_routed() {
    let app = app();
    let (status, _) = call(&app, Method::GET, "/api/v1/test", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = call(&app, Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.is_object());
}
