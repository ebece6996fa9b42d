//! HTTP transport against a mock API, including the session reactions

use std::cell::Cell;
use std::rc::Rc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use courier_engine::types::{EventName, Severity};
use courier_engine::{HttpError, RequestOptions, TOKEN_KEY, USER_KEY, handler};

use crate::common::{api_harness, mount_json, mount_unauthorized};

#[tokio::test]
async fn signed_in_requests_carry_the_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("authorization", "Bearer t-1"))
        .and(header("x-requested-with", "XMLHttpRequest"))
        .and(body_json(json!({"chat": 4, "text": "hello"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 99})))
        .expect(1)
        .mount(&server)
        .await;

    let h = api_harness(&server, "/");
    h.runtime.sign_in("t-1", json!({"id": 1}));

    let response = h
        .runtime
        .http()
        .post("/messages", json!({"chat": 4, "text": "hello"}), RequestOptions::default())
        .await
        .unwrap();

    assert_eq!(response.status, 201);
    assert_eq!(response.json(), Some(&json!({"id": 99})));
}

#[tokio::test]
async fn unauthorized_signs_out_and_redirects_to_login() {
    let server = MockServer::start().await;
    mount_unauthorized(&server, "/me").await;

    let h = api_harness(&server, "/chats");
    h.runtime.start();
    h.runtime.sign_in("stale", json!({"id": 1}));
    let broadcasts = Rc::new(Cell::new(0));
    let counter = Rc::clone(&broadcasts);
    let _count = h.runtime.bus().on(
        EventName::Unauthorized,
        handler(move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        }),
        Default::default(),
    );

    let err = h
        .runtime
        .http()
        .get("/me", RequestOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, HttpError::Api { status: 401, .. }));
    assert_eq!(err.message(), "Token expired");
    assert_eq!(broadcasts.get(), 1);

    assert_eq!(h.runtime.state().get_value(TOKEN_KEY), Some(serde_json::Value::Null));
    assert_eq!(h.runtime.state().get_value(USER_KEY), Some(serde_json::Value::Null));
    assert_eq!(h.runtime.http().token(), None);
    assert!(h.runtime.store().durable().get_value("token").is_none());

    assert_eq!(
        h.runtime.router().current().map(|m| m.path),
        Some("/login".to_string())
    );
    let toasts = h.runtime.toasts().visible();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].severity, Severity::Error);
}

#[tokio::test]
async fn rate_limit_shows_a_warning_with_the_server_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("retry-after", "2")
                .set_body_json(json!({"message": "Slow down"})),
        )
        .mount(&server)
        .await;

    let h = api_harness(&server, "/");
    let err = h
        .runtime
        .http()
        .get("/chats", RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), 429);
    assert_eq!(err.message(), "Slow down");
    let toasts = h.runtime.toasts().visible();
    assert_eq!(toasts.len(), 1);
    assert_eq!(toasts[0].severity, Severity::Warning);
    assert_eq!(toasts[0].message, "Too many requests. Try again in 2s.");
}

#[tokio::test]
async fn other_failures_leave_the_session_alone() {
    let server = MockServer::start().await;
    mount_json(&server, "DELETE", "/chat/4", 500, json!({"error": "boom"})).await;

    let h = api_harness(&server, "/");
    h.runtime.sign_in("t-1", serde_json::Value::Null);

    let err = h
        .runtime
        .http()
        .delete("/chat/4", RequestOptions::default())
        .await
        .unwrap_err();

    assert_eq!(err.status(), 500);
    assert_eq!(err.message(), "boom");
    assert_eq!(h.runtime.http().token().as_deref(), Some("t-1"));
    assert!(h.runtime.toasts().visible().is_empty());
}

#[tokio::test]
async fn aborted_request_is_classified_as_abort() {
    let server = MockServer::start().await;
    mount_json(&server, "GET", "/slow", 200, json!({})).await;

    let h = api_harness(&server, "/");
    let (options, abort) = RequestOptions::abortable();
    abort.abort();

    let err = h.runtime.http().get("/slow", options).await.unwrap_err();

    assert!(err.is_abort());
    assert_eq!(err.status(), 0);
}
