//! Fixed-window rate limiting on `/auth` and `/ai`.
//!
//! The limiter runs before the handler, so a malformed body still counts
//! against the budget and no database is needed.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, build_test_app_with, post_json_auth, send, test_config, unreachable_pool};
use serde_json::json;

fn login_from(ip: &str) -> Request<Body> {
    Request::post("/api/v1/auth/login")
        .header("content-type", "application/json")
        .header("x-real-ip", ip)
        .body(Body::from("{}"))
        .unwrap()
}

#[tokio::test]
async fn auth_routes_are_limited_per_client_ip() {
    let mut config = test_config();
    config.rate_limit.max_requests = 3;
    let app = build_test_app_with(unreachable_pool(), config);

    for _ in 0..3 {
        let response = send(app.app(), login_from("203.0.113.5")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = send(app.app(), login_from("203.0.113.5")).await;
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let json = body_json(response).await;
    assert_eq!(json["code"], "RATE_LIMITED");
    assert_eq!(json["error"], "Too Many Requests");

    let other = send(app.app(), login_from("203.0.113.99")).await;
    assert_eq!(other.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unlimited_routes_ignore_the_auth_budget() {
    let mut config = test_config();
    config.rate_limit.max_requests = 1;
    let app = build_test_app_with(unreachable_pool(), config);

    send(app.app(), login_from("203.0.113.7")).await;
    assert_eq!(
        send(app.app(), login_from("203.0.113.7")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );

    let features = Request::get("/api/v1/features")
        .header("x-real-ip", "203.0.113.7")
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(app.app(), features).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn ai_routes_use_their_own_budget_per_user() {
    let mut config = test_config();
    config.rate_limit.ai_max_requests = 1;
    let app = build_test_app_with(unreachable_pool(), config);
    app.ai.reply(r#"{"joy": 0.9, "neutral": 0.1}"#);
    let alice = app.token(7, "patient");
    let bob = app.token(8, "patient");
    let body = json!({ "text": "I had a good day." });

    let first = post_json_auth(app.app(), "/api/v1/ai/emotions/analyze", body.clone(), &alice).await;
    assert_eq!(first.status(), StatusCode::OK);

    let second =
        post_json_auth(app.app(), "/api/v1/ai/emotions/analyze", body.clone(), &alice).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(app.ai.prompts().len(), 1, "limited request must not reach the provider");

    app.ai.reply(r#"{"joy": 0.9, "neutral": 0.1}"#);
    let other_user = post_json_auth(app.app(), "/api/v1/ai/emotions/analyze", body, &bob).await;
    assert_eq!(other_user.status(), StatusCode::OK);
}
