use std::collections::HashSet;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chatter_api::{build_app, ApiConfig};
use chatter_core::RuleBook;
use chatter_tests::{body_json, body_text, cookie_pair, form_post, json_post, test_config};
use serde_json::json;
use tower::ServiceExt;

#[tokio::test]
async fn health_reports_rules_and_metrics() {
    let app = build_app(test_config()).expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["rules"], 10);
    assert_eq!(body["metrics"]["messages_total"], 0);
}

#[tokio::test]
async fn json_chat_computes_arithmetic_and_keeps_session() {
    let app = build_app(test_config()).expect("app should build");

    let first = app
        .clone()
        .oneshot(json_post("/v1/chat", "client-a", json!({ "text": "9 / 2" })))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["reply_text"], "9 ÷ 2 = 4.5");
    assert_eq!(first["should_exit"], false);
    assert_eq!(first["source"]["kind"], "arithmetic");
    assert_eq!(first["turns"].as_array().unwrap().len(), 3);

    let session_id = first["session_id"].as_str().unwrap().to_string();
    let second = app
        .clone()
        .oneshot(json_post(
            "/v1/chat",
            "client-a",
            json!({ "session_id": session_id, "text": "hello" }),
        ))
        .await
        .unwrap();
    let second = body_json(second).await;
    assert_eq!(second["session_id"], session_id.as_str());
    assert_eq!(second["source"]["name"], "greeting");
    assert_eq!(second["turns"].as_array().unwrap().len(), 5);

    let transcript = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/sessions/{session_id}/transcript"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::OK);
    let transcript = body_json(transcript).await;
    assert_eq!(transcript["summary"]["user_turns"], 2);
    assert_eq!(transcript["summary"]["bot_turns"], 3);
    assert_eq!(transcript["summary"]["total_turns"], 5);
}

#[tokio::test]
async fn json_chat_rejects_blank_text() {
    let app = build_app(test_config()).expect("app should build");

    let response = app
        .oneshot(json_post("/v1/chat", "client-b", json!({ "text": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "empty_message");
}

#[tokio::test]
async fn exit_intent_ends_the_session() {
    let app = build_app(test_config()).expect("app should build");
    let farewells = RuleBook::builtin()
        .rule("farewell")
        .unwrap()
        .responses()
        .iter()
        .cloned()
        .collect::<HashSet<_>>();

    let response = app
        .clone()
        .oneshot(json_post("/v1/chat", "client-c", json!({ "text": "goodbye" })))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["should_exit"], true);
    assert!(farewells.contains(body["reply_text"].as_str().unwrap()));

    let session_id = body["session_id"].as_str().unwrap();
    let transcript = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/sessions/{session_id}/transcript"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_session_is_reported_once() {
    let app = build_app(test_config()).expect("app should build");

    let response = app
        .clone()
        .oneshot(json_post("/v1/chat", "client-d", json!({ "text": "thanks" })))
        .await
        .unwrap();
    let session_id = body_json(response).await["session_id"]
        .as_str()
        .unwrap()
        .to_string();

    let delete = |app: axum::Router| {
        let uri = format!("/v1/sessions/{session_id}");
        async move {
            app.oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
            .status()
        }
    };

    assert_eq!(delete(app.clone()).await, StatusCode::NO_CONTENT);
    assert_eq!(delete(app).await, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn chat_page_renders_welcome_with_security_headers() {
    let app = build_app(test_config()).expect("app should build");

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("x-frame-options").unwrap(),
        "DENY"
    );
    assert!(response.headers().get("content-security-policy").is_some());
    assert!(response.headers().get("x-request-id").is_some());

    let page = body_text(response).await;
    assert!(page.contains("Hello! I&#39;m a simple chatbot."));
    assert!(page.contains(r#"action="/chat""#));
}

#[tokio::test]
async fn form_flow_sets_cookie_escapes_markup_and_clears() {
    let app = build_app(test_config()).expect("app should build");

    let posted = app
        .clone()
        .oneshot(form_post(
            "/chat",
            None,
            "message=%3Cscript%3Ealert(1)%3C%2Fscript%3E",
        ))
        .await
        .unwrap();
    assert_eq!(posted.status(), StatusCode::SEE_OTHER);
    assert_eq!(posted.headers().get(header::LOCATION).unwrap(), "/");
    let cookie = cookie_pair(&posted).expect("session cookie should be set");
    assert!(cookie.starts_with("chatter_session="));

    let page = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/")
                .header(header::COOKIE, cookie.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let page = body_text(page).await;
    assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    assert!(!page.contains("<script>alert(1)</script>"));

    let cleared = app
        .clone()
        .oneshot(form_post("/chat", Some(cookie.as_str()), "clear=1"))
        .await
        .unwrap();
    assert_eq!(cleared.status(), StatusCode::SEE_OTHER);
    let set_cookie = cleared
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));

    let session_id = cookie.trim_start_matches("chatter_session=");
    let transcript = app
        .oneshot(
            Request::builder()
                .uri(format!("/v1/sessions/{session_id}/transcript"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(transcript.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn form_exit_clears_cookie() {
    let app = build_app(test_config()).expect("app should build");

    let response = app
        .oneshot(form_post("/chat", None, "message=quit"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let set_cookie = response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|value| value.to_str().ok())
        .unwrap();
    assert!(set_cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn blank_form_message_redirects_without_session() {
    let app = build_app(test_config()).expect("app should build");

    let response = app
        .oneshot(form_post("/chat", None, "message=+++"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn rate_limit_applies_per_client() {
    let app = build_app(ApiConfig {
        rate_limit_max: 2,
        ..ApiConfig::default()
    })
    .expect("app should build");

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(json_post("/v1/chat", "10.0.0.1", json!({ "text": "hi" })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let limited = app
        .clone()
        .oneshot(json_post("/v1/chat", "10.0.0.1", json!({ "text": "hi" })))
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().get(header::RETRY_AFTER).is_some());

    let other_client = app
        .clone()
        .oneshot(json_post("/v1/chat", "10.0.0.2", json!({ "text": "hi" })))
        .await
        .unwrap();
    assert_eq!(other_client.status(), StatusCode::OK);

    let health = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-forwarded-for", "10.0.0.1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
