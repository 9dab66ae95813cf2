//! Integration tests for the onboarding HTTP surface.
//!
//! Each test spins up an Axum server on a random port backed by an
//! in-memory database and exercises the real HTTP contract with reqwest.
//! Redirects are never followed and the session cookie is threaded by hand,
//! so every 302 and Set-Cookie is asserted explicitly.

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::redirect::Policy;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::time::timeout;

use insight_hunter::config::AppConfig;
use insight_hunter::server::{AppState, app_router};
use insight_hunter::store::{Database, LibSqlBackend};

/// Maximum time any test is allowed to run before we consider it hung.
const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Start a server with the given config, return its port.
async fn start_server_with(config: AppConfig) -> u16 {
    let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
    let state = AppState::new(config, db);
    state
        .catalog
        .verify_chain(state.sequencer.sequence())
        .await
        .unwrap();
    let app = app_router(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Give the server a moment to start accepting connections.
    tokio::time::sleep(Duration::from_millis(50)).await;

    port
}

async fn start_server() -> u16 {
    start_server_with(AppConfig::default()).await
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .unwrap()
}

/// Pull the session token out of a Set-Cookie header.
fn session_cookie(response: &reqwest::Response) -> String {
    let raw = response
        .headers()
        .get("set-cookie")
        .expect("expected Set-Cookie")
        .to_str()
        .unwrap();
    let (pair, _) = raw.split_once(';').unwrap_or((raw, ""));
    pair.trim().to_string()
}

/// Sign in and return the session cookie pair (`sid=...`).
async fn signed_in_session(client: &reqwest::Client, port: u16) -> String {
    let response = client
        .post(format!("http://127.0.0.1:{port}/api/auth/signin"))
        .json(&serde_json::json!({"email": "a@b.com", "password": "x"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response)
}

// ── End-to-end flow ─────────────────────────────────────────────────────

#[tokio::test]
async fn fresh_session_walks_the_flow() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        // Fresh session: /onboard sends us to the entry step and sets a cookie
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/onboard/signin");
        let raw_cookie = response.headers()["set-cookie"].to_str().unwrap();
        assert!(raw_cookie.starts_with("sid="));
        assert!(raw_cookie.contains("HttpOnly"));
        assert!(raw_cookie.contains("SameSite=Lax"));
        assert!(raw_cookie.contains("Max-Age=2592000"));

        // Sign in
        let cookie = signed_in_session(&client, port).await;

        // Now /onboard points at the second step
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/onboard/connect-data");

        // Complete it via the API
        let response = client
            .post(format!(
                "http://127.0.0.1:{port}/api/onboard/complete/connect-data"
            ))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["next"], "business-setup");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn signin_response_carries_redirect_and_cookie() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        let response = client
            .post(format!("http://127.0.0.1:{port}/api/auth/signin"))
            .json(&serde_json::json!({"email": "a@b.com", "password": "x"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("set-cookie"));
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["redirect"], "/onboard");
    })
    .await
    .expect("test timed out");
}

// ── Guards ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn unauthenticated_step_access_redirects_to_signin() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard/business-setup"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/signin");

        // /signin is the entry step page
        let response = client
            .get(format!("http://127.0.0.1:{port}/signin"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/onboard/signin");
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn skipping_ahead_redirects_to_current_step() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();
        let cookie = signed_in_session(&client, port).await;

        // reports is ahead of the first incomplete step (connect-data)
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard/reports"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/onboard/connect-data");

        // Steps at or before the current one are viewable
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard/connect-data"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unauthenticated_completion_is_401() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        let response = client
            .post(format!(
                "http://127.0.0.1:{port}/api/onboard/complete/connect-data"
            ))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["ok"], false);
        assert!(json["message"].is_string());
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn completion_is_idempotent() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();
        let cookie = signed_in_session(&client, port).await;

        for _ in 0..2 {
            let response = client
                .post(format!(
                    "http://127.0.0.1:{port}/api/onboard/complete/connect-data"
                ))
                .header("cookie", &cookie)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            let json: Value = response.json().await.unwrap();
            assert_eq!(json["next"], "business-setup");
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn unknown_slug_is_404() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard/not-a-step"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let cookie = signed_in_session(&client, port).await;
        let response = client
            .post(format!(
                "http://127.0.0.1:{port}/api/onboard/complete/not-a-step"
            ))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["ok"], false);
    })
    .await
    .expect("test timed out");
}

// ── Sign-in validation ──────────────────────────────────────────────────

#[tokio::test]
async fn signin_rejects_missing_or_empty_fields() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        for body in [
            serde_json::json!({}),
            serde_json::json!({"email": "a@b.com"}),
            serde_json::json!({"email": "", "password": "x"}),
            serde_json::json!({"email": "a@b.com", "password": "  "}),
        ] {
            let response = client
                .post(format!("http://127.0.0.1:{port}/api/auth/signin"))
                .json(&body)
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let json: Value = response.json().await.unwrap();
            assert_eq!(json["ok"], false);
        }
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn configured_demo_password_is_enforced() {
    timeout(TEST_TIMEOUT, async {
        let config = AppConfig {
            demo_password: Some("hunter2".into()),
            ..AppConfig::default()
        };
        let port = start_server_with(config).await;
        let client = client();

        let response = client
            .post(format!("http://127.0.0.1:{port}/api/auth/signin"))
            .json(&serde_json::json!({"email": "a@b.com", "password": "wrong"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = client
            .post(format!("http://127.0.0.1:{port}/api/auth/signin"))
            .json(&serde_json::json!({"email": "a@b.com", "password": "hunter2"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    })
    .await
    .expect("test timed out");
}

// ── Sign-out ────────────────────────────────────────────────────────────

#[tokio::test]
async fn signout_clears_progress_and_restarts_the_flow() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();
        let cookie = signed_in_session(&client, port).await;

        client
            .post(format!(
                "http://127.0.0.1:{port}/api/onboard/complete/connect-data"
            ))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();

        let response = client
            .post(format!("http://127.0.0.1:{port}/api/auth/signout"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: Value = response.json().await.unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["redirect"], "/signin");

        // Signed out: back to the sign-in page
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "/onboard/signin");

        // A fresh sign-in starts over — prior completions are gone
        let cookie = signed_in_session(&client, port).await;
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()["location"], "/onboard/connect-data");
    })
    .await
    .expect("test timed out");
}

// ── Pages & demo API ────────────────────────────────────────────────────

#[tokio::test]
async fn step_pages_render_html() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        // Entry step carries the sign-in form, no auth needed
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard/signin"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = response.text().await.unwrap();
        assert!(html.contains("/api/auth/signin"));

        // A later step renders title, progress line, and CTA
        let cookie = signed_in_session(&client, port).await;
        let response = client
            .get(format!("http://127.0.0.1:{port}/onboard/connect-data"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let html = response.text().await.unwrap();
        assert!(html.contains("Connect data"));
        assert!(html.contains("Step 2 of 11"));
        assert!(html.contains("/onboard/business-setup"));

        // Second fetch comes from the render cache, byte-identical
        let again = client
            .get(format!("http://127.0.0.1:{port}/onboard/connect-data"))
            .header("cookie", &cookie)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap();
        assert_eq!(html, again);
    })
    .await
    .expect("test timed out");
}

#[tokio::test]
async fn health_and_demo_endpoints() {
    timeout(TEST_TIMEOUT, async {
        let port = start_server().await;
        let client = client();

        let json: Value = client
            .get(format!("http://127.0.0.1:{port}/api/health"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["service"], "insight-hunter");

        let summary: Value = client
            .get(format!("http://127.0.0.1:{port}/api/demo/summary"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(summary[0]["label"], "MRR");

        let forecast: Value = client
            .get(format!("http://127.0.0.1:{port}/api/demo/forecast"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(forecast[0]["month"], "Sep");
        assert!(forecast[0]["cashIn"].is_number());
    })
    .await
    .expect("test timed out");
}
