//! Route handlers for pages and the JSON API.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::catalog::{Step, StepCatalog};
use crate::config::AppConfig;
use crate::onboarding::sequence::compute_next;
use crate::onboarding::{Sequencer, StepAccess, StepSequence};
use crate::render::{CacheLookup, RenderCache, page};
use crate::session::{ResolvedSession, SessionStore, build_set_cookie};
use crate::store::Database;

use super::error::{ApiError, PageError};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: Arc<SessionStore>,
    pub sequencer: Arc<Sequencer>,
    pub catalog: Arc<StepCatalog>,
    pub cache: Arc<RenderCache>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Arc<dyn Database>) -> Self {
        let sessions = Arc::new(SessionStore::new(
            Arc::clone(&db),
            config.auth_ttl,
            config.progress_ttl,
        ));
        let sequencer = Arc::new(Sequencer::new(
            Arc::clone(&sessions),
            StepSequence::canonical(),
        ));
        let catalog = Arc::new(StepCatalog::new(db));
        let cache = RenderCache::new();
        Self {
            config,
            sessions,
            sequencer,
            catalog,
            cache,
        }
    }
}

/// Build the Axum router with page and API routes.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/onboard", get(onboard_index))
        .route("/onboard/{slug}", get(onboard_step))
        .route("/signin", get(signin_page))
        .route("/api/auth/signin", post(signin))
        .route("/api/auth/signout", post(signout))
        .route("/api/onboard/complete/{slug}", post(complete_step))
        .route("/api/health", get(health))
        .route("/api/demo/summary", get(demo_summary))
        .route("/api/demo/forecast", get(demo_forecast))
        .route("/static/onboard.js", get(onboard_js))
        .route("/static/signin.js", get(signin_js))
        .layer(cors)
        .with_state(state)
}

// ── Session plumbing ────────────────────────────────────────────────────

fn resolve_session(state: &AppState, headers: &HeaderMap) -> ResolvedSession {
    let cookie = headers.get(COOKIE).and_then(|v| v.to_str().ok());
    state.sessions.resolve_session(cookie)
}

/// Attach the session cookie when a new token was minted.
fn with_session_cookie(
    response: Response,
    state: &AppState,
    session: &ResolvedSession,
) -> Response {
    if session.is_new {
        set_session_cookie(response, state, &session.id)
    } else {
        response
    }
}

fn set_session_cookie(mut response: Response, state: &AppState, sid: &str) -> Response {
    let cookie = build_set_cookie(sid, state.sessions.cookie_max_age());
    match HeaderValue::from_str(&cookie) {
        Ok(value) => {
            response.headers_mut().append(SET_COOKIE, value);
        }
        Err(e) => warn!(error = %e, "Failed to build session cookie header"),
    }
    response
}

/// A literal 302 redirect (axum's `Redirect` helpers emit 303/307/308).
fn found(url: &str) -> Response {
    (StatusCode::FOUND, [(LOCATION, url.to_string())]).into_response()
}

// ── Pages ───────────────────────────────────────────────────────────────

/// GET /onboard — send the session to its current step.
async fn onboard_index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let session = resolve_session(&state, &headers);
    let authed = state.sessions.is_authenticated(&session.id).await?;
    let progress = state.sessions.get_progress(&session.id).await?;

    let sequence = state.sequencer.sequence();
    let next = compute_next(sequence, &progress);
    // Progress past the entry step with no live auth means the auth flag
    // expired or was cleared; back to the sign-in page.
    let target = if !authed && next != sequence.entry() {
        "/signin".to_string()
    } else {
        format!("/onboard/{next}")
    };

    Ok(with_session_cookie(found(&target), &state, &session))
}

/// GET /onboard/{slug} — guarded, cached step page.
async fn onboard_step(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, PageError> {
    let session = resolve_session(&state, &headers);

    let sequence = state.sequencer.sequence();
    match state
        .sequencer
        .authorize_step_access(&session.id, &slug)
        .await?
    {
        StepAccess::Allow => {}
        StepAccess::Redirect(target) => {
            let url = if target == sequence.entry() {
                "/signin".to_string()
            } else {
                format!("/onboard/{target}")
            };
            return Ok(with_session_cookie(found(&url), &state, &session));
        }
    }

    let version = state.config.template_version;
    let html = match state.cache.get(&slug, version).await {
        CacheLookup::Fresh(html) => html,
        CacheLookup::Stale(html) => {
            spawn_refresh(&state, slug.clone(), version);
            html
        }
        CacheLookup::Miss => {
            let Some(step) = state.catalog.get_step(&slug).await? else {
                return Err(PageError(StatusCode::NOT_FOUND));
            };
            let html = render_step_html(&state, &step);
            state
                .cache
                .spawn_store(slug, version, html.clone(), state.config.render_freshness);
            html
        }
    };

    Ok(with_session_cookie(Html(html).into_response(), &state, &session))
}

/// GET /signin — the sign-in page lives at the entry step.
async fn signin_page() -> Response {
    found("/onboard/signin")
}

fn render_step_html(state: &AppState, step: &Step) -> String {
    let sequence = state.sequencer.sequence();
    if step.slug == sequence.entry() {
        page::render_signin_page(step)
    } else {
        page::render_step_page(step, sequence.guard_index(&step.slug), sequence.len())
    }
}

/// Re-render an expired entry off the request path. Failures stay here.
fn spawn_refresh(state: &AppState, slug: String, version: u32) {
    let state = state.clone();
    tokio::spawn(async move {
        match state.catalog.get_step(&slug).await {
            Ok(Some(step)) => {
                let html = render_step_html(&state, &step);
                state
                    .cache
                    .put(&slug, version, html, state.config.render_freshness)
                    .await;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, slug = %slug, "Background re-render failed"),
        }
    });
}

// ── Auth API ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SigninRequest {
    email: Option<String>,
    password: Option<String>,
}

/// POST /api/auth/signin
async fn signin(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SigninRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) =
        payload.map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))?;

    let email = body.email.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let password = body
        .password
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    let (Some(email), Some(password)) = (email, password) else {
        return Err(ApiError::Validation("Email and password are required".into()));
    };

    // Demo credential check: any non-empty pair is accepted unless a demo
    // password is configured.
    if let Some(expected) = &state.config.demo_password {
        if password != expected {
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    }

    let session = resolve_session(&state, &headers);
    state.sessions.set_authenticated(&session.id, true).await?;
    state
        .sequencer
        .mark_complete(&session.id, state.sequencer.sequence().entry())
        .await?;
    info!(sid = %session.id, email = %email, "Signed in");

    let response = Json(serde_json::json!({"ok": true, "redirect": "/onboard"})).into_response();
    // Sign-in always (re)sets the cookie so the max age starts fresh.
    Ok(set_session_cookie(response, &state, &session.id))
}

/// POST /api/auth/signout — destroys the session record (auth + progress).
async fn signout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let session = resolve_session(&state, &headers);
    if !session.is_new {
        state.sessions.clear(&session.id).await?;
    }
    Ok(Json(serde_json::json!({"ok": true, "redirect": "/signin"})))
}

// ── Onboarding API ──────────────────────────────────────────────────────

/// POST /api/onboard/complete/{slug}
async fn complete_step(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let session = resolve_session(&state, &headers);
    let next = state.sequencer.mark_complete(&session.id, &slug).await?;

    let response = Json(serde_json::json!({"ok": true, "next": next})).into_response();
    Ok(with_session_cookie(response, &state, &session))
}

// ── Demo / health ───────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "ok": true,
        "service": "insight-hunter"
    }))
}

async fn demo_summary() -> impl IntoResponse {
    Json(serde_json::json!([
        { "label": "MRR", "value": "$6,400" },
        { "label": "Active Workspaces", "value": "41" },
        { "label": "Reports / wk", "value": "183" },
    ]))
}

async fn demo_forecast() -> impl IntoResponse {
    Json(serde_json::json!([
        { "month": "Sep", "cashIn": 28000, "cashOut": 21000, "netCash": 7000, "eomBalance": 42000 },
        { "month": "Oct", "cashIn": 29500, "cashOut": 21900, "netCash": 7600, "eomBalance": 49600 },
        { "month": "Nov", "cashIn": 31000, "cashOut": 23200, "netCash": 7800, "eomBalance": 57400 },
    ]))
}

// ── Static assets ───────────────────────────────────────────────────────

async fn onboard_js() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_str!("../../static/onboard.js"),
    )
}

async fn signin_js() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/javascript; charset=utf-8")],
        include_str!("../../static/signin.js"),
    )
}
