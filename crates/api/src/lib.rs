mod config;
mod page;
mod rate_limit;

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::{Form, Json, Path as AxumPath, State};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{delete, get, post};
use axum::{body::Body, Router};
use chatter_core::{ReplySource, ResponseEngine, RuleBook, Transcript, TranscriptSummary, Turn};
use chatter_observability::AppMetrics;
use chatter_session::{ConversationService, SessionError};
use chatter_storage::MemoryStore;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

pub use crate::config::ApiConfig;
pub use crate::page::{escape_html, render_chat_page};
use crate::rate_limit::{ClientRateLimiter, RateDecision};

#[derive(Clone)]
pub struct ApiState {
    pub conversations: Arc<ConversationService<MemoryStore>>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: ClientRateLimiter,
    pub config: Arc<ApiConfig>,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    rules: usize,
    metrics: chatter_observability::MetricsSnapshot,
}

#[derive(Debug, Deserialize)]
struct ChatForm {
    message: Option<String>,
    clear: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Option<String>,
    text: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: String,
    reply_text: String,
    should_exit: bool,
    source: ReplySource,
    turns: Vec<Turn>,
}

#[derive(Debug, Serialize)]
struct TranscriptResponse {
    session_id: String,
    summary: TranscriptSummary,
    turns: Vec<Turn>,
}

pub fn build_state(config: ApiConfig) -> Result<ApiState> {
    let book = match config.rules_path.as_ref() {
        Some(path) => RuleBook::load(path)
            .with_context(|| format!("failed loading rule book from {}", path.display()))?,
        None => RuleBook::builtin(),
    };
    let engine = Arc::new(ResponseEngine::new(book));
    let metrics = AppMetrics::shared();
    let session_ttl = chrono::Duration::from_std(config.session_ttl)
        .context("session ttl out of range")?;

    let conversations = Arc::new(ConversationService::new(
        engine,
        Arc::new(MemoryStore::new()),
        metrics.clone(),
        session_ttl,
    ));

    Ok(ApiState {
        conversations,
        metrics,
        limiter: ClientRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        config: Arc::new(config),
    })
}

pub fn build_app(config: ApiConfig) -> Result<Router> {
    Ok(build_router(build_state(config)?))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(chat_page))
        .route("/chat", post(chat_form))
        .route("/health", get(health))
        .route("/v1/chat", post(chat))
        .route("/v1/sessions/:session_id/transcript", get(session_transcript))
        .route("/v1/sessions/:session_id", delete(session_delete))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

/// Periodically drops expired sessions and idle rate-limit buckets.
pub fn spawn_session_reaper(state: &ApiState) -> JoinHandle<()> {
    let conversations = state.conversations.clone();
    let limiter = state.limiter.clone();
    let period = state.config.purge_interval;

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            limiter.prune();
            match conversations.purge_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "expired sessions purged"),
                Err(err) => warn!(error = %err, "session purge failed"),
            }
        }
    })
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        rules: state.conversations.engine().rule_book().rules().len(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn chat_page(State(state): State<ApiState>, headers: HeaderMap) -> Response {
    let existing = match read_cookie_value(&headers, &state.config.cookie_name) {
        Some(session_id) => match state.conversations.transcript(&session_id).await {
            Ok(transcript) => transcript,
            Err(err) => return internal_error(err),
        },
        None => None,
    };

    let transcript = existing.unwrap_or_else(|| state.conversations.start_session().transcript);
    Html(render_chat_page(&transcript)).into_response()
}

async fn chat_form(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Form(form): Form<ChatForm>,
) -> Response {
    let config = &state.config;
    let session_id = read_cookie_value(&headers, &config.cookie_name);

    if form.clear.is_some() {
        if let Some(session_id) = session_id.as_deref() {
            if let Err(err) = state.conversations.end_session(session_id).await {
                return internal_error(err);
            }
        }
        return redirect_home(Some(build_clear_cookie(config)));
    }

    let message = form.message.unwrap_or_default();
    match state
        .conversations
        .handle_message(session_id.as_deref(), &message)
        .await
    {
        Ok(outcome) if outcome.should_exit => redirect_home(Some(build_clear_cookie(config))),
        Ok(outcome) => redirect_home(Some(build_session_cookie(config, &outcome.session_id))),
        Err(SessionError::EmptyMessage) => redirect_home(None),
        Err(err) => internal_error(err),
    }
}

async fn chat(State(state): State<ApiState>, Json(request): Json<ChatRequest>) -> Response {
    match state
        .conversations
        .handle_message(request.session_id.as_deref(), &request.text)
        .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ChatResponse {
                session_id: outcome.session_id,
                reply_text: outcome.reply_text,
                should_exit: outcome.should_exit,
                source: outcome.source,
                turns: outcome.transcript.turns().to_vec(),
            }),
        )
            .into_response(),
        Err(SessionError::EmptyMessage) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({
                "error": "empty_message",
                "message": "text must contain something other than whitespace"
            })),
        )
            .into_response(),
        Err(err) => internal_error(err),
    }
}

async fn session_transcript(
    State(state): State<ApiState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    match state.conversations.transcript(&session_id).await {
        Ok(Some(transcript)) => (
            StatusCode::OK,
            Json(transcript_response(session_id, &transcript)),
        )
            .into_response(),
        Ok(None) => session_not_found(),
        Err(err) => internal_error(err),
    }
}

async fn session_delete(
    State(state): State<ApiState>,
    AxumPath(session_id): AxumPath<String>,
) -> Response {
    match state.conversations.end_session(&session_id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => session_not_found(),
        Err(err) => internal_error(err),
    }
}

fn transcript_response(session_id: String, transcript: &Transcript) -> TranscriptResponse {
    TranscriptResponse {
        session_id,
        summary: transcript.summary(),
        turns: transcript.turns().to_vec(),
    }
}

fn session_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({
            "error": "session_not_found",
            "message": "no active session with that id"
        })),
    )
        .into_response()
}

fn internal_error(err: SessionError) -> Response {
    error!(error = %err, "request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({
            "error": "internal_error",
            "message": "something went wrong handling this request"
        })),
    )
        .into_response()
}

fn redirect_home(cookie: Option<String>) -> Response {
    let mut response = Redirect::to("/").into_response();
    if let Some(cookie) = cookie {
        if let Ok(header_value) = HeaderValue::from_str(&cookie) {
            response
                .headers_mut()
                .insert(header::SET_COOKIE, header_value);
        }
    }
    response
}

fn read_cookie_value(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let raw_cookie = headers.get(header::COOKIE)?.to_str().ok()?;
    raw_cookie.split(';').find_map(|part| {
        let mut split = part.trim().splitn(2, '=');
        let key = split.next()?.trim();
        let value = split.next()?.trim();
        if key == cookie_name && !value.is_empty() {
            Some(value.to_string())
        } else {
            None
        }
    })
}

fn build_session_cookie(config: &ApiConfig, session_id: &str) -> String {
    let mut segments = vec![
        format!("{}={session_id}", config.cookie_name),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        format!("Max-Age={}", config.session_ttl.as_secs()),
    ];
    push_cookie_scope(config, &mut segments);
    segments.join("; ")
}

fn build_clear_cookie(config: &ApiConfig) -> String {
    let mut segments = vec![
        format!("{}=", config.cookie_name),
        "Path=/".to_string(),
        "HttpOnly".to_string(),
        "SameSite=Lax".to_string(),
        "Max-Age=0".to_string(),
        "Expires=Thu, 01 Jan 1970 00:00:00 GMT".to_string(),
    ];
    push_cookie_scope(config, &mut segments);
    segments.join("; ")
}

fn push_cookie_scope(config: &ApiConfig, segments: &mut Vec<String>) {
    if config.cookie_secure {
        segments.push("Secure".to_string());
    }
    if let Some(domain) = config.cookie_domain.as_deref() {
        segments.push(format!("Domain={domain}"));
    }
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/health" {
        return next.run(request).await;
    }

    let client = request_ip(&request);
    if let RateDecision::Limited { retry_after } = state.limiter.check(&client) {
        warn!(client = %client, "rate limit exceeded");
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(serde_json::json!({
                "error": "rate_limited",
                "message": "too many messages from this client. wait and retry."
            })),
        )
            .into_response();
        let seconds = retry_after.as_secs().max(1);
        if let Ok(value) = HeaderValue::from_str(&seconds.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or("local")
        .to_string()
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'none'; style-src 'unsafe-inline'; form-action 'self'; frame-ancestors 'none'; base-uri 'none'",
        ),
    );

    response
}
