// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process mock of the workout backend.
//!
//! Each test spawns its own server on an ephemeral port. Counters and knobs
//! live in [`MockState`] so tests can steer responses and check how many
//! calls reached each endpoint.

#![allow(dead_code)]

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use liftlog::config::Config;
use liftlog::models::{CredentialPair, UserIdentity};
use liftlog::services::{BackendClient, MemoryCredentialStore, SessionController};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const PASSWORD: &str = "password123";

/// How `POST /users/refresh` answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// New pair; the new access token is accepted afterwards.
    Succeed,
    /// 401, as for an expired or revoked refresh token.
    Reject,
    /// New pair whose access token the backend still refuses.
    IssueUnusableToken,
}

pub struct MockState {
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub session_posts: AtomicUsize,
    /// The only access token authenticated endpoints accept.
    pub accepted_token: Mutex<Option<String>>,
    pub refresh_mode: Mutex<RefreshMode>,
    /// Artificial latency of the refresh endpoint.
    pub refresh_delay: Mutex<Duration>,
    /// Forced `(status, body)` for `POST /sessions/`.
    pub session_failure: Mutex<Option<(StatusCode, Value)>>,
    /// Bodies accepted by `POST /sessions/`.
    pub posted_sessions: Mutex<Vec<Value>>,
    /// Sessions listed by `GET /sessions/`; `None` answers 404.
    pub history: Mutex<Option<Vec<Value>>>,
    /// Login and refresh hand out access tokens with no `user_id` claim.
    pub omit_user_id: AtomicBool,
    next_id: AtomicUsize,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            session_posts: AtomicUsize::new(0),
            accepted_token: Mutex::new(None),
            refresh_mode: Mutex::new(RefreshMode::Succeed),
            refresh_delay: Mutex::new(Duration::ZERO),
            session_failure: Mutex::new(None),
            posted_sessions: Mutex::new(Vec::new()),
            history: Mutex::new(None),
            omit_user_id: AtomicBool::new(false),
            next_id: AtomicUsize::new(100),
        }
    }
}

impl MockState {
    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn accept(&self, token: &str) {
        *self.accepted_token.lock().unwrap() = Some(token.to_string());
    }

    pub fn set_refresh_mode(&self, mode: RefreshMode) {
        *self.refresh_mode.lock().unwrap() = mode;
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.refresh_delay.lock().unwrap() = delay;
    }

    pub fn fail_sessions_with(&self, status: StatusCode, body: Value) {
        *self.session_failure.lock().unwrap() = Some((status, body));
    }

    pub fn clear_session_failure(&self) {
        *self.session_failure.lock().unwrap() = None;
    }

    pub fn issue_tokens_without_user_id(&self) {
        self.omit_user_id.store(true, Ordering::SeqCst);
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn is_authorized(&self, headers: &HeaderMap) -> bool {
        let bearer = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        match (bearer, self.accepted_token.lock().unwrap().as_deref()) {
            (Some(sent), Some(accepted)) => sent == accepted,
            _ => false,
        }
    }
}

pub struct MockBackend {
    pub url: String,
    pub state: Arc<MockState>,
}

impl MockBackend {
    /// Client config pointing at this backend with a throwaway credential path.
    pub fn config(&self) -> Config {
        Config::for_backend(&self.url, std::env::temp_dir().join("liftlog-unused.json"))
    }

    /// Controller over an in-memory store.
    pub fn controller(&self, store: Arc<MemoryCredentialStore>) -> SessionController {
        controller_with(&self.config(), store)
    }
}

pub fn controller_with(config: &Config, store: Arc<MemoryCredentialStore>) -> SessionController {
    SessionController::new(BackendClient::new(config).unwrap(), store)
}

pub async fn spawn_backend() -> MockBackend {
    let state = Arc::new(MockState::default());
    let app = Router::new()
        .route("/health", get(health))
        .route("/users/", post(register))
        .route("/users/login", post(login))
        .route("/users/refresh", post(refresh))
        .route("/sessions/", post(create_session).get(list_sessions))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    MockBackend {
        url: format!("http://{}", addr),
        state,
    }
}

#[derive(Serialize)]
struct MintedClaims<'a> {
    sub: &'a str,
    user_id: i64,
    exp: i64,
    /// Keeps tokens minted within the same second distinct.
    jti: usize,
}

static MINTED: AtomicUsize = AtomicUsize::new(0);

pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

#[derive(Serialize)]
struct AnonymousClaims<'a> {
    sub: &'a str,
    exp: i64,
}

/// Mint an otherwise valid access token that carries no `user_id` claim.
pub fn mint_token_without_user_id(username: &str, expires_in: i64) -> String {
    let claims = AnonymousClaims {
        sub: username,
        exp: now_secs() + expires_in,
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"backend-signing-key"),
    )
    .expect("Failed to mint token")
}

/// Mint an access token for `username` expiring `expires_in` seconds from now.
pub fn mint_token(username: &str, user_id: i64, expires_in: i64) -> String {
    let claims = MintedClaims {
        sub: username,
        user_id,
        exp: now_secs() + expires_in,
        jti: MINTED.fetch_add(1, Ordering::SeqCst),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"backend-signing-key"),
    )
    .expect("Failed to mint token")
}

pub fn alex() -> UserIdentity {
    UserIdentity {
        id: 7,
        username: "alex".to_string(),
    }
}

pub fn pair_with(access_token: String) -> CredentialPair {
    CredentialPair {
        access_token,
        refresh_token: "r1".to_string(),
        user: alex(),
    }
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn token_body(state: &MockState, username: &str, user_id: i64, accept: bool) -> Value {
    let access_token = if state.omit_user_id.load(Ordering::SeqCst) {
        mint_token_without_user_id(username, 3600)
    } else {
        mint_token(username, user_id, 3600)
    };
    if accept {
        state.accept(&access_token);
    }
    json!({
        "access_token": access_token,
        "refresh_token": format!("r{}", state.next_id()),
        "user": { "id": user_id, "username": username },
    })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn register(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    let username = body["username"].as_str().unwrap_or_default();
    if username == "taken" {
        return error(StatusCode::BAD_REQUEST, "Username already registered");
    }
    if body["password"].as_str().unwrap_or_default().len() < 8 {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "detail": [{ "loc": ["body", "password"], "msg": "String should have at least 8 characters" }]
            })),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({ "id": state.next_id(), "username": username, "email": body["email"] })),
    )
        .into_response()
}

async fn login(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.login_calls.fetch_add(1, Ordering::SeqCst);
    let username = body["username"].as_str().unwrap_or_default();
    if body["password"] != PASSWORD {
        return error(StatusCode::UNAUTHORIZED, "Invalid username or password");
    }
    Json(token_body(&state, username, 7, true)).into_response()
}

async fn refresh(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let delay = *state.refresh_delay.lock().unwrap();
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    if body["refresh_token"].as_str().unwrap_or_default().is_empty() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "refresh_token required");
    }
    let mode = *state.refresh_mode.lock().unwrap();
    match mode {
        RefreshMode::Reject => error(StatusCode::UNAUTHORIZED, "Invalid refresh token"),
        RefreshMode::Succeed => Json(token_body(&state, "alex", 7, true)).into_response(),
        RefreshMode::IssueUnusableToken => Json(token_body(&state, "alex", 7, false)).into_response(),
    }
}

async fn create_session(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.session_posts.fetch_add(1, Ordering::SeqCst);
    if !state.is_authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }
    if let Some((status, failure)) = state.session_failure.lock().unwrap().clone() {
        return (status, Json(failure)).into_response();
    }
    state.posted_sessions.lock().unwrap().push(body.clone());

    let mut created = body;
    created["id"] = json!(state.next_id());
    (StatusCode::CREATED, Json(created)).into_response()
}

async fn list_sessions(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if !state.is_authorized(&headers) {
        return error(StatusCode::UNAUTHORIZED, "Could not validate credentials");
    }
    match state.history.lock().unwrap().clone() {
        Some(sessions) => Json(Value::Array(sessions)).into_response(),
        None => error(StatusCode::NOT_FOUND, "No sessions found"),
    }
}
