// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session lifecycle: login, restore, renewal and logout.
//!
//! [`SessionController`] is the single source of truth for whether a user is
//! authenticated. It is the only writer of the credential store.
//!
//! Every login and logout starts a new *generation*. Work that began under an
//! older generation (an in-flight renewal, a timer armed before logout, a
//! login overtaken by logout) is discarded when it completes instead of being
//! applied to the new session.

use futures_util::future::{BoxFuture, FutureExt, Shared};
use reqwest::StatusCode;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::config::Config;
use crate::error::{describe_validation_failure, ClientError, Result, SESSION_EXPIRED_MESSAGE};
use crate::models::{
    AuthState, CredentialPair, LoginRequest, RefreshRequest, RegisteredUser, SignupForm,
    TokenResponse, UserIdentity,
};
use crate::services::backend::{endpoints, ApiRequest, BackendClient};
use crate::services::credential_store::{CredentialStore, FileCredentialStore};
use crate::services::executor::RequestExecutor;
use crate::services::refresh_scheduler::RefreshScheduler;
use crate::services::token_clock;
use crate::time_utils::now_epoch_secs;

const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid username or password";

type RenewalFuture = Shared<BoxFuture<'static, bool>>;

#[derive(Debug)]
struct SessionState {
    auth: AuthState,
    identity: Option<UserIdentity>,
    /// Message for the user explaining the last forced logout.
    notice: Option<String>,
}

struct SessionInner {
    backend: BackendClient,
    store: Arc<dyn CredentialStore>,
    scheduler: RefreshScheduler,
    state: RwLock<SessionState>,
    generation: AtomicU64,
    /// The renewal in flight and the generation it was started under. Only
    /// callers of the same generation join it.
    renewal: Mutex<Option<(u64, RenewalFuture)>>,
}

/// Handle to one user session. Cheap to clone; clones share the session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

impl SessionController {
    pub fn new(backend: BackendClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                backend,
                store,
                scheduler: RefreshScheduler::new(),
                state: RwLock::new(SessionState {
                    auth: AuthState::Unauthenticated,
                    identity: None,
                    notice: None,
                }),
                generation: AtomicU64::new(0),
                renewal: Mutex::new(None),
            }),
        }
    }

    /// Controller backed by the file store at `config.credentials_path`.
    pub fn from_config(config: &Config) -> Result<Self> {
        let backend = BackendClient::new(config)?;
        let store = Arc::new(FileCredentialStore::new(&config.credentials_path));
        Ok(Self::new(backend, store))
    }

    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    /// Executor that sends requests on behalf of this session.
    pub fn executor(&self) -> RequestExecutor {
        RequestExecutor::new(self.clone())
    }

    pub fn state(&self) -> AuthState {
        self.inner.read_state().auth
    }

    pub fn identity(&self) -> Option<UserIdentity> {
        self.inner.read_state().identity.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Reason for the last forced logout, if it hasn't been shown yet.
    pub fn take_notice(&self) -> Option<String> {
        self.inner.write_state().notice.take()
    }

    /// Delay the pending renewal timer was armed with.
    pub fn refresh_scheduled_in(&self) -> Option<Duration> {
        self.inner.scheduler.armed_delay()
    }

    /// Adopt the stored session, if any, at startup.
    ///
    /// An unexpired access token is adopted directly. An expired one is renewed
    /// first. Anything else leaves the controller unauthenticated with an empty
    /// store.
    pub async fn restore(&self) -> Option<UserIdentity> {
        let generation = self.inner.current_generation();
        self.inner.write_state().auth = AuthState::Authenticating;

        let pair = match self.inner.store.load() {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                tracing::debug!("No stored session");
                self.reset();
                return None;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session");
                self.reset();
                return None;
            }
        };

        match token_clock::is_expired(&pair.access_token, now_epoch_secs()) {
            Ok(false) => {
                let state = self.inner.write_state();
                if self.inner.current_generation() != generation {
                    return None;
                }
                self.inner.adopt(state, &pair, generation);
                tracing::info!(user = %pair.user.username, user_id = pair.user.id, "Session restored");
                Some(pair.user)
            }
            Ok(true) => {
                tracing::info!(user = %pair.user.username, "Stored access token expired, renewing");
                if self.renew().await {
                    self.identity()
                } else {
                    self.reset();
                    None
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Stored access token is malformed");
                self.reset();
                None
            }
        }
    }

    /// Exchange a username and password for a credential pair.
    ///
    /// Bad input fails before any request is sent. A failed login leaves the
    /// previous state (and any existing session) untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<UserIdentity> {
        let request = LoginRequest::new(username, password)?;
        let generation = self.inner.current_generation();
        let previous = {
            let mut state = self.inner.write_state();
            let previous = state.auth;
            if previous == AuthState::Unauthenticated {
                state.auth = AuthState::Authenticating;
            }
            previous
        };

        tracing::info!(username = %request.username, "Logging in");
        match self.exchange_credentials(&request).await {
            Ok(pair) => {
                let mut state = self.inner.write_state();
                if self.inner.current_generation() != generation {
                    tracing::info!(username = %request.username, "Login finished after logout; result discarded");
                    return Err(ClientError::Authentication("Login was cancelled".to_string()));
                }
                if let Err(e) = self.inner.store.save(&pair) {
                    state.auth = previous;
                    return Err(e);
                }
                let generation = self.inner.bump_generation();
                self.inner.lock_renewal().take();
                state.notice = None;
                self.inner.adopt(state, &pair, generation);
                tracing::info!(username = %pair.user.username, user_id = pair.user.id, "Login successful");
                Ok(pair.user)
            }
            Err(e) => {
                tracing::warn!(username = %request.username, error = %e, "Login failed");
                let mut state = self.inner.write_state();
                if state.auth == AuthState::Authenticating {
                    state.auth = previous;
                }
                Err(e)
            }
        }
    }

    async fn exchange_credentials(&self, request: &LoginRequest) -> Result<CredentialPair> {
        let response = self
            .inner
            .backend
            .send(&ApiRequest::post(endpoints::LOGIN, request)?, None)
            .await?;

        match response.status {
            StatusCode::OK => {}
            StatusCode::UNAUTHORIZED => {
                return Err(ClientError::Authentication(
                    response
                        .detail()
                        .unwrap_or_else(|| INVALID_CREDENTIALS_MESSAGE.to_string()),
                ))
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                return Err(ClientError::BackendValidation(describe_validation_failure(
                    &response.json_value(),
                )))
            }
            _ => return Err(response.into_error("Login failed")),
        }

        let pair: CredentialPair = response.json::<TokenResponse>()?.into();
        // Refuse a pair whose renewal could never be scheduled.
        token_clock::expiry_of(&pair.access_token)?;
        Ok(pair)
    }

    /// Create an account. Does not log in or touch stored credentials.
    pub async fn register(&self, form: SignupForm) -> Result<RegisteredUser> {
        let request = form.into_request()?;
        let response = self
            .inner
            .backend
            .send(&ApiRequest::post(endpoints::REGISTER, &request)?, None)
            .await?;

        if !response.is_success() {
            tracing::warn!(username = %request.username, status = response.status.as_u16(), "Registration rejected");
            return Err(response.into_error("Registration failed"));
        }

        let user: RegisteredUser = response.json()?;
        tracing::info!(username = %user.username, user_id = user.id, "Account registered");
        Ok(user)
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Concurrent callers share one in-flight renewal and all see its result.
    /// On failure nothing is written; callers decide whether to log out.
    pub async fn renew(&self) -> bool {
        let renewal = {
            let mut slot = self.inner.lock_renewal();
            let generation = self.inner.current_generation();
            match slot.as_ref() {
                Some((started_under, in_flight)) if *started_under == generation => {
                    tracing::debug!("Joining in-flight renewal");
                    in_flight.clone()
                }
                _ => {
                    let inner = Arc::clone(&self.inner);
                    let renewal = async move {
                        let renewed = inner.perform_renewal(generation).await;
                        inner.finish_renewal(generation);
                        renewed
                    }
                    .boxed()
                    .shared();
                    *slot = Some((generation, renewal.clone()));
                    renewal
                }
            }
        };
        renewal.await
    }

    /// End the session.
    ///
    /// `reason` is kept for the user when the logout was forced rather than
    /// requested. Requests still in flight are not cancelled; their effect on
    /// the session is discarded when they complete.
    pub fn logout(&self, reason: Option<&str>) {
        self.inner.logout(reason);
    }

    /// Clear the session without leaving a notice.
    fn reset(&self) {
        self.inner.logout(None);
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.inner.current_generation()
    }

    pub(crate) fn stored_credentials(&self) -> Result<Option<CredentialPair>> {
        self.inner.store.load()
    }

    /// Force logout with the expiry notice, unless the session already changed.
    pub(crate) fn expire(&self, generation: u64) {
        self.inner.expire(generation);
    }
}

impl SessionInner {
    fn read_state(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_renewal(&self) -> std::sync::MutexGuard<'_, Option<(u64, RenewalFuture)>> {
        self.renewal.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Empty the renewal slot if it still holds the renewal of `generation`.
    fn finish_renewal(&self, generation: u64) {
        let mut slot = self.lock_renewal();
        if matches!(slot.as_ref(), Some((started_under, _)) if *started_under == generation) {
            slot.take();
        }
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mark `pair` as the live session and arm its renewal.
    ///
    /// Takes the state guard so the generation check, the state change and the
    /// timer happen without a logout in between.
    fn adopt(self: &Arc<Self>, mut state: RwLockWriteGuard<'_, SessionState>, pair: &CredentialPair, generation: u64) {
        state.auth = AuthState::Authenticated;
        state.identity = Some(pair.user.clone());
        if let Err(e) = self.arm_refresh(&pair.access_token, generation) {
            tracing::warn!(error = %e, "Could not schedule token renewal");
        }
    }

    fn arm_refresh(self: &Arc<Self>, access_token: &str, generation: u64) -> Result<Duration> {
        // The timer must not keep the session alive.
        let weak = Arc::downgrade(self);
        self.scheduler.schedule(access_token, move || async move {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            if inner.current_generation() != generation {
                return;
            }
            let session = SessionController { inner };
            if !session.renew().await {
                tracing::warn!("Scheduled renewal failed");
                session.expire(generation);
            }
        })
    }

    async fn perform_renewal(self: &Arc<Self>, generation: u64) -> bool {
        let stored = match self.store.load() {
            Ok(Some(pair)) => pair,
            Ok(None) => {
                tracing::debug!("No refresh token stored; cannot renew");
                return false;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read credentials for renewal");
                return false;
            }
        };

        {
            let mut state = self.write_state();
            if state.auth == AuthState::Authenticated {
                state.auth = AuthState::Renewing;
            }
        }

        let renewed = self.request_renewal(&stored.refresh_token).await;

        let mut state = self.write_state();
        if state.auth == AuthState::Renewing {
            state.auth = AuthState::Authenticated;
        }
        if self.current_generation() != generation {
            tracing::info!(user = %stored.user.username, "Renewal finished after logout; result discarded");
            return false;
        }
        let pair = match renewed {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!(user = %stored.user.username, error = %e, "Token renewal failed");
                return false;
            }
        };
        if let Err(e) = self.store.save(&pair) {
            tracing::warn!(error = %e, "Failed to persist renewed credentials");
            return false;
        }

        tracing::info!(user = %pair.user.username, user_id = pair.user.id, "Credentials renewed");
        self.adopt(state, &pair, generation);
        true
    }

    async fn request_renewal(&self, refresh_token: &str) -> Result<CredentialPair> {
        let request = ApiRequest::post(endpoints::REFRESH, &RefreshRequest { refresh_token })?;
        let response = self.backend.send(&request, None).await?;
        if response.status != StatusCode::OK {
            return Err(response.into_error("Token renewal rejected"));
        }
        let pair: CredentialPair = response.json::<TokenResponse>()?.into();
        token_clock::expiry_of(&pair.access_token)?;
        Ok(pair)
    }

    fn logout(&self, reason: Option<&str>) {
        let mut state = self.write_state();
        self.bump_generation();
        self.scheduler.cancel();
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored credentials");
        }
        // A renewal still in flight belongs to the session being ended.
        self.lock_renewal().take();
        let previous = state.identity.take();
        state.auth = AuthState::Unauthenticated;
        state.notice = reason.map(str::to_string);

        if let Some(user) = previous {
            tracing::info!(user = %user.username, forced = reason.is_some(), "Logged out");
        }
    }

    fn expire(&self, generation: u64) {
        if self.current_generation() == generation {
            self.logout(Some(SESSION_EXPIRED_MESSAGE));
        } else {
            tracing::debug!("Session already replaced; expiry ignored");
        }
    }
}
