use std::sync::Arc;
use std::time::Duration;

use reqwest::{header, Client, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::config::Config;
use crate::models::{Credentials, RefreshRequest, SessionTokens, TokenPair, User};

use super::refresh::{RefreshCoordinator, RefreshOutcome};
use super::storage::TokenStorage;

const LOGIN_PATH: &str = "/auth/login";
const REFRESH_PATH: &str = "/auth/refreshToken";
const USER_PATH: &str = "/auth/user";
const LOGOUT_PATH: &str = "/auth/logout";

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default)]
struct SessionState {
    access_token: Option<String>,
    refresh_token: Option<String>,
    user: Option<User>,
}

/// Process-wide session state: token pair plus resolved user, backed by
/// a durable storage adapter.
///
/// All mutation goes through the methods here; the client and refresh
/// coordinator only read tokens and invoke these mutators. Memory and
/// storage are updated under one write lock so callers never observe a
/// half-applied session.
pub struct SessionStore {
    client: Client,
    config: Config,
    storage: Box<dyn TokenStorage>,
    state: RwLock<SessionState>,
    refresh: RefreshCoordinator,
}

impl SessionStore {
    /// Create an empty session store. Call [`restore`](Self::restore)
    /// to rehydrate a persisted token pair.
    pub fn new(config: Config, storage: Box<dyn TokenStorage>) -> Result<Arc<Self>, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Arc::new(Self {
            client,
            config,
            storage,
            state: RwLock::new(SessionState::default()),
            refresh: RefreshCoordinator::new(),
        }))
    }

    /// Run one coordinated refresh cycle, or join the cycle already in
    /// flight. Store-issued and client-issued refreshes share the same
    /// single-flight slot.
    pub async fn coordinate_refresh(self: &Arc<Self>) -> RefreshOutcome {
        self.refresh.refresh(self).await
    }

    /// Rehydrate the token pair from durable storage, if one was
    /// persisted by a previous process. Returns whether a pair was
    /// found. The user record is not persisted; callers typically
    /// follow a successful restore with [`fetch_user`](Self::fetch_user).
    pub async fn restore(&self) -> Result<bool, ApiError> {
        match self.storage.load()? {
            Some(pair) => {
                let mut state = self.state.write().await;
                state.access_token = Some(pair.access_token);
                state.refresh_token = Some(pair.refresh_token);
                debug!("Restored persisted session tokens");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Authenticate with the backend and establish a session.
    ///
    /// A rejected login or a malformed token response leaves any prior
    /// session untouched.
    pub async fn login(self: &Arc<Self>, credentials: &Credentials) -> Result<User, ApiError> {
        let response = self
            .auth_request(reqwest::Method::POST, LOGIN_PATH)
            .json(credentials)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(ApiError::Authentication("Invalid credentials".to_string()));
            }
            return Err(ApiError::from_status(status, &body));
        }

        let tokens: SessionTokens = response.json().await?;
        let pair = tokens.into_pair()?;
        self.set_session(pair).await?;

        let user = self.fetch_user().await?;
        debug!(user_id = user.id, "Login established session");
        Ok(user)
    }

    /// Exchange the current refresh token for a new token pair. The
    /// user record is preserved, not re-fetched.
    ///
    /// Returns [`ApiError::SessionExpired`] when the server rejects the
    /// refresh token; the caller must treat that as terminal.
    pub async fn refresh_session(&self) -> Result<(), ApiError> {
        let refresh_token = self
            .refresh_token()
            .await
            .ok_or(ApiError::SessionExpired)?;

        let response = self
            .auth_request(reqwest::Method::POST, REFRESH_PATH)
            .json(&RefreshRequest {
                refresh_token: &refresh_token,
            })
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::SessionExpired);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let tokens: SessionTokens = response.json().await?;
        self.set_session(tokens.into_pair()?).await?;
        debug!("Session tokens refreshed");
        Ok(())
    }

    /// Fetch the current user with the active access token and store it.
    ///
    /// A 401 with a refresh token on hand runs one coordinated refresh
    /// and retries once, so a session restored with a stale access
    /// token (the common case after a process restart) recovers the
    /// same way intercepted requests do.
    pub async fn fetch_user(self: &Arc<Self>) -> Result<User, ApiError> {
        let token = self.access_token().await.ok_or(ApiError::Unauthorized)?;
        match self.fetch_user_with(&token).await {
            Err(ApiError::Unauthorized) if self.refresh_token().await.is_some() => {
                debug!("User fetch returned 401; attempting coordinated refresh");
                if self.coordinate_refresh().await.is_err() {
                    return Err(ApiError::SessionExpired);
                }
                let token = self.access_token().await.ok_or(ApiError::Unauthorized)?;
                self.fetch_user_with(&token).await
            }
            result => result,
        }
    }

    async fn fetch_user_with(&self, token: &str) -> Result<User, ApiError> {
        let response = self
            .auth_request(reqwest::Method::GET, USER_PATH)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }

        let user: User = response.json().await?;
        self.state.write().await.user = Some(user.clone());
        Ok(user)
    }

    /// Tear down the session. Idempotent and infallible: storage is
    /// cleared before memory under one write lock, and adapter failures
    /// are logged rather than raised.
    pub async fn clear_session(&self) {
        let mut state = self.state.write().await;
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted tokens");
        }
        state.access_token = None;
        state.refresh_token = None;
        state.user = None;
    }

    /// Notify the backend, then tear down the session locally. The
    /// endpoint call is best-effort: a network failure never blocks
    /// local cleanup. After this returns the caller should navigate to
    /// an unauthenticated entry point.
    pub async fn logout(&self) {
        let mut request = self.auth_request(reqwest::Method::POST, LOGOUT_PATH);
        if let Some(token) = self.access_token().await {
            request = request.bearer_auth(token);
        }

        // Response body and status are ignored.
        if let Err(e) = request.send().await {
            warn!(error = %e, "Logout request failed; clearing session anyway");
        }

        self.clear_session().await;
    }

    /// Auth endpoint request with the standard Accept and Referer
    /// headers every outbound call carries.
    fn auth_request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.api_url, path);
        self.client
            .request(method, &url)
            .header(header::ACCEPT, "application/json")
            .header(header::REFERER, self.config.app_url.as_str())
    }

    /// Install a validated token pair: memory first, then storage. If
    /// the storage write fails the in-memory tokens are rolled back so
    /// the two copies never diverge.
    async fn set_session(&self, pair: TokenPair) -> Result<(), ApiError> {
        let mut state = self.state.write().await;
        let previous_access = state.access_token.take();
        let previous_refresh = state.refresh_token.take();
        state.access_token = Some(pair.access_token.clone());
        state.refresh_token = Some(pair.refresh_token.clone());

        if let Err(e) = self.storage.store(&pair) {
            state.access_token = previous_access;
            state.refresh_token = previous_refresh;
            return Err(e.into());
        }
        Ok(())
    }

    pub async fn access_token(&self) -> Option<String> {
        self.state.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.state.read().await.refresh_token.clone()
    }

    pub async fn user(&self) -> Option<User> {
        self.state.read().await.user.clone()
    }

    /// A session counts as established only once the user record is
    /// resolved; a bare token pair is not enough.
    pub async fn is_logged_in(&self) -> bool {
        self.state.read().await.user.is_some()
    }

    /// Cheap clone sharing the connection pool, for the request layer.
    pub(crate) fn http_client(&self) -> Client {
        self.client.clone()
    }

    pub(crate) fn config(&self) -> &Config {
        &self.config
    }
}
