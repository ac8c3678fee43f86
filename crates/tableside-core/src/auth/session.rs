//! Access-token lifecycle for a single client session.
//!
//! `SessionManager` owns the current token, attaches it to outgoing
//! requests, picks up server-side rotations from the `X-New-Token` response
//! header, and merges concurrent refresh attempts into one request.

use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use reqwest::{header, Client, Method, RequestBuilder, Response};
use tracing::{debug, info, warn};

use super::error::SessionError;
use super::store::TokenStore;
use super::token::{self, TokenInfo};
use crate::utils::truncate_body;

/// Response header the server uses to hand out a replacement token.
pub const NEW_TOKEN_HEADER: &str = "x-new-token";

/// Identity endpoint, also used to refresh the token.
pub const WHOAMI_PATH: &str = "/api/v1/auth/me";

type RefreshResult = Result<String, SessionError>;
type RefreshFuture = BoxFuture<'static, RefreshResult>;

struct InFlightRefresh {
    id: u64,
    future: WeakShared<RefreshFuture>,
}

#[derive(Default)]
struct SessionState {
    token: Option<String>,
    refresh: Option<InFlightRefresh>,
    next_refresh_id: u64,
}

struct Inner {
    client: Client,
    base_url: String,
    store: Box<dyn TokenStore>,
    state: Mutex<SessionState>,
}

/// Handle to the session. Clone is cheap and every clone shares state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

/// Clears the in-flight slot when a refresh finishes, fails, or is dropped.
struct RefreshGuard {
    session: SessionManager,
    id: u64,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        let mut state = self.session.state();
        if state.refresh.as_ref().map(|r| r.id) == Some(self.id) {
            state.refresh = None;
        }
    }
}

impl SessionManager {
    /// Create a session, restoring any previously saved token.
    ///
    /// An expired or unreadable token is restored as-is so callers can tell
    /// "session expired" from "never logged in".
    pub fn new(client: Client, base_url: impl Into<String>, store: Box<dyn TokenStore>) -> Self {
        let token = match store.load() {
            Ok(Some(saved)) => {
                debug!(live = token::is_live(&saved), "Restored saved access token");
                Some(saved)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to load saved access token");
                None
            }
        };

        Self {
            inner: Arc::new(Inner {
                client,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                store,
                state: Mutex::new(SessionState {
                    token,
                    ..Default::default()
                }),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Absolute URL for an API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.inner.base_url, path.trim_start_matches('/'))
    }

    /// Start building a request against the API base URL.
    /// Pass the result to [`authenticated_request`](Self::authenticated_request).
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.inner.client.request(method, self.url(path))
    }

    // ===== Token state =====

    pub fn get_token(&self) -> Option<String> {
        self.state().token.clone()
    }

    /// Replace the current token and persist it.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), SessionError> {
        let token = token.into();
        let mut state = self.state();
        self.inner.store.save(&token).map_err(SessionError::storage)?;
        state.token = Some(token);
        Ok(())
    }

    /// Forget the current token, in memory and in storage.
    pub fn remove_token(&self) -> Result<(), SessionError> {
        let mut state = self.state();
        state.token = None;
        self.inner.store.clear().map_err(SessionError::storage)
    }

    /// Whether the stored token decodes and has not expired.
    ///
    /// This is an optimism check on unverified claims, not proof that the
    /// server will accept the token.
    pub fn is_authenticated(&self) -> bool {
        self.get_token().map(|t| token::is_live(&t)).unwrap_or(false)
    }

    pub fn token_info(&self) -> Option<TokenInfo> {
        self.get_token().and_then(|t| TokenInfo::from_token(&t))
    }

    /// Whether a refresh is currently running.
    pub fn is_refreshing(&self) -> bool {
        // Upgrade outside the lock: dropping the last handle runs the guard.
        let weak = self.state().refresh.as_ref().map(|r| r.future.clone());
        weak.and_then(|w| w.upgrade()).is_some()
    }

    // ===== Requests =====

    /// Send `request` with the stored bearer token.
    ///
    /// The `Authorization` header always comes from the stored token and
    /// replaces anything the caller set. A rotated token in the response is
    /// stored before the response is returned. Non-success statuses are
    /// returned as-is; retrying on 401 is up to the caller.
    pub async fn authenticated_request(
        &self,
        request: RequestBuilder,
    ) -> Result<Response, SessionError> {
        let (response, _sent) = self.send_with_token(request).await?;
        Ok(response)
    }

    /// Like `authenticated_request`, also returning the token that was sent.
    async fn send_with_token(
        &self,
        request: RequestBuilder,
    ) -> Result<(Response, String), SessionError> {
        let token = self.get_token().ok_or(SessionError::NoToken)?;

        let mut request = request.build()?;
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| SessionError::InvalidHeader(e.to_string()))?;
        request.headers_mut().insert(header::AUTHORIZATION, bearer);

        debug!(method = %request.method(), url = %request.url(), "Sending authenticated request");
        let response = self.inner.client.execute(request).await?;

        if let Some(new_token) = rotated_token(&response) {
            self.apply_rotation(new_token);
        }

        Ok((response, token))
    }

    /// Forget `token` if it is still the current one.
    /// Returns whether anything was cleared.
    fn remove_token_if_current(&self, token: &str) -> Result<bool, SessionError> {
        let mut state = self.state();
        if state.token.as_deref() != Some(token) {
            return Ok(false);
        }
        state.token = None;
        self.inner.store.clear().map_err(SessionError::storage)?;
        Ok(true)
    }

    /// Store a token handed out by the server, unless it is the one we hold.
    /// Concurrent rotations resolve as last write wins.
    fn apply_rotation(&self, new_token: String) {
        let mut state = self.state();
        if state.token.as_deref() == Some(new_token.as_str()) {
            return;
        }
        if let Err(e) = self.inner.store.save(&new_token) {
            warn!(error = %e, "Failed to persist rotated access token");
        }
        state.token = Some(new_token);
        info!("Access token rotated by server");
    }

    /// Refresh the session token.
    ///
    /// Only one refresh runs at a time. Callers arriving while one is in
    /// flight wait for it and receive the same result, success or failure.
    pub async fn refresh(&self) -> Result<String, SessionError> {
        let refresh = {
            let mut state = self.state();
            let running = state.refresh.as_ref().and_then(|r| r.future.upgrade());

            match running {
                Some(future) => {
                    debug!("Joining in-flight token refresh");
                    future
                }
                None => {
                    let id = state.next_refresh_id;
                    state.next_refresh_id += 1;

                    let session = self.clone();
                    let future: Shared<RefreshFuture> = async move {
                        let _guard = RefreshGuard {
                            session: session.clone(),
                            id,
                        };
                        session.run_refresh().await
                    }
                    .boxed()
                    .shared();

                    // A fresh Shared has not completed, so downgrade succeeds.
                    state.refresh = future
                        .downgrade()
                        .map(|weak| InFlightRefresh { id, future: weak });
                    future
                }
            }
        };

        refresh.await
    }

    async fn run_refresh(&self) -> RefreshResult {
        info!("Refreshing access token");
        let (response, sent) = self
            .send_with_token(self.inner.client.get(self.url(WHOAMI_PATH)))
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // A token rotated in by another request meanwhile is kept.
            match self.remove_token_if_current(&sent) {
                Ok(true) => warn!(status = status.as_u16(), "Token refresh rejected, session cleared"),
                Ok(false) => warn!(status = status.as_u16(), "Token refresh rejected, keeping newer token"),
                Err(e) => warn!(error = %e, "Failed to clear stored access token"),
            }
            return Err(SessionError::RefreshFailed {
                status: status.as_u16(),
                message: truncate_body(&body),
            });
        }

        match rotated_token(&response) {
            Some(new_token) => {
                debug!("Refresh returned a rotated token");
                Ok(new_token)
            }
            None => {
                debug!("Refresh succeeded without rotation");
                self.get_token().ok_or(SessionError::NoToken)
            }
        }
    }
}

/// Replacement token carried by a response, if any.
fn rotated_token(response: &Response) -> Option<String> {
    response
        .headers()
        .get(NEW_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
