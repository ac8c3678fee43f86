//! API client for the restaurant REST API.
//!
//! `ApiClient` layers the request conventions on top of the session:
//! a 401 triggers one coalesced token refresh and a single retry, and 429
//! responses are retried with exponential backoff.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{validate_password, SessionManager, TokenStore, WHOAMI_PATH};
use crate::config::Config;
use crate::models::{RegisterRequest, RegisterResponse, TokenResponse, UserResponse};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

const LOGIN_PATH: &str = "/api/v1/auth/token";

const REGISTER_PATH: &str = "/api/v1/auth/register";

/// Maximum number of retries for rate-limited (429) requests.
/// 3 retries with exponential backoff usually succeeds without excessive delay.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the restaurant backend.
/// Clone is cheap - the session and reqwest::Client are both shared handles.
#[derive(Clone)]
pub struct ApiClient {
    session: SessionManager,
    initial_backoff: Duration,
}

impl ApiClient {
    /// Create a client for `base_url`, restoring any token saved in `store`.
    pub fn new(
        base_url: &str,
        store: Box<dyn TokenStore>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_session(SessionManager::new(client, base_url, store)))
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = config.token_store()?;
        Ok(Self::new(&config.api_base_url(), store, config.request_timeout())?)
    }

    pub fn with_session(session: SessionManager) -> Self {
        Self {
            session,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
        }
    }

    /// Override the first rate-limit backoff delay.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    // ===== Authentication =====

    /// Log in with username and password and store the issued token.
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenResponse, ApiError> {
        let response = self
            .session
            .request(Method::POST, LOGIN_PATH)
            .form(&[("username", username), ("password", password)])
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse login response: {}", e)))?;

        self.session.set_token(token.access_token.clone())?;
        info!(username = username, "Logged in");
        Ok(token)
    }

    /// Register a new account. The password is checked locally first.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterResponse, ApiError> {
        validate_password(&request.password)?;

        let response = self
            .session
            .request(Method::POST, REGISTER_PATH)
            .json(request)
            .send()
            .await?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse register response: {}", e)))
    }

    /// Fetch the identity behind the current token.
    pub async fn me(&self) -> Result<UserResponse, ApiError> {
        self.get(WHOAMI_PATH).await
    }

    /// Drop the stored token.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.session.remove_token()?;
        info!("Logged out");
        Ok(())
    }

    // ===== Requests =====

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: Response) -> Result<Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    /// Send an authenticated request built by `build`.
    ///
    /// A 401 refreshes the session and retries once; a second 401 is final.
    /// `build` is called again for every attempt.
    pub async fn send<F>(&self, build: F) -> Result<Response, ApiError>
    where
        F: Fn(&SessionManager) -> RequestBuilder,
    {
        let mut refreshed = false;
        let mut retries = 0;
        let mut backoff = self.initial_backoff;

        loop {
            let response = self.session.authenticated_request(build(&self.session)).await?;

            match response.status() {
                status if status.is_success() => return Ok(response),
                StatusCode::UNAUTHORIZED if !refreshed => {
                    debug!("Request unauthorized, refreshing token and retrying");
                    refreshed = true;
                    self.session.refresh().await?;
                }
                StatusCode::UNAUTHORIZED => {
                    warn!("Request still unauthorized after token refresh");
                    return Err(ApiError::Unauthorized);
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(retry = retries, backoff_ms = backoff.as_millis() as u64, "Rate limited, backing off");
                    tokio::time::sleep(backoff).await;
                    backoff *= 2; // Exponential backoff
                }
                status => {
                    let body = response.text().await.unwrap_or_default();
                    return Err(ApiError::from_status(status, &body));
                }
            }
        }
    }

    async fn parse_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T, ApiError> {
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(|s| s.request(Method::GET, path)).await?;
        Self::parse_json(response, path).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.send(|s| s.request(Method::POST, path).json(body)).await?;
        Self::parse_json(response, path).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(|s| s.request(Method::DELETE, path)).await?;
        Ok(())
    }
}
