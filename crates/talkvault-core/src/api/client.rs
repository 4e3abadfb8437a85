//! API client for communicating with the Talk Vault REST API.
//!
//! Every request from every page goes through one `ApiClient`. The client
//! attaches the bearer credential to outgoing requests and inspects each
//! response: a 401 from any endpoint is reported on the auth event channel
//! before the error is handed back to the caller.

use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use reqwest::{header, multipart, Client, Method, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{LoginRequest, LoginResponse, RegisterReceipt, RegisterRequest, UserProfile};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const REGISTER_PATH: &str = "/api/auth/register";
pub const CURRENT_USER_PATH: &str = "/api/auth/me";

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Signals emitted by the client for the application coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    /// The server answered 401; the credential is no longer accepted.
    Unauthorized { path: String },
}

/// API client for Talk Vault.
/// Clone is cheap and clones share the connection pool and the credential
/// slot, so setting the credential once configures every page.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    credential: Arc<RwLock<Option<String>>>,
    events: mpsc::Sender<AuthEvent>,
}

impl ApiClient {
    /// Create a new API client reporting auth events on `events`.
    pub fn new(config: &Config, events: mpsc::Sender<AuthEvent>) -> Result<Self, ApiError> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .timeout(config.request_timeout())
            .default_headers(default_headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            credential: Arc::new(RwLock::new(None)),
            events,
        })
    }

    /// Set the bearer credential for authenticated requests
    pub fn set_credential(&self, token: impl Into<String>) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Forget the bearer credential. No-op when none is set.
    pub fn clear_credential(&self) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn credential(&self) -> Option<String> {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_credential(&self) -> bool {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Build a request with the credential attached, if there is one.
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.credential() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// Report an authorization failure to the coordinator.
    /// A full channel drops the signal: one pending `Unauthorized` is enough.
    fn signal_unauthorized(&self, path: &str) {
        let event = AuthEvent::Unauthorized {
            path: path.to_string(),
        };
        match self.events.try_send(event) {
            Ok(()) => debug!(path, "Unauthorized signal sent"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(path, "Unauthorized signal already pending")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(path, "No coordinator listening for auth events")
            }
        }
    }

    /// Check if response is successful, returning a classified error if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn intercept_for_retry(
        &self,
        path: &str,
        response: Response,
    ) -> Result<Option<Response>, ApiError> {
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Ok(None);
        }
        self.intercept(path, response).await.map(Some)
    }

    async fn intercept(&self, path: &str, response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(path, status = status.as_u16(), body = %ApiError::truncate_body(&body), "Request failed");

        let error = ApiError::from_status(status, &body);
        if error.is_unauthorized() {
            self.signal_unauthorized(path);
        }
        Err(error)
    }

    /// Send a request built by `build`, retrying with exponential backoff on 429.
    /// Any other failure, 401 included, is returned without retrying.
    async fn send<F>(&self, path: &str, build: F) -> Result<Response, ApiError>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build().send().await?;

            match self.intercept_for_retry(path, response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited);
                    }
                    warn!(path, retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2; // Exponential backoff
                }
            }
        }
    }

    async fn decode<T: DeserializeOwned>(path: &str, response: Response) -> Result<T, ApiError> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse JSON response from {}: {}", path, e))
        })
    }

    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.send(path, || self.request(Method::GET, path)).await?;
        Self::decode(path, response).await
    }

    /// GET with query-string parameters serialized from `query`.
    pub async fn get_json_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T, ApiError> {
        let response = self
            .send(path, || self.request(Method::GET, path).query(query))
            .await?;
        Self::decode(path, response).await
    }

    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send(path, || self.request(Method::POST, path).json(body))
            .await?;
        Self::decode(path, response).await
    }

    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self
            .send(path, || self.request(Method::PUT, path).json(body))
            .await?;
        Self::decode(path, response).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.send(path, || self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    /// POST a multipart form. Forms are consumed by sending, so a 429 is
    /// returned as-is instead of being retried.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: multipart::Form,
    ) -> Result<T, ApiError> {
        let response = self
            .request(Method::POST, path)
            .multipart(form)
            .send()
            .await?;
        let response = self.intercept(path, response).await?;
        Self::decode(path, response).await
    }

    // ========================================================================
    // Auth endpoints
    // ========================================================================

    pub async fn login(&self, request: &LoginRequest) -> Result<LoginResponse, ApiError> {
        self.post_json(LOGIN_PATH, request).await
    }

    /// Register a new account. The success body is optional; an empty or
    /// unexpected body still counts as success.
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterReceipt, ApiError> {
        let response = self
            .send(REGISTER_PATH, || {
                self.request(Method::POST, REGISTER_PATH).json(request)
            })
            .await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes).unwrap_or_default())
    }

    /// Who the current credential belongs to.
    pub async fn current_user(&self) -> Result<UserProfile, ApiError> {
        self.get_json(CURRENT_USER_PATH).await
    }
}
