//! Login and registration.
//!
//! Both operations turn whatever happened on the wire into an `AuthOutcome`.
//! Nothing here returns `Err`: a failure always carries a message the user
//! can read.

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::models::{LoginRequest, LoginResponse, RegisterReceipt, RegisterRequest};

pub const LOGIN_FALLBACK_MESSAGE: &str = "Login failed. Please try again.";
pub const REGISTER_FALLBACK_MESSAGE: &str = "Registration failed. Please try again.";

/// Result of an auth operation.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome<T> {
    Success(T),
    Failure { message: String },
}

impl<T> AuthOutcome<T> {
    pub fn failure(message: impl Into<String>) -> Self {
        AuthOutcome::Failure {
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AuthOutcome::Success(_))
    }

    /// Failure message, if this is a failure.
    pub fn message(&self) -> Option<&str> {
        match self {
            AuthOutcome::Success(_) => None,
            AuthOutcome::Failure { message } => Some(message),
        }
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> AuthOutcome<U> {
        match self {
            AuthOutcome::Success(value) => AuthOutcome::Success(f(value)),
            AuthOutcome::Failure { message } => AuthOutcome::Failure { message },
        }
    }
}

/// Exchange email and password for a credential and profile.
pub async fn login(api: &ApiClient, email: &str, password: &str) -> AuthOutcome<LoginResponse> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return AuthOutcome::failure("Email and password are required");
    }

    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };

    match api.login(&request).await {
        Ok(response) if response.access_token.is_empty() => {
            warn!("Login response carried an empty access token");
            AuthOutcome::failure(LOGIN_FALLBACK_MESSAGE)
        }
        Ok(response) => {
            info!(username = %response.user.username, "Login accepted");
            AuthOutcome::Success(response)
        }
        Err(e) => {
            warn!(error = %e, "Login failed");
            AuthOutcome::failure(e.detail().unwrap_or(LOGIN_FALLBACK_MESSAGE))
        }
    }
}

/// Create an account. Does not log in.
pub async fn register(api: &ApiClient, request: &RegisterRequest) -> AuthOutcome<RegisterReceipt> {
    if request.email.trim().is_empty()
        || request.username.trim().is_empty()
        || request.password.is_empty()
    {
        return AuthOutcome::failure("Email, username and password are required");
    }

    match api.register(request).await {
        Ok(receipt) => {
            info!(username = %request.username, "Registration accepted");
            AuthOutcome::Success(receipt)
        }
        Err(e) => {
            warn!(error = %e, "Registration failed");
            AuthOutcome::failure(e.detail().unwrap_or(REGISTER_FALLBACK_MESSAGE))
        }
    }
}
