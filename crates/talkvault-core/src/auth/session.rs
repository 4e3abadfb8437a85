//! Session state and the store that owns it.
//!
//! `SessionStore` resolves the stored credential at startup, logs in and out,
//! and evicts the session when the coordinator reports a rejected credential.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::models::{RegisterReceipt, RegisterRequest, UserProfile};

use super::flow::{self, AuthOutcome};
use super::storage::TokenStore;

/// Snapshot of who is logged in.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionState {
    pub credential: Option<String>,
    pub user: Option<UserProfile>,
    pub is_loading: bool,
}

impl SessionState {
    /// State before `initialize()` has finished.
    pub fn resolving() -> Self {
        Self {
            credential: None,
            user: None,
            is_loading: true,
        }
    }

    pub fn logged_out() -> Self {
        Self {
            credential: None,
            user: None,
            is_loading: false,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        if self.is_loading {
            SessionPhase::Resolving
        } else if self.user.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Unauthenticated
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Resolving,
    Authenticated,
    Unauthenticated,
}

/// Single owner of the credential and profile.
///
/// Writes go to durable storage and to the `ApiClient` credential slot and
/// nowhere else; navigation is the caller's business.
pub struct SessionStore {
    api: ApiClient,
    storage: Arc<dyn TokenStore>,
    state: SessionState,
}

impl SessionStore {
    pub fn new(api: ApiClient, storage: Arc<dyn TokenStore>) -> Self {
        Self {
            api,
            storage,
            state: SessionState::resolving(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn user(&self) -> Option<&UserProfile> {
        self.state.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.phase() == SessionPhase::Authenticated
    }

    /// The client pages send their requests through.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Resolve the session from durable storage.
    ///
    /// With no stored credential this finishes without any network traffic.
    /// Otherwise the profile is fetched once; any failure, transient or not,
    /// evicts the credential.
    pub async fn initialize(&mut self) -> &SessionState {
        let stored = match self.storage.load() {
            Ok(stored) => stored,
            Err(e) => {
                warn!(error = %e, "Failed to read stored credential, starting logged out");
                self.erase_credential();
                None
            }
        };

        let Some(token) = stored else {
            debug!("No stored credential");
            self.state = SessionState::logged_out();
            return &self.state;
        };

        self.api.set_credential(token.clone());
        match self.api.current_user().await {
            Ok(user) => {
                info!(username = %user.username, "Session restored");
                self.state = SessionState {
                    credential: Some(token),
                    user: Some(user),
                    is_loading: false,
                };
            }
            Err(e) => {
                warn!(error = %e, "Stored credential rejected, clearing session");
                self.erase_credential();
                self.state = SessionState::logged_out();
            }
        }
        &self.state
    }

    /// Log in and establish the session. Durable storage is only written on
    /// success.
    pub async fn login(&mut self, email: &str, password: &str) -> AuthOutcome<UserProfile> {
        match flow::login(&self.api, email, password).await {
            AuthOutcome::Success(response) => {
                if let Err(e) = self.storage.save(&response.access_token) {
                    // The session still works for this run
                    warn!(error = %e, "Failed to persist credential");
                }
                self.api.set_credential(response.access_token.clone());
                self.state = SessionState {
                    credential: Some(response.access_token),
                    user: Some(response.user.clone()),
                    is_loading: false,
                };
                AuthOutcome::Success(response.user)
            }
            AuthOutcome::Failure { message } => AuthOutcome::Failure { message },
        }
    }

    /// Create an account. The session is left as it was.
    pub async fn register(&self, request: &RegisterRequest) -> AuthOutcome<RegisterReceipt> {
        flow::register(&self.api, request).await
    }

    /// Forget the session locally. The server is not contacted.
    pub fn logout(&mut self) {
        info!("Logging out");
        self.erase_credential();
        self.state = SessionState::logged_out();
    }

    /// Drop the session after the server refused the credential.
    /// Same effect as `logout`; repeated calls are harmless.
    pub fn evict(&mut self) {
        if self.state.credential.is_some() {
            info!("Credential rejected by server, evicting session");
        }
        self.erase_credential();
        self.state = SessionState::logged_out();
    }

    fn erase_credential(&self) {
        self.api.clear_credential();
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear stored credential");
        }
    }
}
