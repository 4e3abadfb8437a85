//! Top-level coordinator.
//!
//! `App` owns the session store, the navigator and the receiving end of the
//! client's auth event channel. It is the only place that reacts to an
//! `Unauthorized` signal: the session is evicted and the login view shown.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::client::{CURRENT_USER_PATH, LOGIN_PATH};
use crate::api::{ApiClient, AuthEvent};
use crate::auth::{storage, AuthOutcome, SessionState, SessionStore, TokenStore};
use crate::config::Config;
use crate::models::{RegisterReceipt, RegisterRequest, UserProfile};
use crate::nav::{GateDecision, Navigator, View};

/// Buffer size for the auth event channel
const CHANNEL_BUFFER_SIZE: usize = 16;

/// View shown after a successful login
pub const HOME_VIEW: View = View::Dashboard;

pub struct App {
    pub config: Config,
    session: SessionStore,
    navigator: Navigator,
    events: mpsc::Receiver<AuthEvent>,
}

impl App {
    /// Create the application with the storage backend named in `config`.
    pub fn new(config: Config) -> Result<Self> {
        let storage = storage::open(&config)?;
        Self::with_storage(config, storage)
    }

    pub fn with_storage(config: Config, storage: Arc<dyn TokenStore>) -> Result<Self> {
        debug!(base_url = %config.base_url(), storage = ?config.storage, "Creating app");
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let api = ApiClient::new(&config, tx)?;

        Ok(Self {
            config,
            session: SessionStore::new(api, storage),
            navigator: Navigator::new(),
            events: rx,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn api(&self) -> &ApiClient {
        self.session.api()
    }

    pub fn current_view(&self) -> Option<View> {
        self.navigator.current()
    }

    /// Resolve the session, then navigate to `initial`.
    /// The gate only decides after resolution has finished.
    pub async fn start(&mut self, initial: View) -> GateDecision {
        self.drain_events();
        self.session.initialize().await;
        // A 401 from the profile fetch has already been handled by initialize
        self.settle_events(CURRENT_USER_PATH);
        self.navigate(initial)
    }

    /// Navigate to `requested`, processing pending auth events first.
    pub fn navigate(&mut self, requested: View) -> GateDecision {
        self.drain_events();
        let decision = self.navigator.navigate(requested, self.session.state());
        debug!(?requested, ?decision, "Navigation");
        decision
    }

    /// Handle every auth event queued so far. Returns how many were handled.
    pub fn drain_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    /// Wait for the next auth event, for hosts running their own event loop.
    pub async fn next_event(&mut self) -> Option<AuthEvent> {
        self.events.recv().await
    }

    pub fn handle_event(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::Unauthorized { path } => {
                warn!(%path, "Server rejected credential, returning to login");
                self.session.evict();
                self.navigator.force(View::Login);
            }
        }
    }

    /// Handle queued events, except the 401s answered by `own_path`.
    /// Those belong to the operation that just finished and were already
    /// accounted for in its outcome.
    fn settle_events(&mut self, own_path: &str) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                AuthEvent::Unauthorized { ref path } if path == own_path => {
                    debug!(%path, "Ignoring 401 from the call in progress");
                }
                event => self.handle_event(event),
            }
        }
    }

    fn discard_events(&mut self) {
        while self.events.try_recv().is_ok() {}
    }

    pub async fn login(&mut self, email: &str, password: &str) -> AuthOutcome<UserProfile> {
        // A 401 already queued from a page belongs to the previous session
        self.drain_events();
        let outcome = self.session.login(email, password).await;
        // A rejected login answers 401; the session was already logged out
        self.settle_events(LOGIN_PATH);
        if outcome.is_success() {
            info!("Login successful");
            self.config.last_email = Some(email.trim().to_string());
            self.navigate(HOME_VIEW);
        }
        outcome
    }

    /// Register, then send the user to the login view. Does not log in.
    pub async fn register(&mut self, request: &RegisterRequest) -> AuthOutcome<RegisterReceipt> {
        let outcome = self.session.register(request).await;
        self.drain_events();
        if outcome.is_success() {
            self.navigator.force(View::Login);
        }
        outcome
    }

    pub fn logout(&mut self) {
        self.session.logout();
        self.discard_events();
        self.navigator.force(View::Login);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemoryTokenStore;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn app_with(storage: &MemoryTokenStore) -> (MockServer, App) {
        let server = MockServer::start().await;
        let config = Config {
            api_base_url: server.uri(),
            ..Config::default()
        };
        let app = App::with_storage(config, Arc::new(storage.clone())).unwrap();
        (server, app)
    }

    async fn mount_me(server: &MockServer, token: &str) {
        Mock::given(method("GET"))
            .and(path(CURRENT_USER_PATH))
            .and(header("authorization", format!("Bearer {}", token).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "username": "u1", "email": "user@example.com", "is_active": true
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_start_without_credential_redirects_to_login() {
        let storage = MemoryTokenStore::default();
        let (server, mut app) = app_with(&storage).await;

        assert_eq!(app.navigate(View::Dashboard), GateDecision::Loading);
        assert_eq!(app.current_view(), None);

        let decision = app.start(View::Dashboard).await;
        assert_eq!(decision, GateDecision::Redirect(View::Login));
        assert_eq!(app.current_view(), Some(View::Login));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_with_valid_credential_renders() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;

        let decision = app.start(View::Meetings).await;
        assert_eq!(decision, GateDecision::Render(View::Meetings));
        assert_eq!(app.session().user().map(|u| u.username.as_str()), Some("u1"));
    }

    #[tokio::test]
    async fn test_start_with_expired_credential_clears_it() {
        let storage = MemoryTokenStore::with_token("expired");
        let (server, mut app) = app_with(&storage).await;
        Mock::given(method("GET"))
            .and(path(CURRENT_USER_PATH))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let decision = app.start(View::Dashboard).await;
        assert_eq!(decision, GateDecision::Redirect(View::Login));
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_unauthorized_from_any_page_evicts_and_redirects() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/documents/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        app.start(View::Documents).await;
        assert_eq!(app.current_view(), Some(View::Documents));

        let page = app.api().clone();
        let err = page.list_documents().await.unwrap_err();
        assert!(err.is_unauthorized());

        assert_eq!(app.drain_events(), 1);
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(app.current_view(), Some(View::Login));
        assert_eq!(app.state(), &SessionState::logged_out());
        assert!(!app.api().has_credential());

        // The protected page stays out of reach
        assert_eq!(app.navigate(View::Documents), GateDecision::Redirect(View::Login));
    }

    #[tokio::test]
    async fn test_next_event_delivers_unauthorized() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/meetings/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        app.start(View::Meetings).await;
        let _ = app.api().list_meetings().await;

        let event = app.next_event().await.unwrap();
        assert_eq!(
            event,
            AuthEvent::Unauthorized { path: "/api/meetings/".to_string() }
        );
        app.handle_event(event);
        assert_eq!(app.current_view(), Some(View::Login));
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_new_with_memory_storage() {
        let config = Config {
            storage: crate::config::StorageKind::Memory,
            ..Config::default()
        };
        let mut app = App::new(config).unwrap();
        assert!(app.state().is_loading);
        assert_eq!(app.start(View::Login).await, GateDecision::Render(View::Login));
        assert!(!app.state().is_loading);
    }

    #[tokio::test]
    async fn test_navigate_processes_pending_unauthorized() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/meetings/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        app.start(View::Dashboard).await;
        let _ = app.api().list_meetings().await;

        assert_eq!(app.navigate(View::Profile), GateDecision::Redirect(View::Login));
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_then_logout() {
        let storage = MemoryTokenStore::default();
        let (server, mut app) = app_with(&storage).await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok1",
                "user": {"username": "u1"}
            })))
            .mount(&server)
            .await;

        app.start(View::Dashboard).await;
        let outcome = app.login("user@example.com", "password123").await;
        assert!(outcome.is_success());
        assert_eq!(app.current_view(), Some(HOME_VIEW));
        assert_eq!(app.config.last_email.as_deref(), Some("user@example.com"));
        assert_eq!(storage.load().unwrap().as_deref(), Some("tok1"));

        app.logout();
        assert_eq!(app.state(), &SessionState::logged_out());
        assert_eq!(app.current_view(), Some(View::Login));
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_wrong_password_stays_on_login() {
        let storage = MemoryTokenStore::default();
        let (server, mut app) = app_with(&storage).await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Incorrect email or password"})),
            )
            .mount(&server)
            .await;

        app.start(View::Dashboard).await;
        let outcome = app.login("user@example.com", "nope").await;
        assert_eq!(outcome.message(), Some("Incorrect email or password"));
        assert_eq!(app.current_view(), Some(View::Login));
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(app.drain_events(), 0);
    }

    #[tokio::test]
    async fn test_failed_login_still_applies_pending_page_401() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/meetings/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(serde_json::json!({"detail": "Incorrect email or password"})),
            )
            .mount(&server)
            .await;

        app.start(View::Dashboard).await;
        assert!(app.api().list_meetings().await.unwrap_err().is_unauthorized());

        let outcome = app.login("user@example.com", "typo").await;
        assert_eq!(outcome.message(), Some("Incorrect email or password"));
        assert_eq!(storage.load().unwrap(), None);
        assert_eq!(app.current_view(), Some(View::Login));
        assert_eq!(app.session().state().phase(), crate::auth::SessionPhase::Unauthenticated);
        assert_eq!(app.drain_events(), 0);
    }

    #[tokio::test]
    async fn test_successful_login_after_page_401_keeps_new_session() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/documents/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(LOGIN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok2",
                "user": {"username": "u1"}
            })))
            .mount(&server)
            .await;

        app.start(View::Documents).await;
        let _ = app.api().list_documents().await;

        assert!(app.login("user@example.com", "password123").await.is_success());
        assert_eq!(storage.load().unwrap().as_deref(), Some("tok2"));
        assert_eq!(app.api().credential().as_deref(), Some("tok2"));
        assert_eq!(app.current_view(), Some(HOME_VIEW));
    }

    #[tokio::test]
    async fn test_restart_applies_pending_page_401_before_restoring() {
        let storage = MemoryTokenStore::with_token("tok1");
        let (server, mut app) = app_with(&storage).await;
        mount_me(&server, "tok1").await;
        Mock::given(method("GET"))
            .and(path("/api/meetings/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        app.start(View::Meetings).await;
        let _ = app.api().list_meetings().await;

        let decision = app.start(View::Meetings).await;
        assert_eq!(decision, GateDecision::Redirect(View::Login));
        assert_eq!(storage.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_register_moves_to_login_view() {
        let storage = MemoryTokenStore::default();
        let (server, mut app) = app_with(&storage).await;
        Mock::given(method("POST"))
            .and(path("/api/auth/register"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        app.start(View::Register).await;
        assert_eq!(app.current_view(), Some(View::Register));

        let request = RegisterRequest {
            email: "user@example.com".to_string(),
            username: "u1".to_string(),
            full_name: None,
            password: "password123".to_string(),
        };
        assert!(app.register(&request).await.is_success());
        assert_eq!(app.current_view(), Some(View::Login));
        assert!(!app.session().is_authenticated());
    }
}
