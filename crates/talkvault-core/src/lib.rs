//! Talk Vault client core.
//!
//! This crate holds everything a Talk Vault front end needs to talk to the
//! API on behalf of a logged-in user:
//!
//! - `api`: the shared `ApiClient` that attaches the bearer credential and
//!   reports 401 responses
//! - `auth`: the session store, login/registration and credential storage
//! - `nav`: views and the navigation gate
//! - `app`: the coordinator tying the pieces together
//! - `config`, `models`: configuration and wire types

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod models;
pub mod nav;

pub use api::{ApiClient, ApiError, AuthEvent};
pub use app::App;
pub use auth::{AuthOutcome, SessionPhase, SessionState, SessionStore, TokenStore};
pub use config::{Config, StorageKind};
pub use nav::{GateDecision, Navigator, View};
