//! Authentication module for managing the user session and its credential.
//!
//! This module provides:
//! - `SessionStore`: single owner of the credential and user profile
//! - `flow`: login and registration producing an `AuthOutcome`
//! - `TokenStore`: durable credential storage (file, OS keyring, memory)
//!
//! The credential is persisted under one fixed key so it survives restarts;
//! it is erased on logout or when the server rejects it.

pub mod flow;
pub mod session;
pub mod storage;

pub use flow::AuthOutcome;
pub use session::{SessionPhase, SessionState, SessionStore};
pub use storage::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
