//! REST API client module for the Talk Vault backend.
//!
//! This module provides the `ApiClient` every page sends its requests
//! through, plus typed calls for the meeting, document and summarizer
//! resources.
//!
//! The API uses JWT bearer token authentication obtained from
//! `/api/auth/login`.

pub mod client;
pub mod error;
pub mod resources;

pub use client::{ApiClient, AuthEvent};
pub use error::ApiError;
pub use resources::{DashboardCounts, SummarySource, DEFAULT_HISTORY_LIMIT};
