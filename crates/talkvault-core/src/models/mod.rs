//! Data models for Talk Vault entities.
//!
//! This module contains the wire types exchanged with the Talk Vault API:
//!
//! - `UserProfile` and the login/registration payloads
//! - `Meeting`, `Document`: resources listed by the dashboard pages
//! - `Summary`, `SummaryEntry`: summarizer result and stored summary history

pub mod document;
pub mod meeting;
pub mod summary;
pub mod timestamp;
pub mod user;

pub use document::{Document, ProcessingStatus};
pub use meeting::{Meeting, MeetingStatus, NewMeeting};
pub use summary::{Summary, SummaryEntry, SummaryHistory};
pub use user::{LoginRequest, LoginResponse, RegisterReceipt, RegisterRequest, UserProfile};
