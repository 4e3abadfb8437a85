//! Typed calls for the resources the pages display.
//!
//! These are thin wrappers over the generic client helpers; credential
//! attachment and 401 handling come from `ApiClient` itself.

use std::path::Path;

use reqwest::multipart;
use serde::Serialize;
use tracing::warn;

use crate::models::{Document, Meeting, NewMeeting, Summary, SummaryEntry, SummaryHistory};

use super::{ApiClient, ApiError};

const MEETINGS_PATH: &str = "/api/meetings/";
const DOCUMENTS_PATH: &str = "/api/documents/";
const SUMMARIZE_PATH: &str = "/api/generate";
const HISTORY_PATH: &str = "/api/history";

/// Page size the server uses when no limit is given
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Input for the summarizer: an audio recording to transcribe or a ready
/// transcript.
#[derive(Debug, Clone)]
pub enum SummarySource {
    Audio {
        file_name: String,
        bytes: Vec<u8>,
    },
    Transcript(String),
}

impl SummarySource {
    /// Read an audio file from disk.
    pub async fn from_audio_file(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "recording".to_string());
        Ok(SummarySource::Audio { file_name, bytes })
    }
}

#[derive(Debug, Serialize)]
struct HistoryQuery<'a> {
    limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<&'a str>,
}

/// Item counts shown on the dashboard. `None` means that list failed to load.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardCounts {
    pub meetings: Option<usize>,
    pub documents: Option<usize>,
}

impl ApiClient {
    pub async fn list_meetings(&self) -> Result<Vec<Meeting>, ApiError> {
        self.get_json(MEETINGS_PATH).await
    }

    pub async fn create_meeting(&self, meeting: &NewMeeting) -> Result<Meeting, ApiError> {
        self.post_json(MEETINGS_PATH, meeting).await
    }

    pub async fn list_documents(&self) -> Result<Vec<Document>, ApiError> {
        self.get_json(DOCUMENTS_PATH).await
    }

    /// Transcribe (for audio) and summarize. `username` is recorded as the
    /// author of the stored summary.
    pub async fn summarize(
        &self,
        source: SummarySource,
        username: Option<&str>,
    ) -> Result<Summary, ApiError> {
        let mut form = match source {
            SummarySource::Audio { file_name, bytes } => multipart::Form::new()
                .part("audio_file", multipart::Part::bytes(bytes).file_name(file_name)),
            SummarySource::Transcript(text) => multipart::Form::new().text("transcript", text),
        };
        if let Some(name) = username {
            form = form.text("username", name.to_string());
        }
        self.post_multipart(SUMMARIZE_PATH, form).await
    }

    /// Stored summaries, newest first. With `username`, only that author's.
    pub async fn summary_history(
        &self,
        limit: u32,
        username: Option<&str>,
    ) -> Result<Vec<SummaryEntry>, ApiError> {
        let query = HistoryQuery { limit, username };
        let history: SummaryHistory = self.get_json_query(HISTORY_PATH, &query).await?;
        Ok(history.items)
    }

    /// One stored summary, addressed by the `saved_id` the summarizer returned.
    pub async fn summary_detail(&self, id: &str) -> Result<SummaryEntry, ApiError> {
        self.get_json(&format!("{}/{}", HISTORY_PATH, id)).await
    }

    /// Fetch both dashboard lists concurrently. The two requests are
    /// independent: one failing does not affect the other.
    pub async fn dashboard(&self) -> DashboardCounts {
        let (meetings, documents) = futures::join!(self.list_meetings(), self.list_documents());

        let meetings = match meetings {
            Ok(list) => Some(list.len()),
            Err(e) => {
                warn!(error = %e, "Failed to load meetings for dashboard");
                None
            }
        };
        let documents = match documents {
            Ok(list) => Some(list.len()),
            Err(e) => {
                warn!(error = %e, "Failed to load documents for dashboard");
                None
            }
        };

        DashboardCounts { meetings, documents }
    }
}
