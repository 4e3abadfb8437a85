use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

/// Result of `POST /api/generate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub transcript: String,
    pub summary: String,
    /// Id of the stored history entry; absent when the server could not save it
    #[serde(default)]
    pub saved_id: Option<String>,
}

/// A stored summary, as listed by `GET /api/history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
    #[serde(default)]
    pub summary_text: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl SummaryEntry {
    /// First line of the summary, shortened for list views.
    pub fn headline(&self, max_chars: usize) -> String {
        let text = self
            .summary_text
            .as_deref()
            .and_then(|s| s.lines().find(|l| !l.trim().is_empty()))
            .unwrap_or("(empty summary)")
            .trim();
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
            format!("{}...", cut.trim_end())
        }
    }
}

/// Envelope of `GET /api/history`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryHistory {
    #[serde(default)]
    pub items: Vec<SummaryEntry>,
}
