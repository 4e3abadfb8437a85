// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    #[default]
    Pending,
    Processing,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl ProcessingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "Pending",
            ProcessingStatus::Processing => "Processing",
            ProcessingStatus::Completed => "Completed",
            ProcessingStatus::Failed => "Failed",
            ProcessingStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(alias = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub file_type: Option<String>,
    #[serde(default)]
    pub meeting_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub processing_status: ProcessingStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Document {
    /// Title if set, else the uploaded file name, else the id.
    pub fn display_name(&self) -> &str {
        self.title
            .as_deref()
            .or(self.original_filename.as_deref())
            .unwrap_or(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        let doc: Document = serde_json::from_str(
            r#"{"_id": "d1", "original_filename": "notes.pdf", "processing_status": "completed"}"#,
        )
        .unwrap();
        assert_eq!(doc.display_name(), "notes.pdf");
        assert_eq!(doc.processing_status, ProcessingStatus::Completed);

        let bare: Document = serde_json::from_str(r#"{"id": "d2"}"#).unwrap();
        assert_eq!(bare.display_name(), "d2");
        assert_eq!(bare.processing_status, ProcessingStatus::Pending);
    }
}
