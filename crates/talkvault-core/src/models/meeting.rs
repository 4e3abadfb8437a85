// Allow dead code: API response structs have fields for completeness
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl MeetingStatus {
    pub fn label(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "Scheduled",
            MeetingStatus::InProgress => "In progress",
            MeetingStatus::Completed => "Completed",
            MeetingStatus::Cancelled => "Cancelled",
            MeetingStatus::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(alias = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: MeetingStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub scheduled_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_minutes: Option<i64>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for creating a meeting.
#[derive(Debug, Clone, Serialize)]
pub struct NewMeeting {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub scheduled_time: DateTime<Utc>,
    pub duration_minutes: Option<i64>,
    pub participants: Vec<String>,
    pub tags: Vec<String>,
}

impl NewMeeting {
    pub fn new(title: impl Into<String>, scheduled_time: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            description: None,
            scheduled_time,
            duration_minutes: Some(60),
            participants: Vec::new(),
            tags: Vec::new(),
        }
    }
}
