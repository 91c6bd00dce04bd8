//! Read-only records handed in by the storage collaborator.
//!
//! These mirror what the persistence layer exports as JSON. The core never
//! mutates them; the learner and the course matcher only read snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted task as seen by the learner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub course: Option<String>,
    #[serde(default)]
    pub estimated_minutes: Option<u32>,
}

/// A logged study session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Task this session was logged against, if any
    #[serde(default)]
    pub task_id: Option<String>,
    /// Course stated directly on the session
    #[serde(default)]
    pub course: Option<String>,
    /// Free-form activity kind ("reading", "internship", ...)
    #[serde(default)]
    pub activity: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub minutes: u32,
    pub logged_at: DateTime<Utc>,
}

/// A course as stored by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseRecord {
    pub id: String,
    #[serde(default)]
    pub code: Option<String>,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_snapshot_accepts_sparse_json() {
        let json = r#"{"minutes": 45, "loggedAt": "2025-02-01T15:00:00Z"}"#;
        let session: SessionSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(session.minutes, 45);
        assert!(session.task_id.is_none());
        assert!(session.notes.is_none());
    }

    #[test]
    fn task_snapshot_uses_camel_case() {
        let json = r#"{"id": "t1", "course": "Torts", "estimatedMinutes": 50}"#;
        let task: TaskSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(task.estimated_minutes, Some(50));
        assert_eq!(task.title, "");
    }
}
