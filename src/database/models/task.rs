//! Task and chapter database models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Task database model.
/// Links an uploaded document to its derived chapter list.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TaskDbModel {
    pub id: String,
    /// Original filename of the uploaded document.
    pub filename: String,
    /// ISO 8601 timestamp when the task was created.
    pub created_at: String,
}

impl TaskDbModel {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            filename: filename.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Chapter database model.
/// `position` is the 0-based order assigned at segmentation time.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterDbModel {
    pub position: i64,
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_model_new() {
        let task = TaskDbModel::new("doc.txt");
        assert_eq!(task.filename, "doc.txt");
        assert!(uuid::Uuid::parse_str(&task.id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&task.created_at).is_ok());
    }
}
