//! Processing events and content types for the streaming pipeline.

use serde::{Deserialize, Serialize};

/// Generation style selecting script and image generation behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContentType {
    #[serde(rename = "VS")]
    Vs,
    #[default]
    #[serde(rename = "KeyMoment", alias = "Key Moment")]
    KeyMoment,
    #[serde(rename = "KeyCharacter", alias = "Key Character")]
    KeyCharacter,
    #[serde(rename = "Quiz")]
    Quiz,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vs => "VS",
            Self::KeyMoment => "KeyMoment",
            Self::KeyCharacter => "KeyCharacter",
            Self::Quiz => "Quiz",
        }
    }
}

/// Event emitted on the streaming connection while a task is processed.
///
/// Serialized as newline-delimited JSON objects tagged by `status`, e.g.
/// `{"status":"processing","chapter":1,"total_chapters":2}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProcessingEvent {
    /// A chapter has started processing. `chapter` is the 1-based position
    /// within the selected range.
    Processing {
        chapter: usize,
        total_chapters: usize,
    },
    /// A chapter finished; carries the artifact location and title.
    ChapterComplete {
        video_path: String,
        chapter_title: String,
    },
    /// All selected chapters succeeded.
    Completed { message: String },
    /// Processing aborted; no further events follow.
    Error { message: String },
}

impl ProcessingEvent {
    pub fn completed() -> Self {
        Self::Completed {
            message: "All chapters processed successfully".to_string(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
