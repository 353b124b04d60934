//! Database models.

pub mod task;

pub use task::{ChapterDbModel, TaskDbModel};
