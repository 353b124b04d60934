//! Per-chapter generation pipeline.

pub mod events;
pub mod runner;

pub use events::{ContentType, ProcessingEvent};
pub use runner::{ChapterPipeline, select_chapter_range};
