//! Sequential per-chapter generation driver.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::database::models::ChapterDbModel;
use crate::error::Result;
use crate::pipeline::{ContentType, ProcessingEvent};
use crate::services::ai::AiProcessor;
use crate::services::video::VideoProcessor;

/// Select the inclusive chapter range `[start, end]`, clamped to the stored
/// chapter count. An empty selection (start past the end, or start > end) is
/// valid and yields an immediate completion.
pub fn select_chapter_range(
    chapters: &[ChapterDbModel],
    start: usize,
    end: usize,
) -> &[ChapterDbModel] {
    if start >= chapters.len() || start > end {
        return &[];
    }
    let end = end.saturating_add(1).min(chapters.len());
    &chapters[start..end]
}

/// Drives the per-chapter pipeline and reports progress over a channel.
///
/// Chapters are processed strictly sequentially; the first stage failure
/// aborts the remaining chapters with a single error event. Event send
/// failures mean the client is gone, which also ends the run.
pub struct ChapterPipeline {
    ai: Arc<dyn AiProcessor>,
    video: Arc<dyn VideoProcessor>,
    inter_chapter_delay: Duration,
}

impl ChapterPipeline {
    pub fn new(
        ai: Arc<dyn AiProcessor>,
        video: Arc<dyn VideoProcessor>,
        inter_chapter_delay: Duration,
    ) -> Self {
        Self {
            ai,
            video,
            inter_chapter_delay,
        }
    }

    /// Run all stages for one chapter and return the video artifact path.
    async fn process_chapter(
        &self,
        chapter: &ChapterDbModel,
        content_type: ContentType,
    ) -> Result<std::path::PathBuf> {
        let script = self
            .ai
            .generate_script(&chapter.title, content_type)
            .await?;
        let audio_path = self.ai.generate_voiceover(&script).await?;
        let subtitles_path = self.ai.generate_subtitles(&audio_path).await?;
        let image_path = self.ai.generate_image(&script, content_type).await?;
        self.video
            .create_video(&script, &audio_path, &subtitles_path, &image_path)
            .await
    }

    /// Process the selected chapters in order, emitting events into `tx`.
    pub async fn run(
        &self,
        chapters: &[ChapterDbModel],
        content_type: ContentType,
        tx: mpsc::Sender<ProcessingEvent>,
    ) {
        let total = chapters.len();

        for (idx, chapter) in chapters.iter().enumerate() {
            let event = ProcessingEvent::Processing {
                chapter: idx + 1,
                total_chapters: total,
            };
            if tx.send(event).await.is_err() {
                warn!("Client disconnected, aborting pipeline");
                return;
            }

            info!(
                chapter = %chapter.title,
                position = idx + 1,
                total,
                "Processing chapter"
            );

            match self.process_chapter(chapter, content_type).await {
                Ok(video_path) => {
                    let event = ProcessingEvent::ChapterComplete {
                        video_path: video_path.display().to_string(),
                        chapter_title: chapter.title.clone(),
                    };
                    if tx.send(event).await.is_err() {
                        warn!("Client disconnected, aborting pipeline");
                        return;
                    }
                }
                Err(e) => {
                    warn!(chapter = %chapter.title, error = %e, "Chapter processing failed");
                    let _ = tx.send(ProcessingEvent::error(e.to_string())).await;
                    return;
                }
            }

            // Cosmetic pacing between chapters, not a correctness requirement.
            if idx + 1 < total && !self.inter_chapter_delay.is_zero() {
                tokio::time::sleep(self.inter_chapter_delay).await;
            }
        }

        let _ = tx.send(ProcessingEvent::completed()).await;
    }
}
