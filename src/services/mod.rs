//! Service container for dependency injection.
//!
//! Processors and the task repository are constructed once at process start
//! and passed into request handlers by reference.

pub mod ai;
pub mod file;
pub mod video;

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::config::AppConfig;
use crate::database::repositories::{SqlxTaskRepository, TaskRepository};
use crate::error::Result;
use ai::{AiProcessor, OpenAiProcessor};
use file::FileProcessor;
use video::{FfmpegVideoProcessor, VideoProcessor};

/// Service container holding all application services.
pub struct ServiceContainer {
    /// Database connection pool.
    pub pool: SqlitePool,
    /// Task store.
    pub task_repository: Arc<dyn TaskRepository>,
    /// Document text extraction.
    pub file_processor: Arc<FileProcessor>,
    /// External AI collaborator.
    pub ai_processor: Arc<dyn AiProcessor>,
    /// Video assembly.
    pub video_processor: Arc<dyn VideoProcessor>,
}

impl ServiceContainer {
    /// Create a new service container with the given database pool.
    pub async fn new(pool: SqlitePool, config: &AppConfig) -> Result<Self> {
        info!("Initializing service container");

        // Make sure working directories exist before any request arrives.
        tokio::fs::create_dir_all(&config.upload_dir).await?;
        tokio::fs::create_dir_all(&config.media_dir).await?;
        tokio::fs::create_dir_all(&config.output_dir).await?;

        let task_repository: Arc<dyn TaskRepository> =
            Arc::new(SqlxTaskRepository::new(pool.clone()));
        let ai_processor: Arc<dyn AiProcessor> = Arc::new(OpenAiProcessor::new(
            config.ai.clone(),
            config.media_dir.clone(),
        ));
        let video_processor: Arc<dyn VideoProcessor> = Arc::new(FfmpegVideoProcessor::new(
            config.ffmpeg_path.clone(),
            config.output_dir.clone(),
        ));

        Ok(Self {
            pool,
            task_repository,
            file_processor: Arc::new(FileProcessor::new()),
            ai_processor,
            video_processor,
        })
    }
}
