//! Task repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::{ChapterDbModel, TaskDbModel};
use crate::error::{Error, Result};

/// Task repository trait.
///
/// A successful `store_task` must be immediately visible to a subsequent
/// `get_chapters` call since the upload and streaming endpoints run in
/// separate requests.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Store a task and its ordered chapter titles in one transaction.
    async fn store_task(&self, task_id: &str, filename: &str, chapters: &[String]) -> Result<()>;

    /// Fetch a task by id.
    async fn get_task(&self, task_id: &str) -> Result<TaskDbModel>;

    /// Fetch the ordered chapters for a task. Fails with `Error::NotFound`
    /// if the task does not exist.
    async fn get_chapters(&self, task_id: &str) -> Result<Vec<ChapterDbModel>>;
}

/// SQLx implementation of TaskRepository.
pub struct SqlxTaskRepository {
    pool: SqlitePool,
}

impl SqlxTaskRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepository for SqlxTaskRepository {
    async fn store_task(&self, task_id: &str, filename: &str, chapters: &[String]) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO task (id, filename, created_at) VALUES (?, ?, ?)")
            .bind(task_id)
            .bind(filename)
            .bind(&now)
            .execute(&mut *tx)
            .await?;

        for (position, title) in chapters.iter().enumerate() {
            sqlx::query("INSERT INTO chapter (task_id, position, title) VALUES (?, ?, ?)")
                .bind(task_id)
                .bind(position as i64)
                .bind(title)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_task(&self, task_id: &str) -> Result<TaskDbModel> {
        sqlx::query_as::<_, TaskDbModel>("SELECT * FROM task WHERE id = ?")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Task", task_id))
    }

    async fn get_chapters(&self, task_id: &str) -> Result<Vec<ChapterDbModel>> {
        // Distinguish an unknown task from a task with zero chapters.
        self.get_task(task_id).await?;

        let chapters = sqlx::query_as::<_, ChapterDbModel>(
            "SELECT position, title FROM chapter WHERE task_id = ? ORDER BY position",
        )
        .bind(task_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chapters)
    }
}
