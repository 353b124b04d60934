//! Video assembly via ffmpeg.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Merges script, audio, subtitles and image into a video artifact.
#[async_trait]
pub trait VideoProcessor: Send + Sync {
    async fn create_video(
        &self,
        script: &str,
        audio_path: &Path,
        subtitles_path: &Path,
        image_path: &Path,
    ) -> Result<PathBuf>;
}

/// `VideoProcessor` implementation that spawns an ffmpeg subprocess.
pub struct FfmpegVideoProcessor {
    ffmpeg_path: String,
    output_dir: PathBuf,
}

impl FfmpegVideoProcessor {
    pub fn new(ffmpeg_path: impl Into<String>, output_dir: PathBuf) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            output_dir,
        }
    }
}

/// Keep only the last few stderr lines; ffmpeg prints a long banner before
/// the actual failure reason.
fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}

#[async_trait]
impl VideoProcessor for FfmpegVideoProcessor {
    async fn create_video(
        &self,
        script: &str,
        audio_path: &Path,
        subtitles_path: &Path,
        image_path: &Path,
    ) -> Result<PathBuf> {
        let output_path = self
            .output_dir
            .join(format!("chapter-{}.mp4", uuid::Uuid::new_v4()));

        let title = script.lines().next().unwrap_or_default().trim();

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.arg("-y")
            .arg("-loop")
            .arg("1")
            .arg("-i")
            .arg(image_path)
            .arg("-i")
            .arg(audio_path)
            .arg("-vf")
            .arg(format!("subtitles={}", subtitles_path.display()))
            .arg("-c:v")
            .arg("libx264")
            .arg("-tune")
            .arg("stillimage")
            .arg("-c:a")
            .arg("aac")
            .arg("-metadata")
            .arg(format!("title={title}"))
            .arg("-shortest")
            .arg(&output_path);

        debug!(command = ?cmd.as_std(), "Running ffmpeg merge");
        let output = cmd.output().await.map_err(|e| {
            Error::MediaProcessing(format!(
                "Failed to spawn '{}': {e}",
                self.ffmpeg_path
            ))
        })?;

        if !output.status.success() {
            return Err(Error::MediaProcessing(format!(
                "ffmpeg exited with code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr_tail(&output.stderr, 8)
            )));
        }

        info!(video = %output_path.display(), "Chapter video assembled");
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stderr_tail_keeps_last_lines() {
        let stderr = b"line1\nline2\nline3\nline4";
        assert_eq!(stderr_tail(stderr, 2), "line3\nline4");
        assert_eq!(stderr_tail(stderr, 10), "line1\nline2\nline3\nline4");
    }

    #[tokio::test]
    async fn test_create_video_reports_missing_binary() {
        let processor =
            FfmpegVideoProcessor::new("definitely-not-ffmpeg", PathBuf::from("/tmp"));
        let err = processor
            .create_video(
                "script",
                Path::new("a.mp3"),
                Path::new("s.srt"),
                Path::new("i.png"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MediaProcessing(_)));
        assert!(err.to_string().contains("definitely-not-ffmpeg"));
    }
}
