//! Application configuration loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Default upload size limit (100 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Default pause between chapters in the streaming pipeline.
const DEFAULT_INTER_CHAPTER_DELAY_MS: u64 = 1000;

/// Configuration for the external AI collaborator (OpenAI-compatible API).
#[derive(Debug, Clone)]
pub struct AiConfig {
    /// Base URL of the API, without trailing slash.
    pub base_url: String,
    /// Bearer token for authentication.
    pub api_key: String,
    /// Model used for segmentation and script generation.
    pub chat_model: String,
    /// Model used for voice synthesis.
    pub tts_model: String,
    /// Voice preset for synthesis.
    pub tts_voice: String,
    /// Model used for subtitle transcription.
    pub transcription_model: String,
    /// Model used for image generation.
    pub image_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            chat_model: "gpt-4o-mini".to_string(),
            tts_model: "tts-1".to_string(),
            tts_voice: "alloy".to_string(),
            transcription_model: "whisper-1".to_string(),
            image_model: "dall-e-3".to_string(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite database URL.
    pub database_url: String,
    /// Directory for scoped temporary upload files.
    pub upload_dir: PathBuf,
    /// Directory for intermediate media artifacts (audio, subtitles, images).
    pub media_dir: PathBuf,
    /// Directory for finished chapter videos.
    pub output_dir: PathBuf,
    /// Maximum accepted upload size in bytes.
    pub max_upload_bytes: usize,
    /// Pause between chapters in the streaming pipeline.
    pub inter_chapter_delay: Duration,
    /// Path to the ffmpeg binary.
    pub ffmpeg_path: String,
    /// External AI collaborator settings.
    pub ai: AiConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite:storyreel.db?mode=rwc".to_string(),
            upload_dir: PathBuf::from("./data/uploads"),
            media_dir: PathBuf::from("./data/media"),
            output_dir: PathBuf::from("./data/videos"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            inter_chapter_delay: Duration::from_millis(DEFAULT_INTER_CHAPTER_DELAY_MS),
            ffmpeg_path: "ffmpeg".to_string(),
            ai: AiConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    ///
    /// Supported env vars: `DATABASE_URL`, `UPLOAD_DIR`, `MEDIA_DIR`,
    /// `OUTPUT_DIR`, `MAX_UPLOAD_BYTES`, `INTER_CHAPTER_DELAY_MS`,
    /// `FFMPEG_PATH`, `OPENAI_BASE_URL`, `OPENAI_API_KEY`, `CHAT_MODEL`,
    /// `TTS_MODEL`, `TTS_VOICE`, `TRANSCRIPTION_MODEL`, `IMAGE_MODEL`.
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("DATABASE_URL")
            && !url.trim().is_empty()
        {
            config.database_url = url;
        }
        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("MEDIA_DIR") {
            config.media_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(bytes) = std::env::var("MAX_UPLOAD_BYTES")
            && let Ok(parsed) = bytes.parse::<usize>()
        {
            config.max_upload_bytes = parsed;
        }
        if let Ok(ms) = std::env::var("INTER_CHAPTER_DELAY_MS")
            && let Ok(parsed) = ms.parse::<u64>()
        {
            config.inter_chapter_delay = Duration::from_millis(parsed);
        }
        if let Ok(path) = std::env::var("FFMPEG_PATH")
            && !path.trim().is_empty()
        {
            config.ffmpeg_path = path;
        }

        if let Ok(url) = std::env::var("OPENAI_BASE_URL")
            && !url.trim().is_empty()
        {
            config.ai.base_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.ai.api_key = key;
        }
        if let Ok(model) = std::env::var("CHAT_MODEL") {
            config.ai.chat_model = model;
        }
        if let Ok(model) = std::env::var("TTS_MODEL") {
            config.ai.tts_model = model;
        }
        if let Ok(voice) = std::env::var("TTS_VOICE") {
            config.ai.tts_voice = voice;
        }
        if let Ok(model) = std::env::var("TRANSCRIPTION_MODEL") {
            config.ai.transcription_model = model;
        }
        if let Ok(model) = std::env::var("IMAGE_MODEL") {
            config.ai.image_model = model;
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.max_upload_bytes, 100 * 1024 * 1024);
        assert_eq!(config.inter_chapter_delay, Duration::from_secs(1));
        assert_eq!(config.ffmpeg_path, "ffmpeg");
        assert_eq!(config.ai.base_url, "https://api.openai.com/v1");
    }
}
