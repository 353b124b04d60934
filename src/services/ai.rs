//! External AI collaborator client.
//!
//! All generation capabilities (segmentation, scripts, voice, subtitles,
//! images) are delegated to an OpenAI-compatible HTTP API. This module only
//! shapes requests, checks responses and persists returned media artifacts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::pipeline::ContentType;

/// External AI capability: chapter segmentation plus the per-chapter
/// generation stages of the pipeline.
#[async_trait]
pub trait AiProcessor: Send + Sync {
    /// Split extracted document text into an ordered list of chapter titles.
    async fn segment_chapters(&self, content: &str) -> Result<Vec<String>>;

    /// Generate a narration script for a chapter in the requested style.
    async fn generate_script(
        &self,
        chapter_title: &str,
        content_type: ContentType,
    ) -> Result<String>;

    /// Synthesize voiceover audio from a script. Returns the audio file path.
    async fn generate_voiceover(&self, script: &str) -> Result<PathBuf>;

    /// Derive subtitles from synthesized audio. Returns the subtitle file path.
    async fn generate_subtitles(&self, audio_path: &Path) -> Result<PathBuf>;

    /// Generate a visual asset from a script. Returns the image file path.
    async fn generate_image(&self, script: &str, content_type: ContentType) -> Result<PathBuf>;
}

/// Chat completion response (only the fields we read).
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Image generation response (only the fields we read).
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: String,
}

/// `AiProcessor` implementation backed by an OpenAI-compatible API.
pub struct OpenAiProcessor {
    client: Client,
    config: AiConfig,
    media_dir: PathBuf,
}

impl OpenAiProcessor {
    pub fn new(config: AiConfig, media_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            config,
            media_dir,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Turn a non-success response into an `AiService` error carrying the
    /// status and response body.
    async fn check_response(
        what: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(Error::AiService(format!(
            "{what} request failed ({status}): {body}"
        )))
    }

    async fn chat(&self, system: &str, user: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.chat_model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ],
            }))
            .send()
            .await?;

        let response = Self::check_response("Chat completion", response).await?;
        let completion: ChatCompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(Error::ai_service("Chat completion returned no content"));
        }
        Ok(content)
    }

    fn media_path(&self, prefix: &str, extension: &str) -> PathBuf {
        self.media_dir
            .join(format!("{prefix}-{}.{extension}", uuid::Uuid::new_v4()))
    }
}

/// Per content-type style instruction for script generation.
fn script_instruction(content_type: ContentType) -> &'static str {
    match content_type {
        ContentType::Vs => {
            "Write a short, dynamic narration script contrasting the opposing \
             forces or viewpoints in this chapter."
        }
        ContentType::KeyMoment => {
            "Write a short narration script highlighting the single most \
             important moment of this chapter."
        }
        ContentType::KeyCharacter => {
            "Write a short narration script portraying the central character \
             of this chapter."
        }
        ContentType::Quiz => {
            "Write a quiz-style narration script with questions and answers \
             drawn from this chapter."
        }
    }
}

/// Parse a chapter-title list from a chat completion.
///
/// Expects a JSON array of strings, possibly wrapped in a Markdown code
/// fence. Falls back to treating each non-empty line as a title.
fn parse_chapter_titles(content: &str) -> Vec<String> {
    let trimmed = content.trim();
    let stripped = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    if let Ok(titles) = serde_json::from_str::<Vec<String>>(stripped) {
        return titles
            .into_iter()
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .collect();
    }

    stripped
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', ' ']).to_string())
        .filter(|line| !line.is_empty())
        .collect()
}

#[async_trait]
impl AiProcessor for OpenAiProcessor {
    async fn segment_chapters(&self, content: &str) -> Result<Vec<String>> {
        info!("Segmenting document into chapters");
        let system = "You split documents into topical chapters. Respond with \
                      a JSON array of short chapter titles, in reading order, \
                      and nothing else.";
        let completion = self.chat(system, content).await?;

        let titles = parse_chapter_titles(&completion);
        if titles.is_empty() {
            return Err(Error::ai_service("Segmentation produced no chapters"));
        }
        debug!(chapters = titles.len(), "Segmentation complete");
        Ok(titles)
    }

    async fn generate_script(
        &self,
        chapter_title: &str,
        content_type: ContentType,
    ) -> Result<String> {
        debug!(chapter = chapter_title, style = content_type.as_str(), "Generating script");
        self.chat(
            script_instruction(content_type),
            &format!("Chapter: {chapter_title}"),
        )
        .await
    }

    async fn generate_voiceover(&self, script: &str) -> Result<PathBuf> {
        debug!("Synthesizing voiceover");
        let response = self
            .client
            .post(self.endpoint("audio/speech"))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.tts_model,
                "voice": self.config.tts_voice,
                "input": script,
            }))
            .send()
            .await?;

        let response = Self::check_response("Voice synthesis", response).await?;
        let bytes = response.bytes().await?;

        let path = self.media_path("voice", "mp3");
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }

    async fn generate_subtitles(&self, audio_path: &Path) -> Result<PathBuf> {
        debug!(audio = %audio_path.display(), "Deriving subtitles");
        let bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("audio/mpeg")?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.config.transcription_model.clone())
            .text("response_format", "srt");

        let response = self
            .client
            .post(self.endpoint("audio/transcriptions"))
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await?;

        let response = Self::check_response("Subtitle transcription", response).await?;
        let srt = response.text().await?;

        let path = self.media_path("subs", "srt");
        tokio::fs::write(&path, srt).await?;
        Ok(path)
    }

    async fn generate_image(&self, script: &str, content_type: ContentType) -> Result<PathBuf> {
        use base64::Engine as _;

        debug!(style = content_type.as_str(), "Generating image");
        let prompt = format!(
            "An illustrative still image for a {} style video about: {}",
            content_type.as_str(),
            script
        );
        let response = self
            .client
            .post(self.endpoint("images/generations"))
            .bearer_auth(&self.config.api_key)
            .json(&json!({
                "model": self.config.image_model,
                "prompt": prompt,
                "n": 1,
                "response_format": "b64_json",
            }))
            .send()
            .await?;

        let response = Self::check_response("Image generation", response).await?;
        let images: ImagesResponse = response.json().await?;
        let datum = images
            .data
            .into_iter()
            .next()
            .ok_or_else(|| Error::ai_service("Image generation returned no image"))?;

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(datum.b64_json.as_bytes())
            .map_err(|e| Error::AiService(format!("Invalid image payload: {e}")))?;

        let path = self.media_path("image", "png");
        tokio::fs::write(&path, &bytes).await?;
        Ok(path)
    }
}
