//! Integration tests for the HTTP and WebSocket endpoints.
//!
//! External collaborators (AI services, ffmpeg) are replaced with in-process
//! fakes; everything else — router, handlers, repositories, SQLite — is real.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tower::ServiceExt;

use storyreel::api::routes::create_router;
use storyreel::api::server::AppState;
use storyreel::config::AppConfig;
use storyreel::database::repositories::{SqlxTaskRepository, TaskRepository};
use storyreel::database::{init_pool, run_migrations};
use storyreel::pipeline::{ContentType, ProcessingEvent};
use storyreel::services::ai::AiProcessor;
use storyreel::services::file::FileProcessor;
use storyreel::services::video::VideoProcessor;
use storyreel::{Error, Result};

/// Fake AI collaborator with scriptable failure points.
struct FakeAi {
    titles: Vec<String>,
    fail_segmentation: bool,
    fail_script_for: Option<String>,
}

impl FakeAi {
    fn with_titles(titles: &[&str]) -> Self {
        Self {
            titles: titles.iter().map(|s| s.to_string()).collect(),
            fail_segmentation: false,
            fail_script_for: None,
        }
    }
}

#[async_trait]
impl AiProcessor for FakeAi {
    async fn segment_chapters(&self, _content: &str) -> Result<Vec<String>> {
        if self.fail_segmentation {
            return Err(Error::ai_service("segmentation exploded"));
        }
        Ok(self.titles.clone())
    }

    async fn generate_script(
        &self,
        chapter_title: &str,
        content_type: ContentType,
    ) -> Result<String> {
        if self.fail_script_for.as_deref() == Some(chapter_title) {
            return Err(Error::ai_service(format!(
                "script generation failed for '{chapter_title}'"
            )));
        }
        Ok(format!("{} script for {chapter_title}", content_type.as_str()))
    }

    async fn generate_voiceover(&self, _script: &str) -> Result<PathBuf> {
        Ok(PathBuf::from("/tmp/voice.mp3"))
    }

    async fn generate_subtitles(&self, _audio_path: &Path) -> Result<PathBuf> {
        Ok(PathBuf::from("/tmp/subs.srt"))
    }

    async fn generate_image(&self, _script: &str, _content_type: ContentType) -> Result<PathBuf> {
        Ok(PathBuf::from("/tmp/image.png"))
    }
}

/// Fake video assembler that never touches ffmpeg.
struct FakeVideo;

#[async_trait]
impl VideoProcessor for FakeVideo {
    async fn create_video(
        &self,
        _script: &str,
        _audio_path: &Path,
        _subtitles_path: &Path,
        _image_path: &Path,
    ) -> Result<PathBuf> {
        Ok(PathBuf::from(format!(
            "/videos/chapter-{}.mp4",
            uuid::Uuid::new_v4()
        )))
    }
}

struct TestContext {
    state: AppState,
    repo: Arc<dyn TaskRepository>,
    upload_dir: PathBuf,
    _tmp: tempfile::TempDir,
}

/// Build an AppState over a file-backed SQLite database in a temp dir, with
/// fakes for the external collaborators and no inter-chapter delay.
async fn test_context(ai: FakeAi, max_upload_bytes: usize) -> TestContext {
    let tmp = tempfile::tempdir().expect("Failed to create temp dir");
    let database_url = format!("sqlite:{}?mode=rwc", tmp.path().join("test.db").display());

    let pool = init_pool(&database_url)
        .await
        .expect("Failed to create test pool");
    run_migrations(&pool).await.expect("Failed to run migrations");

    let upload_dir = tmp.path().join("uploads");
    tokio::fs::create_dir_all(&upload_dir).await.unwrap();

    let config = AppConfig {
        database_url,
        upload_dir: upload_dir.clone(),
        media_dir: tmp.path().join("media"),
        output_dir: tmp.path().join("videos"),
        max_upload_bytes,
        inter_chapter_delay: Duration::ZERO,
        ..AppConfig::default()
    };

    let repo: Arc<dyn TaskRepository> = Arc::new(SqlxTaskRepository::new(pool));
    let state = AppState {
        start_time: Instant::now(),
        config: Arc::new(config),
        task_repository: repo.clone(),
        file_processor: Arc::new(FileProcessor::new()),
        ai_processor: Arc::new(ai),
        video_processor: Arc::new(FakeVideo),
    };

    TestContext {
        state,
        repo,
        upload_dir,
        _tmp: tmp,
    }
}

const BOUNDARY: &str = "test-boundary";

fn multipart_body(filename: Option<&str>, content: &[u8]) -> Body {
    let disposition = match filename {
        Some(name) => format!("form-data; name=\"file\"; filename=\"{name}\""),
        None => "form-data; name=\"file\"".to_string(),
    };
    let mut payload = Vec::new();
    payload.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    payload.extend_from_slice(format!("Content-Disposition: {disposition}\r\n").as_bytes());
    payload.extend_from_slice(b"Content-Type: text/plain\r\n\r\n");
    payload.extend_from_slice(content);
    payload.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    Body::from(payload)
}

fn upload_request(filename: Option<&str>, content: &[u8]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(multipart_body(filename, content))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Uploaded temp files must never survive the request.
fn assert_no_stray_uploads(upload_dir: &Path) {
    let leftovers: Vec<_> = std::fs::read_dir(upload_dir)
        .unwrap()
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name())
        .collect();
    assert!(leftovers.is_empty(), "stray upload files: {leftovers:?}");
}

mod upload_tests {
    use super::*;

    #[tokio::test]
    async fn test_upload_roundtrip_preserves_chapter_order() {
        let ctx = test_context(
            FakeAi::with_titles(&["Intro", "Body", "Conclusion"]),
            100 * 1024,
        )
        .await;
        let app = create_router(ctx.state.clone());

        let response = app
            .oneshot(upload_request(Some("doc.txt"), b"Some document text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = response_json(response).await;
        assert_eq!(
            json["chapters"],
            serde_json::json!(["Intro", "Body", "Conclusion"])
        );

        let task_id = json["task_id"].as_str().unwrap();
        assert!(uuid::Uuid::parse_str(task_id).is_ok());

        // A later lookup by the returned task id yields the same order.
        let stored = ctx.repo.get_chapters(task_id).await.unwrap();
        let stored_titles: Vec<&str> = stored.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(stored_titles, vec!["Intro", "Body", "Conclusion"]);

        assert_no_stray_uploads(&ctx.upload_dir);
    }

    #[tokio::test]
    async fn test_upload_without_filename_is_rejected() {
        let ctx = test_context(FakeAi::with_titles(&["Intro"]), 100 * 1024).await;
        let app = create_router(ctx.state.clone());

        let response = app.oneshot(upload_request(None, b"text")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let json = response_json(response).await;
        assert_eq!(json["message"], "No file name provided");
    }

    #[tokio::test]
    async fn test_oversized_upload_is_rejected_without_task_record() {
        let ctx = test_context(FakeAi::with_titles(&["Intro"]), 64).await;
        let app = create_router(ctx.state.clone());

        let response = app
            .oneshot(upload_request(Some("doc.txt"), &[b'x'; 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        // No task record may exist after a rejected upload.
        let pool = init_pool(&ctx.state.config.database_url).await.unwrap();
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM task")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);

        assert_no_stray_uploads(&ctx.upload_dir);
    }

    #[tokio::test]
    async fn test_upload_exceeding_transport_limit_still_gets_413() {
        // Large enough to exhaust the body limit inside the multipart
        // extractor instead of reaching the handler's own size check.
        let ctx = test_context(FakeAi::with_titles(&["Intro"]), 1024).await;
        let app = create_router(ctx.state.clone());

        let response = app
            .oneshot(upload_request(Some("doc.txt"), &vec![b'x'; 2 * 1024 * 1024]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let json = response_json(response).await;
        assert_eq!(json["message"], "File too large. Maximum size is 100MB");

        assert_no_stray_uploads(&ctx.upload_dir);
    }

    #[tokio::test]
    async fn test_segmentation_failure_maps_to_422_and_cleans_up() {
        let mut ai = FakeAi::with_titles(&[]);
        ai.fail_segmentation = true;
        let ctx = test_context(ai, 100 * 1024).await;
        let app = create_router(ctx.state.clone());

        let response = app
            .oneshot(upload_request(Some("doc.txt"), b"text"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let json = response_json(response).await;
        let message = json["message"].as_str().unwrap();
        assert!(message.contains("segmentation exploded"));

        assert_no_stray_uploads(&ctx.upload_dir);
    }

    #[tokio::test]
    async fn test_unsupported_file_type_maps_to_422() {
        let ctx = test_context(FakeAi::with_titles(&["Intro"]), 100 * 1024).await;
        let app = create_router(ctx.state.clone());

        let response = app
            .oneshot(upload_request(Some("doc.pdf"), b"%PDF-1.4"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        assert_no_stray_uploads(&ctx.upload_dir);
    }
}

/// Spawn the router on an ephemeral local port for WebSocket tests.
async fn spawn_server(state: AppState) -> SocketAddr {
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Read events until the server closes the connection.
async fn collect_events(
    addr: SocketAddr,
    query: &str,
) -> (
    Vec<ProcessingEvent>,
    Option<tokio_tungstenite::tungstenite::protocol::CloseFrame>,
) {
    let url = format!("ws://{addr}/ws/process?{query}");
    let (mut ws, _) = tokio_tungstenite::connect_async(url)
        .await
        .expect("WebSocket connect failed");

    let mut events = Vec::new();
    let mut close_frame = None;
    while let Some(msg) = ws.next().await {
        match msg.expect("WebSocket read failed") {
            WsMessage::Text(text) => {
                events.push(serde_json::from_str(text.as_str()).expect("Invalid event JSON"));
            }
            WsMessage::Close(frame) => {
                close_frame = frame;
                break;
            }
            _ => {}
        }
    }
    (events, close_frame)
}

mod process_tests {
    use super::*;

    #[tokio::test]
    async fn test_stream_processes_selected_range_in_order() {
        let ctx = test_context(FakeAi::with_titles(&[]), 100 * 1024).await;
        ctx.repo
            .store_task(
                "task-1",
                "doc.txt",
                &[
                    "Intro".to_string(),
                    "Body".to_string(),
                    "Conclusion".to_string(),
                ],
            )
            .await
            .unwrap();
        let addr = spawn_server(ctx.state.clone()).await;

        let (events, _) =
            collect_events(addr, "task_id=task-1&start_chapter=0&end_chapter=1").await;

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0],
            ProcessingEvent::Processing {
                chapter: 1,
                total_chapters: 2
            }
        );
        assert!(matches!(
            &events[1],
            ProcessingEvent::ChapterComplete { chapter_title, .. } if chapter_title == "Intro"
        ));
        assert_eq!(
            events[2],
            ProcessingEvent::Processing {
                chapter: 2,
                total_chapters: 2
            }
        );
        assert!(matches!(
            &events[3],
            ProcessingEvent::ChapterComplete { chapter_title, .. } if chapter_title == "Body"
        ));
        assert!(matches!(&events[4], ProcessingEvent::Completed { .. }));
    }

    #[tokio::test]
    async fn test_default_range_clamps_to_stored_chapters() {
        let ctx = test_context(FakeAi::with_titles(&[]), 100 * 1024).await;
        ctx.repo
            .store_task("task-2", "doc.txt", &["One".to_string(), "Two".to_string()])
            .await
            .unwrap();
        let addr = spawn_server(ctx.state.clone()).await;

        // Default range is [0, 3]; only two chapters are stored.
        let (events, _) = collect_events(addr, "task_id=task-2").await;

        let pairs = events
            .iter()
            .filter(|e| matches!(e, ProcessingEvent::ChapterComplete { .. }))
            .count();
        assert_eq!(pairs, 2);
        assert!(matches!(
            events.last().unwrap(),
            ProcessingEvent::Completed { .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_task_id_closes_with_4003_before_any_event() {
        let ctx = test_context(FakeAi::with_titles(&[]), 100 * 1024).await;
        let addr = spawn_server(ctx.state.clone()).await;

        let (events, close_frame) = collect_events(addr, "task_id=").await;

        assert!(events.is_empty());
        let frame = close_frame.expect("Expected a close frame");
        assert_eq!(u16::from(frame.code), 4003);
        assert_eq!(frame.reason.as_str(), "Invalid task_id");
    }

    #[tokio::test]
    async fn test_unknown_task_id_yields_single_error_event() {
        let ctx = test_context(FakeAi::with_titles(&[]), 100 * 1024).await;
        let addr = spawn_server(ctx.state.clone()).await;

        let (events, _) = collect_events(addr, "task_id=nope").await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            ProcessingEvent::Error { message } if message.contains("not found")
        ));
    }

    #[tokio::test]
    async fn test_stage_failure_emits_one_error_and_stops() {
        let mut ai = FakeAi::with_titles(&[]);
        ai.fail_script_for = Some("Body".to_string());
        let ctx = test_context(ai, 100 * 1024).await;
        ctx.repo
            .store_task(
                "task-3",
                "doc.txt",
                &[
                    "Intro".to_string(),
                    "Body".to_string(),
                    "Conclusion".to_string(),
                ],
            )
            .await
            .unwrap();
        let addr = spawn_server(ctx.state.clone()).await;

        let (events, _) =
            collect_events(addr, "task_id=task-3&start_chapter=0&end_chapter=2").await;

        // Intro succeeds, Body fails, Conclusion is never attempted.
        assert_eq!(events.len(), 4);
        assert!(matches!(
            &events[1],
            ProcessingEvent::ChapterComplete { chapter_title, .. } if chapter_title == "Intro"
        ));
        assert!(matches!(
            &events[3],
            ProcessingEvent::Error { message } if message.contains("Body")
        ));
    }

    #[tokio::test]
    async fn test_start_past_end_of_chapters_completes_immediately() {
        let ctx = test_context(FakeAi::with_titles(&[]), 100 * 1024).await;
        ctx.repo
            .store_task("task-4", "doc.txt", &["Only".to_string()])
            .await
            .unwrap();
        let addr = spawn_server(ctx.state.clone()).await;

        let (events, _) =
            collect_events(addr, "task_id=task-4&start_chapter=5&end_chapter=9").await;

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], ProcessingEvent::Completed { .. }));
    }

    #[tokio::test]
    async fn test_content_type_flows_into_script_generation() {
        let ctx = test_context(FakeAi::with_titles(&[]), 100 * 1024).await;
        ctx.repo
            .store_task("task-5", "doc.txt", &["Only".to_string()])
            .await
            .unwrap();
        let addr = spawn_server(ctx.state.clone()).await;

        let (events, _) = collect_events(
            addr,
            "task_id=task-5&content_type=Quiz&start_chapter=0&end_chapter=0",
        )
        .await;

        assert_eq!(events.len(), 3);
        assert!(matches!(&events[2], ProcessingEvent::Completed { .. }));
    }
}
