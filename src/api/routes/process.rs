//! Streaming job route.
//!
//! A WebSocket endpoint that replays the stored chapters of a task through
//! the per-chapter generation pipeline, emitting newline-delimited JSON
//! progress events until the selected range is exhausted or a stage fails.

use axum::{
    Router,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::server::AppState;
use crate::error::Error;
use crate::pipeline::{ChapterPipeline, ContentType, ProcessingEvent, select_chapter_range};

/// Close code sent when the connection carries no usable task id.
const CLOSE_INVALID_TASK_ID: u16 = 4003;

/// Event channel capacity per connection.
const EVENT_CHANNEL_CAPACITY: usize = 16;

fn default_end_chapter() -> usize {
    3
}

/// Connection parameters for the streaming job endpoint.
#[derive(Debug, Deserialize)]
pub struct ProcessParams {
    #[serde(default)]
    pub task_id: String,
    #[serde(default)]
    pub content_type: ContentType,
    /// Inclusive 0-based start of the chapter range.
    #[serde(default)]
    pub start_chapter: usize,
    /// Inclusive 0-based end of the chapter range.
    #[serde(default = "default_end_chapter")]
    pub end_chapter: usize,
}

/// Create the streaming job router.
pub fn router() -> Router<AppState> {
    Router::new().route("/", get(process_ws))
}

async fn process_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ProcessParams>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, params))
}

async fn send_event(socket: &mut WebSocket, event: &ProcessingEvent) -> bool {
    match serde_json::to_string(event) {
        Ok(payload) => socket.send(Message::Text(payload.into())).await.is_ok(),
        Err(_) => false,
    }
}

/// Handle an established streaming connection.
///
/// Per connection: `Idle -> Validating -> Streaming(i of n) ->
/// {Completed | Errored} -> Closed`. The connection is closed in a final
/// step regardless of outcome.
async fn handle_socket(mut socket: WebSocket, state: AppState, params: ProcessParams) {
    if params.task_id.trim().is_empty() {
        let _ = socket
            .send(Message::Close(Some(CloseFrame {
                code: CLOSE_INVALID_TASK_ID,
                reason: Utf8Bytes::from_static("Invalid task_id"),
            })))
            .await;
        return;
    }

    // Guard the lookup explicitly so an unknown task id surfaces as a
    // dedicated error event instead of falling into the pipeline error path.
    let chapters = match state.task_repository.get_chapters(&params.task_id).await {
        Ok(chapters) => chapters,
        Err(Error::NotFound { .. }) => {
            let event = ProcessingEvent::error(format!("Task '{}' not found", params.task_id));
            send_event(&mut socket, &event).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
        Err(e) => {
            warn!(task_id = %params.task_id, error = %e, "Chapter lookup failed");
            send_event(&mut socket, &ProcessingEvent::error(e.to_string())).await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let selected =
        select_chapter_range(&chapters, params.start_chapter, params.end_chapter).to_vec();
    debug!(
        task_id = %params.task_id,
        selected = selected.len(),
        stored = chapters.len(),
        "Starting chapter stream"
    );

    let pipeline = ChapterPipeline::new(
        state.ai_processor.clone(),
        state.video_processor.clone(),
        state.config.inter_chapter_delay,
    );
    let (tx, mut rx) = mpsc::channel::<ProcessingEvent>(EVENT_CHANNEL_CAPACITY);
    let content_type = params.content_type;
    let pipeline_task = tokio::spawn(async move {
        pipeline.run(&selected, content_type, tx).await;
    });

    let (mut sender, mut receiver) = socket.split();

    loop {
        tokio::select! {
            event = rx.recv() => {
                let Some(event) = event else { break };
                let payload = match serde_json::to_string(&event) {
                    Ok(payload) => payload,
                    Err(_) => break,
                };
                if sender.send(Message::Text(payload.into())).await.is_err() {
                    break; // Client disconnected
                }
                if matches!(
                    event,
                    ProcessingEvent::Completed { .. } | ProcessingEvent::Error { .. }
                ) {
                    break;
                }
            }

            // Handle incoming messages from client
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue, // Ignore other messages
                    Some(Err(_)) => break,
                }
            }
        }
    }

    pipeline_task.abort();
    let _ = sender.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_defaults() {
        let params: ProcessParams =
            serde_json::from_str(r#"{"task_id": "abc"}"#).unwrap();
        assert_eq!(params.task_id, "abc");
        assert_eq!(params.content_type, ContentType::KeyMoment);
        assert_eq!(params.start_chapter, 0);
        assert_eq!(params.end_chapter, 3);
    }

    #[test]
    fn test_params_explicit_values() {
        let params: ProcessParams = serde_json::from_str(
            r#"{"task_id": "abc", "content_type": "Quiz", "start_chapter": 1, "end_chapter": 2}"#,
        )
        .unwrap();
        assert_eq!(params.content_type, ContentType::Quiz);
        assert_eq!(params.start_chapter, 1);
        assert_eq!(params.end_chapter, 2);
    }
}
