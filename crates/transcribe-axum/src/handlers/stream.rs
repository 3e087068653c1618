//! `WS /api/stream/ws` — a live streaming transcription session
//! (`spec.md` §4.8). Each connection gets its own [`StreamingSession`];
//! binary frames are 16 kHz mono PCM16, text frames carry partial/final
//! transcripts back.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use serde::Serialize;

use transcribe_core::domain::ModelType;
use transcribe_pipeline::StreamingSession;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct StreamEvent<'a> {
    text: &'a str,
    #[serde(rename = "isFinal")]
    is_final: bool,
}

pub async fn stream_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    let model = match state.models.resolve(ModelType::Stt).await {
        Ok(model) => model,
        Err(err) => {
            let _ = socket
                .send(Message::Text(format!(r#"{{"error":"{err}"}}"#).into()))
                .await;
            return;
        }
    };
    let adapter = match state.adapters.stt(&model).await {
        Ok(adapter) => adapter,
        Err(err) => {
            let _ = socket
                .send(Message::Text(format!(r#"{{"error":"{err}"}}"#).into()))
                .await;
            return;
        }
    };

    let session = StreamingSession::new(adapter);

    while let Some(Ok(message)) = socket.recv().await {
        match message {
            Message::Binary(bytes) => {
                let samples = pcm16_from_bytes(&bytes);
                match session.push_chunk(&samples).await {
                    Ok(Some(transcript)) => {
                        let event = StreamEvent {
                            text: &transcript.text,
                            is_final: transcript.is_final,
                        };
                        if let Ok(json) = serde_json::to_string(&event) {
                            if socket.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Ok(None) => {}
                    Err(err) => {
                        let _ = socket
                            .send(Message::Text(format!(r#"{{"error":"{err}"}}"#).into()))
                            .await;
                    }
                }
            }
            Message::Text(text) if text == "clear" => session.clear().await,
            Message::Close(_) => break,
            _ => {}
        }
    }
}

fn pcm16_from_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}
