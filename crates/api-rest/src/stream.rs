//! WebSocket stream of simulated observations.
//!
//! Connection lifecycle:
//! 1. Client opens `GET /ws/patients/{id}/stream`; unknown ids are closed with 1008
//! 2. Every interval the server pushes one `new_observation` frame from the session
//! 3. A client frame naming a different patient closes the socket with 1008
//! 4. Client close or a socket error ends the session

use std::borrow::Cow;
use std::time::Duration;

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use fhirbrush_core::{SimulationSession, StreamMessage};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::AppState;

/// Optional client frame identifying the patient it expects to follow.
#[derive(Debug, Deserialize)]
struct ClientHello {
    #[serde(rename = "patientId")]
    patient_id: Option<String>,
}

/// WebSocket upgrade handler.
pub async fn stream_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(patient_id): Path<String>,
) -> impl IntoResponse {
    let known = state.patients.contains(&patient_id);
    let interval = state.cfg.stream_interval();
    ws.on_upgrade(move |socket| handle_stream(socket, patient_id, known, interval))
}

async fn handle_stream(socket: WebSocket, patient_id: String, known: bool, interval: Duration) {
    let (mut sink, mut incoming) = socket.split();

    if !known {
        tracing::info!(patient_id = %patient_id, "stream requested for unknown patient");
        close_with_policy(&mut sink, "Unknown patient").await;
        return;
    }

    tracing::info!(patient_id = %patient_id, "stream session started");
    let mut session = SimulationSession::new(patient_id.clone());
    // First observation goes out after one full interval.
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let message = StreamMessage::NewObservation(session.next_observation());
                let json = match serde_json::to_string(&message) {
                    Ok(j) => j,
                    Err(e) => {
                        tracing::warn!(patient_id = %patient_id, error = %e, "failed to encode observation");
                        continue;
                    }
                };
                if sink.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
            msg = incoming.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if names_other_patient(&text, &patient_id) {
                            tracing::info!(patient_id = %patient_id, "client named a different patient, closing");
                            close_with_policy(&mut sink, "Patient mismatch").await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    tracing::info!(patient_id = %patient_id, steps = session.step(), "stream session ended");
}

/// Whether a client frame carries a `patientId` other than `patient_id`.
fn names_other_patient(text: &str, patient_id: &str) -> bool {
    serde_json::from_str::<ClientHello>(text)
        .ok()
        .and_then(|hello| hello.patient_id)
        .is_some_and(|id| id != patient_id)
}

async fn close_with_policy(sink: &mut SplitSink<WebSocket, Message>, reason: &'static str) {
    let frame = CloseFrame {
        code: close_code::POLICY,
        reason: Cow::Borrowed(reason),
    };
    let _ = sink.send(Message::Close(Some(frame))).await;
    let _ = sink.close().await;
}
