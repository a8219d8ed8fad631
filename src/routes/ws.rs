//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to core logic. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{to_out, ClientWsMessage, ServerWsMessage};
use crate::logic::*;
use crate::state::AppState;

const DEFAULT_QUIZ_COUNT: usize = 10;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "aral_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "aral_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target = "aral_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "aral_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "aral_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::Quiz { topic, count, mode } => {
      let count = count.unwrap_or(DEFAULT_QUIZ_COUNT);
      let questions = generate_quiz(state, topic, count, mode).await;
      tracing::info!(target: "practice", ?topic, served = questions.len(), "WS quiz served");
      ServerWsMessage::Quiz { questions: questions.iter().map(to_out).collect() }
    }

    ClientWsMessage::SubmitAnswer { question_id, answer } => {
      let outcome = submit_answer(state, question_id, &answer).await;
      tracing::info!(target: "practice", id = %question_id, correct = outcome.verdict.correct, "WS answer judged");
      ServerWsMessage::AnswerResult {
        status: match outcome.status {
          AnswerStatus::Judged => "ok",
          AnswerStatus::Stale => "stale",
        },
        correct: outcome.verdict.correct,
        expected: outcome.expected,
        similarity: outcome.verdict.similarity,
        edit_distance: outcome.verdict.edit_distance,
      }
    }

    ClientWsMessage::Abandon { question_id } => {
      let removed = state.abandon(question_id).await;
      ServerWsMessage::Abandoned { removed }
    }

    ClientWsMessage::OverrideCorrect { record_id } => {
      let applied = override_correct(state, &record_id).await;
      ServerWsMessage::Overridden { applied }
    }

    ClientWsMessage::LessonComplete { unit } => {
      let recent_units = complete_lesson(state, unit).await;
      ServerWsMessage::LessonComplete { recent_units }
    }

    ClientWsMessage::Review => {
      let records = review_list(state).await;
      ServerWsMessage::Review { records }
    }

    ClientWsMessage::ToggleMastered { word_id } => {
      let word = toggle_word_mastered(state, word_id).await;
      ServerWsMessage::MasteredToggled { word }
    }

    ClientWsMessage::Reset => {
      reset_all(state).await;
      ServerWsMessage::ResetDone
    }
  }
}
