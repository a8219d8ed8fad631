//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs include parameters and basic result info.

use std::sync::Arc;
use axum::{extract::{State, Query}, Json, response::IntoResponse};
use tracing::{error, info, instrument};

use crate::protocol::*;
use crate::state::AppState;
use crate::logic::*;

const DEFAULT_QUIZ_COUNT: usize = 10;

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip(state), fields(topic = ?q.topic, count = q.count.unwrap_or(DEFAULT_QUIZ_COUNT)))]
pub async fn http_get_quiz(
  State(state): State<Arc<AppState>>,
  Query(q): Query<QuizQuery>,
) -> impl IntoResponse {
  let count = q.count.unwrap_or(DEFAULT_QUIZ_COUNT);
  let questions = generate_quiz(&state, q.topic, count, q.mode).await;
  info!(target: "practice", topic = ?q.topic, served = questions.len(), "HTTP quiz served");
  Json(QuizOut { questions: questions.iter().map(to_out).collect() })
}

#[instrument(level = "info", skip(state, body), fields(%body.question_id, answer_len = body.answer.len()))]
pub async fn http_post_answer(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AnswerIn>,
) -> impl IntoResponse {
  let outcome = submit_answer(&state, body.question_id, &body.answer).await;
  info!(target: "practice", id = %body.question_id, correct = outcome.verdict.correct, status = ?outcome.status, "HTTP answer judged");
  Json(AnswerOut::from(outcome))
}

#[instrument(level = "info", skip(state, body), fields(%body.question_id))]
pub async fn http_post_abandon(
  State(state): State<Arc<AppState>>,
  Json(body): Json<AbandonIn>,
) -> impl IntoResponse {
  let removed = state.abandon(body.question_id).await;
  Json(AbandonOut { removed })
}

#[instrument(level = "info", skip(state, body), fields(%body.record_id))]
pub async fn http_post_override(
  State(state): State<Arc<AppState>>,
  Json(body): Json<OverrideIn>,
) -> impl IntoResponse {
  let applied = override_correct(&state, &body.record_id).await;
  Json(OverrideOut { applied })
}

#[instrument(level = "info", skip(state, body), fields(unit = body.unit))]
pub async fn http_post_lesson_complete(
  State(state): State<Arc<AppState>>,
  Json(body): Json<LessonCompleteIn>,
) -> impl IntoResponse {
  let recent_units = complete_lesson(&state, body.unit).await;
  Json(LessonCompleteOut { recent_units })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_review(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let records = review_list(&state).await;
  Json(ReviewOut { records })
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_mastered(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let words = mastered_words(&state).await;
  Json(MasteredOut { words })
}

#[instrument(level = "info", skip(state, body), fields(word_id = body.word_id))]
pub async fn http_post_mastered(
  State(state): State<Arc<AppState>>,
  Json(body): Json<MasteredToggleIn>,
) -> impl IntoResponse {
  let word = toggle_word_mastered(&state, body.word_id).await;
  Json(MasteredToggleOut { word })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  reset_all(&state).await;
  Json(OkOut { ok: true })
}

#[instrument(level = "info", skip(state))]
pub async fn http_post_flush(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  let ok = match state.store.flush().await {
    Ok(()) => true,
    Err(e) => {
      error!(target: "aral_backend", error = %e, "Flush failed");
      false
    }
  };
  Json(OkOut { ok })
}
