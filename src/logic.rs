//! Core behaviors shared by both HTTP and WebSocket handlers.
//!
//! This includes:
//!   - Generating quiz batches per topic (sampling + question building)
//!   - Judging submitted answers and applying the weight policy
//!   - The review workflow (wrong-answer log, override-as-correct)
//!   - Lesson completion, mastered toggling, and full reset

use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Question, QuizMode, Topic, VocabWord, WrongAnswerRecord};
use crate::policy::{mark_seen, toggle_mastered, update_sentence, update_word};
use crate::question::{
  build_pronoun_question, build_sentence_question, build_verb_question, build_vocab_question,
};
use crate::sampler::{sample_sentences, sample_vocab, LikelihoodTable, UnitLikelihoodTable};
use crate::state::{AppState, ItemRef, PendingQuestion};
use crate::util::{today, trunc_for_log};
use crate::verify::{verify, Verdict};

/// Whether a submission was judged, or arrived for a question that is no
/// longer pending (already answered, abandoned, or never issued).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerStatus {
  Judged,
  Stale,
}

pub struct AnswerOutcome {
  pub status: AnswerStatus,
  pub verdict: Verdict,
  pub expected: String,
}

impl AnswerOutcome {
  fn stale() -> Self {
    Self { status: AnswerStatus::Stale, verdict: Verdict::default(), expected: String::new() }
  }
}

/// Generate a quiz batch for `topic`, register every question as pending,
/// and return the batch. An empty batch is a normal outcome (e.g. sentences
/// before any lesson is completed) and the client renders it as "nothing to
/// practice yet".
#[instrument(level = "info", skip(state), fields(topic = ?topic, count))]
pub async fn generate_quiz(
  state: &AppState,
  topic: Topic,
  count: usize,
  mode: Option<QuizMode>,
) -> Vec<Question> {
  let entries = match topic {
    Topic::Vocab => vocab_entries(state, count, mode).await,
    Topic::Sentences => sentence_entries(state, count, mode).await,
    Topic::Grammar => pronoun_entries(state, count, mode),
    Topic::Verbs => verb_entries(state, count, mode),
  };

  if entries.is_empty() {
    info!(target: "practice", ?topic, "No eligible items; returning an empty quiz");
    return Vec::new();
  }

  let questions: Vec<Question> = entries.iter().map(|e| e.question.clone()).collect();
  state.register_questions(entries).await;
  questions
}

async fn vocab_entries(state: &AppState, count: usize, mode: Option<QuizMode>) -> Vec<PendingQuestion> {
  let vocab = state.store.vocab_snapshot().await;
  let current_unit = { state.profile.read().await.current_unit() };
  let eligible: Vec<VocabWord> = vocab.iter().filter(|w| !w.mastered).cloned().collect();
  if eligible.is_empty() {
    return Vec::new();
  }

  // All rng work happens before the store writes.
  let (entries, first_encounters) = {
    let mut rng = rand::thread_rng();
    let likelihoods = UnitLikelihoodTable.likelihoods(&eligible, current_unit);
    let drawn = sample_vocab(&eligible, &likelihoods, count, &mut rng);

    let stamp = today();
    let mut entries = Vec::with_capacity(drawn.len());
    let mut first_encounters: Vec<VocabWord> = Vec::new();
    for word in drawn {
      let word = mark_seen(&word, stamp);
      if word.first_seen_date.is_some()
        && !first_encounters.iter().any(|w| w.id == word.id)
        && vocab.iter().any(|w| w.id == word.id && w.first_seen_date.is_none())
      {
        first_encounters.push(word.clone());
      }
      let question = build_vocab_question(&word, &vocab, None, mode, &mut rng);
      entries.push(PendingQuestion { question, item: ItemRef::Vocab(word.id) });
    }
    (entries, first_encounters)
  };

  for word in first_encounters {
    debug!(target: "practice", id = word.id, "First encounter; word enters training");
    state.store.put_word(word).await;
  }
  entries
}

async fn sentence_entries(state: &AppState, count: usize, mode: Option<QuizMode>) -> Vec<PendingQuestion> {
  let pool = state.store.sentence_snapshot().await;
  let recent_units = { state.profile.read().await.recent_units.clone() };

  let mut rng = rand::thread_rng();
  sample_sentences(&pool, &recent_units, count, &state.config.sampler, &mut rng)
    .into_iter()
    .map(|item| {
      let question = build_sentence_question(&item, &pool, mode, &mut rng);
      PendingQuestion { question, item: ItemRef::Sentence(item.id) }
    })
    .collect()
}

fn pronoun_entries(state: &AppState, count: usize, mode: Option<QuizMode>) -> Vec<PendingQuestion> {
  use rand::seq::SliceRandom;
  let mut rng = rand::thread_rng();
  (0..count)
    .filter_map(|_| {
      let entry = state.pronouns.choose(&mut rng)?;
      let question = build_pronoun_question(entry, &state.pronouns, mode, &mut rng);
      Some(PendingQuestion { question, item: ItemRef::None })
    })
    .collect()
}

fn verb_entries(state: &AppState, count: usize, mode: Option<QuizMode>) -> Vec<PendingQuestion> {
  let mut rng = rand::thread_rng();
  (0..count)
    .filter_map(|_| {
      let question = build_verb_question(&state.verbs, mode, &mut rng)?;
      Some(PendingQuestion { question, item: ItemRef::None })
    })
    .collect()
}

/// Judge one submitted answer. The pending entry is read first so the
/// (possibly slow) verification runs without holding any lock; the question
/// is settled only afterwards, and whoever loses that race applies nothing.
#[instrument(level = "info", skip(state, answer), fields(%question_id, answer_len = answer.len()))]
pub async fn submit_answer(state: &AppState, question_id: Uuid, answer: &str) -> AnswerOutcome {
  let Some(pending) = state.pending_question(question_id).await else {
    warn!(target: "practice", %question_id, "Answer for unknown or already-settled question");
    return AnswerOutcome::stale();
  };

  let verdict = verify(&pending.question, answer, state.embedding.as_ref(), &state.config.verifier).await;

  if state.settle(question_id).await.is_none() {
    warn!(target: "practice", %question_id, "Question settled while verifying; discarding result");
    return AnswerOutcome::stale();
  }

  debug!(
    target: "practice",
    %question_id,
    correct = verdict.correct,
    answer = %trunc_for_log(answer, 80),
    "Answer judged"
  );

  apply_verdict(state, &pending, verdict.correct).await;

  if !verdict.correct {
    record_wrong_answer(state, &pending.question, answer).await;
  }

  AnswerOutcome { status: AnswerStatus::Judged, verdict, expected: pending.question.answer.clone() }
}

async fn apply_verdict(state: &AppState, pending: &PendingQuestion, was_correct: bool) {
  let stamp = today();
  match pending.item {
    ItemRef::Vocab(id) => {
      if let Some(word) = state.store.word_by_id(id).await {
        let updated = update_word(&word, was_correct, pending.question.mode, stamp, &state.config.policy);
        if updated.mastered && !word.mastered {
          info!(target: "practice", id, tagalog = %updated.tagalog, "Word promoted to mastered");
        }
        state.store.put_word(updated).await;
      }
    }
    ItemRef::Sentence(id) => {
      if let Some(item) = state.store.sentence_by_id(id).await {
        state
          .store
          .put_sentence(update_sentence(&item, was_correct, pending.question.mode, &state.config.policy))
          .await;
      }
    }
    ItemRef::None => {}
  }
}

async fn record_wrong_answer(state: &AppState, question: &Question, answer: &str) {
  let record = WrongAnswerRecord {
    id: Uuid::new_v4().to_string(),
    topic: question.topic,
    prompt: question.prompt.clone(),
    correct_answer: question.answer.clone(),
    user_answer: answer.to_string(),
    mode: question.mode,
    timestamp: chrono::Utc::now(),
  };
  let mut profile = state.profile.write().await;
  profile.wrong_answers.push(record);
  state.store.persist_profile(&profile);
}

/// The wrong-answer log, newest first.
pub async fn review_list(state: &AppState) -> Vec<WrongAnswerRecord> {
  let mut records = state.profile.read().await.wrong_answers.clone();
  records.reverse();
  records
}

/// Learner override: "my answer was actually right". Removes the record and
/// replays the update as a correct answer against the drilled item; the
/// numeric effect is identical to having answered correctly live. The wrong
/// update applied at judging time is not unwound.
#[instrument(level = "info", skip(state), fields(%record_id))]
pub async fn override_correct(state: &AppState, record_id: &str) -> bool {
  let record = {
    let mut profile = state.profile.write().await;
    let Some(idx) = profile.wrong_answers.iter().position(|r| r.id == record_id) else {
      warn!(target: "practice", %record_id, "Override for unknown review record");
      return false;
    };
    let record = profile.wrong_answers.remove(idx);
    state.store.persist_profile(&profile);
    record
  };

  let stamp = today();
  match record.topic {
    Topic::Vocab => {
      let word = {
        let vocab = state.store.vocab_snapshot().await;
        vocab
          .iter()
          .find(|w| w.tagalog == record.prompt || w.tagalog == record.correct_answer)
          .cloned()
      };
      if let Some(word) = word {
        state
          .store
          .put_word(update_word(&word, true, record.mode, stamp, &state.config.policy))
          .await;
      }
    }
    Topic::Sentences => {
      let item = {
        let sentences = state.store.sentence_snapshot().await;
        sentences
          .iter()
          .find(|s| s.tagalog == record.prompt || s.english == record.correct_answer)
          .cloned()
      };
      if let Some(item) = item {
        state
          .store
          .put_sentence(update_sentence(&item, true, record.mode, &state.config.policy))
          .await;
      }
    }
    // Fixed-table drills carry no weights; removing the record is the whole
    // override.
    Topic::Grammar | Topic::Verbs => {}
  }
  true
}

/// Record a finished lesson and return the updated recency list.
#[instrument(level = "info", skip(state), fields(unit))]
pub async fn complete_lesson(state: &AppState, unit: u32) -> Vec<u32> {
  let mut profile = state.profile.write().await;
  profile.record_unit_completed(unit);
  state.store.persist_profile(&profile);
  profile.recent_units.clone()
}

/// Cycle a word's dictionary state (unseen / in-training / mastered).
#[instrument(level = "info", skip(state), fields(word_id))]
pub async fn toggle_word_mastered(state: &AppState, word_id: u32) -> Option<VocabWord> {
  let word = state.store.word_by_id(word_id).await?;
  let toggled = toggle_mastered(&word, today());
  state.store.put_word(toggled.clone()).await;
  Some(toggled)
}

/// All words currently flagged mastered.
pub async fn mastered_words(state: &AppState) -> Vec<VocabWord> {
  state
    .store
    .vocab_snapshot()
    .await
    .into_iter()
    .filter(|w| w.mastered)
    .collect()
}

/// Wipe all study state: item weights, mastery, profile, pending questions.
#[instrument(level = "info", skip(state))]
pub async fn reset_all(state: &AppState) {
  state.store.reset().await;
  {
    let mut profile = state.profile.write().await;
    *profile = Default::default();
    state.store.persist_profile(&profile);
  }
  state.pending.write().await.clear();
  info!(target: "practice", "All study state reset");
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::TrainerConfig;
  use crate::state::AppState;
  use crate::store::FilePersistence;

  fn test_state() -> AppState {
    let dir = tempfile::tempdir().unwrap();
    AppState::with_persistence(
      Box::new(FilePersistence::new(dir.path())),
      TrainerConfig::default(),
    )
  }

  fn fill_question(word: &crate::domain::VocabWord) -> PendingQuestion {
    PendingQuestion {
      question: Question {
        id: Uuid::new_v4(),
        topic: Topic::Vocab,
        prompt: word.tagalog.clone(),
        options: vec![],
        answer: word.canonical_english().to_string(),
        accepted: word.english.clone(),
        mode: QuizMode::Fill,
        target: crate::domain::Target::English,
      },
      item: ItemRef::Vocab(word.id),
    }
  }

  #[tokio::test]
  async fn quiz_registers_pending_questions_and_marks_first_encounters() {
    let state = test_state();
    let quiz = generate_quiz(&state, Topic::Vocab, 3, None).await;
    assert_eq!(quiz.len(), 3);

    for q in &quiz {
      let pending = state.pending_question(q.id).await.unwrap();
      let ItemRef::Vocab(id) = pending.item else { panic!("vocab quiz without a vocab ref") };
      let word = state.store.word_by_id(id).await.unwrap();
      assert!(word.first_seen_date.is_some());
      assert!(word.weight > 0.0);
    }
  }

  #[tokio::test]
  async fn correct_answer_lowers_weight_and_settles_exactly_once() {
    let state = test_state();
    let quiz = generate_quiz(&state, Topic::Vocab, 1, Some(QuizMode::Fill)).await;
    let q = &quiz[0];
    let ItemRef::Vocab(id) = state.pending_question(q.id).await.unwrap().item else {
      panic!("expected a vocab ref")
    };
    let before = state.store.word_by_id(id).await.unwrap().weight;

    let outcome = submit_answer(&state, q.id, &q.answer).await;
    assert_eq!(outcome.status, AnswerStatus::Judged);
    assert!(outcome.verdict.correct);
    assert!(state.store.word_by_id(id).await.unwrap().weight < before);

    // Re-submitting the same question applies nothing.
    let again = submit_answer(&state, q.id, &q.answer).await;
    assert_eq!(again.status, AnswerStatus::Stale);
  }

  #[tokio::test]
  async fn wrong_answer_is_recorded_and_override_replays_as_correct() {
    let state = test_state();
    let quiz = generate_quiz(&state, Topic::Vocab, 1, Some(QuizMode::Fill)).await;
    let q = &quiz[0];
    let ItemRef::Vocab(id) = state.pending_question(q.id).await.unwrap().item else {
      panic!("expected a vocab ref")
    };

    let outcome = submit_answer(&state, q.id, "definitely not it").await;
    assert!(!outcome.verdict.correct);
    assert_eq!(outcome.expected, q.answer);
    let after_wrong = state.store.word_by_id(id).await.unwrap().weight;

    let review = review_list(&state).await;
    assert_eq!(review.len(), 1);
    assert_eq!(review[0].user_answer, "definitely not it");

    assert!(override_correct(&state, &review[0].id).await);
    assert!(review_list(&state).await.is_empty());
    assert!(state.store.word_by_id(id).await.unwrap().weight < after_wrong);

    // A second override for the same record is rejected.
    assert!(!override_correct(&state, &review[0].id).await);
  }

  #[tokio::test]
  async fn override_applies_the_same_update_as_a_live_correct_answer() {
    let state = test_state();
    // Two words in identical study state.
    for id in [1, 2] {
      let mut w = state.store.word_by_id(id).await.unwrap();
      w.weight = 1.5;
      w.streak = 1;
      w.first_seen_date = Some(today());
      state.store.put_word(w).await;
    }

    // Word 1: answered correctly live.
    let live = fill_question(&state.store.word_by_id(1).await.unwrap());
    state.register_questions(vec![live.clone()]).await;
    let outcome = submit_answer(&state, live.question.id, &live.question.answer).await;
    assert!(outcome.verdict.correct);

    // Word 2: answered wrong, state restored to the same starting point,
    // then overridden from the review screen.
    let wrong = fill_question(&state.store.word_by_id(2).await.unwrap());
    state.register_questions(vec![wrong.clone()]).await;
    submit_answer(&state, wrong.question.id, "not even close").await;
    let mut w2 = state.store.word_by_id(2).await.unwrap();
    w2.weight = 1.5;
    w2.streak = 1;
    state.store.put_word(w2).await;
    let record_id = review_list(&state).await[0].id.clone();
    assert!(override_correct(&state, &record_id).await);

    let answered = state.store.word_by_id(1).await.unwrap();
    let overridden = state.store.word_by_id(2).await.unwrap();
    assert_eq!(answered.weight, overridden.weight);
    assert_eq!(answered.streak, overridden.streak);
    assert_eq!(answered.mastered, overridden.mastered);
  }

  #[tokio::test]
  async fn sentence_quiz_requires_a_completed_lesson() {
    let state = test_state();
    assert!(generate_quiz(&state, Topic::Sentences, 4, None).await.is_empty());

    let recent = complete_lesson(&state, 1).await;
    assert_eq!(recent, vec![1]);
    let quiz = generate_quiz(&state, Topic::Sentences, 4, None).await;
    assert_eq!(quiz.len(), 4);
  }

  #[tokio::test]
  async fn grammar_and_verb_quizzes_have_no_item_refs() {
    let state = test_state();
    for topic in [Topic::Grammar, Topic::Verbs] {
      let quiz = generate_quiz(&state, topic, 2, None).await;
      assert_eq!(quiz.len(), 2);
      for q in &quiz {
        let pending = state.pending_question(q.id).await.unwrap();
        assert_eq!(pending.item, ItemRef::None);
      }
    }
  }

  #[tokio::test]
  async fn mastered_words_are_excluded_from_vocab_quizzes() {
    let state = test_state();
    // Master everything except word 1.
    let vocab = state.store.vocab_snapshot().await;
    for word in vocab.iter().filter(|w| w.id != 1) {
      let mut w = word.clone();
      w.mastered = true;
      w.mastered_date = Some(today());
      state.store.put_word(w).await;
    }

    let quiz = generate_quiz(&state, Topic::Vocab, 10, None).await;
    assert_eq!(quiz.len(), 10);
    for q in &quiz {
      let pending = state.pending_question(q.id).await.unwrap();
      assert_eq!(pending.item, ItemRef::Vocab(1));
    }
  }

  #[tokio::test]
  async fn reset_clears_weights_profile_and_pending() {
    let state = test_state();
    let quiz = generate_quiz(&state, Topic::Vocab, 2, Some(QuizMode::Fill)).await;
    submit_answer(&state, quiz[0].id, "wrong").await;
    complete_lesson(&state, 2).await;

    reset_all(&state).await;

    assert!(review_list(&state).await.is_empty());
    assert!(state.profile.read().await.recent_units.is_empty());
    assert!(state.pending_question(quiz[1].id).await.is_none());
    let vocab = state.store.vocab_snapshot().await;
    assert!(vocab.iter().all(|w| w.weight == 0.0 && w.first_seen_date.is_none()));
  }

  #[tokio::test]
  async fn toggling_an_unseen_word_puts_it_in_training() {
    let state = test_state();
    let toggled = toggle_word_mastered(&state, 5).await.unwrap();
    assert!(!toggled.mastered);
    assert_eq!(toggled.weight, 1.0);

    let mastered = toggle_word_mastered(&state, 5).await.unwrap();
    assert!(mastered.mastered);
    assert_eq!(mastered_words(&state).await.len(), 1);

    assert!(toggle_word_mastered(&state, 9_999).await.is_none());
  }
}
