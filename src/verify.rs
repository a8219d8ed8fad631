//! Answer verification: a staged pipeline that short-circuits at the first
//! decisive stage.
//!
//! 1. normalize (trim/lowercase; full English normalization for sentence
//!    free-text),
//! 2. accepted-set match (decisive for all multiple-choice and non-sentence
//!    free-text),
//! 3. semantic similarity via the embedding service (sentence free-text only),
//! 4. edit-distance fallback, evaluated alongside stage 3 — either passing
//!    is sufficient.
//!
//! An embedding-service failure is recovered here: stage 3 counts as
//! not-correct and stage 4 still applies. The verifier never mutates item
//! state; the caller feeds the verdict to the weight-update policy.

use tracing::{error, instrument};

use crate::config::VerifierTuning;
use crate::domain::Question;
use crate::embedding::EmbeddingClient;
use crate::normalize::{normalize_basic, normalize_english};

/// Outcome of one verification, with the evidence that produced it.
#[derive(Clone, Debug, Default)]
pub struct Verdict {
  pub correct: bool,
  pub similarity: Option<f64>,
  pub edit_distance: Option<usize>,
}

impl Verdict {
  fn correct_exact() -> Self {
    Verdict { correct: true, similarity: None, edit_distance: None }
  }
}

/// Maximum tolerated edit distance for a reference of `len` characters:
/// one character per full ten (at the default fraction). References shorter
/// than that get no typo allowance, so a single substitution in an
/// eight-character reference is rejected.
fn edit_tolerance(len: usize, fraction: f64) -> usize {
  (len as f64 * fraction).floor() as usize
}

#[instrument(level = "info", skip_all, fields(question_id = %question.id, answer_len = submitted.len()))]
pub async fn verify(
  question: &Question,
  submitted: &str,
  embedding: Option<&EmbeddingClient>,
  tuning: &VerifierTuning,
) -> Verdict {
  let submitted_norm = normalize_basic(submitted);
  if question
    .accepted
    .iter()
    .any(|a| normalize_basic(a) == submitted_norm)
  {
    return Verdict::correct_exact();
  }

  if !question.is_sentence_fill() {
    return Verdict::default();
  }

  // Sentence free-text: compare against the canonical reference after the
  // full English normalization.
  let user = normalize_english(submitted);
  let reference = normalize_english(&question.answer);
  if user == reference {
    return Verdict::correct_exact();
  }

  let distance = strsim::levenshtein(&user, &reference);
  let tolerance = edit_tolerance(reference.chars().count(), tuning.edit_tolerance);
  let edit_ok = distance <= tolerance;

  // A near-miss typo is decisive on its own; skip the network round-trip.
  if edit_ok {
    return Verdict { correct: true, similarity: None, edit_distance: Some(distance) };
  }

  let similarity = match embedding {
    Some(client) => match client.similarity(&user, &reference).await {
      Ok(sim) => Some(sim),
      Err(e) => {
        error!(target: "practice", question_id = %question.id, error = %e,
               "Embedding similarity failed; judging on edit distance only");
        None
      }
    },
    None => None,
  };

  let semantic_ok = similarity.map_or(false, |s| s > tuning.similarity_threshold);
  Verdict { correct: semantic_ok, similarity, edit_distance: Some(distance) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{QuizMode, Target, Topic};
  use crate::question::{build_sentence_question, build_vocab_question};
  use crate::seeds::{seed_sentences, seed_vocab};
  use rand::rngs::StdRng;
  use rand::SeedableRng;
  use uuid::Uuid;

  fn tuning() -> VerifierTuning {
    VerifierTuning::default()
  }

  fn sentence_fill(answer: &str) -> Question {
    Question {
      id: Uuid::new_v4(),
      topic: Topic::Sentences,
      prompt: "prompt".into(),
      options: vec![],
      answer: answer.into(),
      accepted: vec![answer.into()],
      mode: QuizMode::Fill,
      target: Target::English,
    }
  }

  #[tokio::test]
  async fn reference_answer_is_always_accepted() {
    let vocab = seed_vocab();
    let sentences = seed_sentences();
    let mut rng = StdRng::seed_from_u64(17);
    for word in &vocab {
      let q = build_vocab_question(word, &vocab, None, None, &mut rng);
      let v = verify(&q, &q.answer, None, &tuning()).await;
      assert!(v.correct, "reference rejected for {}", q.prompt);
    }
    for item in &sentences {
      let q = build_sentence_question(item, &sentences, None, &mut rng);
      let v = verify(&q, &q.answer, None, &tuning()).await;
      assert!(v.correct, "reference rejected for {}", q.prompt);
    }
  }

  #[tokio::test]
  async fn accepted_match_ignores_case_and_whitespace() {
    let q = Question {
      id: Uuid::new_v4(),
      topic: Topic::Vocab,
      prompt: "aso".into(),
      options: vec![],
      answer: "dog".into(),
      accepted: vec!["dog".into()],
      mode: QuizMode::Fill,
      target: Target::English,
    };
    assert!(verify(&q, "  DOG ", None, &tuning()).await.correct);
    assert!(!verify(&q, "cat", None, &tuning()).await.correct);
  }

  #[tokio::test]
  async fn contraction_and_punctuation_variants_match() {
    let q = sentence_fill("i'm going to the store.");
    let v = verify(&q, "I am going to the store", None, &tuning()).await;
    assert!(v.correct);
  }

  #[tokio::test]
  async fn gender_variants_match() {
    let q = sentence_fill("She left yesterday.");
    assert!(verify(&q, "he left yesterday", None, &tuning()).await.correct);
  }

  #[tokio::test]
  async fn single_typo_within_tolerance_is_accepted_without_embeddings() {
    // 16-character reference: one substitution sits inside the 10% tolerance.
    let q = sentence_fill("our house is big");
    let v = verify(&q, "our houze is big", None, &tuning()).await;
    assert!(v.correct);
    assert_eq!(v.edit_distance, Some(1));
  }

  #[tokio::test]
  async fn short_reference_typo_beyond_tolerance_is_rejected() {
    // 8-character reference gets no typo allowance, so a single substitution
    // with no embedding service available stays incorrect.
    let q = sentence_fill("ate rice");
    let v = verify(&q, "ate ricx", None, &tuning()).await;
    assert!(!v.correct);
    assert_eq!(v.edit_distance, Some(1));
  }

  #[tokio::test]
  async fn unreachable_embedding_service_degrades_to_edit_distance() {
    use std::collections::HashMap;
    let client = EmbeddingClient::for_tests("http://127.0.0.1:9", 16, HashMap::new());
    let q = sentence_fill("the weather is nice today");
    // Far beyond edit tolerance and the service is unreachable: incorrect,
    // but no error surfaces.
    let v = verify(&q, "completely different sentence", Some(&client), &tuning()).await;
    assert!(!v.correct);
    assert!(v.similarity.is_none());
  }
}
