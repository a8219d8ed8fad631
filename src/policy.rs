//! Weight update policy: pure functions from (item, outcome) to the next
//! item state. Nothing here touches the store; persistence is the caller's
//! responsibility.
//!
//! Contract: a correct answer never increases weight, an incorrect answer
//! never decreases it, and weight stays >= 0 after any update sequence.

use chrono::NaiveDate;

use crate::config::PolicyTuning;
use crate::domain::{QuizMode, SentenceItem, VocabWord};

fn delta(tuning: &PolicyTuning, was_correct: bool, mode: QuizMode) -> f64 {
  match (was_correct, mode) {
    (true, QuizMode::Multiple) => tuning.correct_multiple,
    (true, QuizMode::Fill) => tuning.correct_fill,
    (false, QuizMode::Multiple) => tuning.wrong_multiple,
    (false, QuizMode::Fill) => tuning.wrong_fill,
  }
}

/// First encounter with a word: stamp the study history and raise the weight
/// from 0 to 1. Called when the word is presented, not when it is answered,
/// so the answer adjustment itself stays monotonic.
pub fn mark_seen(word: &VocabWord, today: NaiveDate) -> VocabWord {
  let mut w = word.clone();
  if w.first_seen_date.is_none() {
    w.first_seen_date = Some(today);
    if w.weight == 0.0 {
      w.weight = 1.0;
    }
  }
  w
}

/// Apply one answered question to a vocabulary word. The manual
/// override-as-correct path calls this with `was_correct = true`, so its
/// numeric effect is identical to answering correctly live.
pub fn update_word(
  word: &VocabWord,
  was_correct: bool,
  mode: QuizMode,
  today: NaiveDate,
  tuning: &PolicyTuning,
) -> VocabWord {
  let mut w = word.clone();
  let d = delta(tuning, was_correct, mode);
  if was_correct {
    w.weight = (w.weight - d).max(0.0);
    w.streak += 1;
  } else {
    w.weight += d;
    w.streak = 0;
  }

  // Promotion only; normal answering never demotes a mastered word.
  if !w.mastered && was_correct && w.weight <= tuning.mastery_weight && w.streak >= tuning.mastery_streak
  {
    w.mastered = true;
    w.mastered_date = Some(today);
  }
  w
}

/// Apply one answered question to a sentence item. Sentences have no mastery
/// flag; only the weight moves.
pub fn update_sentence(
  item: &SentenceItem,
  was_correct: bool,
  mode: QuizMode,
  tuning: &PolicyTuning,
) -> SentenceItem {
  let mut s = item.clone();
  let d = delta(tuning, was_correct, mode);
  if was_correct {
    s.weight = (s.weight - d).max(0.0);
  } else {
    s.weight += d;
  }
  s
}

/// Explicit learner action cycling a word's dictionary state:
/// mastered -> in-training, in-training -> mastered, unseen -> in-training.
/// This is the only path that clears the mastered flag.
pub fn toggle_mastered(word: &VocabWord, today: NaiveDate) -> VocabWord {
  let mut w = word.clone();
  if w.mastered {
    w.mastered = false;
    w.mastered_date = None;
    if w.first_seen_date.is_none() {
      w.first_seen_date = Some(today);
    }
  } else if w.first_seen_date.is_some() {
    w.mastered = true;
    w.mastered_date = Some(today);
  } else {
    w.first_seen_date = Some(today);
    w.weight = 1.0;
  }
  w
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::rngs::StdRng;
  use rand::{Rng, SeedableRng};

  fn tuning() -> PolicyTuning {
    PolicyTuning::default()
  }

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
  }

  fn seen_word(weight: f64) -> VocabWord {
    VocabWord {
      id: 1,
      tagalog: "aso".into(),
      english: vec!["dog".into()],
      unit: 1,
      weight,
      mastered: false,
      mastered_date: None,
      first_seen_date: Some(today()),
      streak: 0,
    }
  }

  #[test]
  fn weight_stays_non_negative_over_random_sequences() {
    let mut rng = StdRng::seed_from_u64(7);
    let t = tuning();
    let mut w = seen_word(1.0);
    for _ in 0..5_000 {
      let correct = rng.gen_bool(0.5);
      let mode = if rng.gen_bool(0.5) { QuizMode::Multiple } else { QuizMode::Fill };
      w = update_word(&w, correct, mode, today(), &t);
      assert!(w.weight >= 0.0, "weight went negative: {}", w.weight);
    }

    let mut s = SentenceItem {
      id: 1,
      tagalog: "x".into(),
      english: "y".into(),
      variants: vec![],
      unit: 1,
      weight: 1.0,
    };
    for _ in 0..5_000 {
      let correct = rng.gen_bool(0.5);
      s = update_sentence(&s, correct, QuizMode::Fill, &t);
      assert!(s.weight >= 0.0);
    }
  }

  #[test]
  fn correct_never_increases_and_wrong_never_decreases() {
    let t = tuning();
    for start in [0.0, 0.05, 0.5, 1.0, 3.0] {
      let w = seen_word(start);
      for mode in [QuizMode::Multiple, QuizMode::Fill] {
        assert!(update_word(&w, true, mode, today(), &t).weight <= start);
        assert!(update_word(&w, false, mode, today(), &t).weight >= start);
      }
    }
  }

  #[test]
  fn mastery_requires_low_weight_and_a_correct_run() {
    let t = tuning();
    let mut w = seen_word(0.7);
    // Three corrects in fill mode: 0.7 -> 0.5 -> 0.3 -> 0.1; streak hits 3
    // exactly when weight reaches the threshold.
    for _ in 0..3 {
      assert!(!w.mastered);
      w = update_word(&w, true, QuizMode::Fill, today(), &t);
    }
    assert!(w.mastered);
    assert_eq!(w.mastered_date, Some(today()));
  }

  #[test]
  fn a_wrong_answer_resets_the_streak() {
    let t = tuning();
    let mut w = seen_word(0.5);
    w = update_word(&w, true, QuizMode::Fill, today(), &t);
    w = update_word(&w, true, QuizMode::Fill, today(), &t);
    w = update_word(&w, false, QuizMode::Multiple, today(), &t);
    assert_eq!(w.streak, 0);
    // Low weight alone is not enough without the run.
    w = update_word(&w, true, QuizMode::Fill, today(), &t);
    assert!(!w.mastered);
  }

  #[test]
  fn mark_seen_initializes_history_once() {
    let unseen = VocabWord { first_seen_date: None, weight: 0.0, ..seen_word(0.0) };
    let seen = mark_seen(&unseen, today());
    assert_eq!(seen.weight, 1.0);
    assert_eq!(seen.first_seen_date, Some(today()));
    // Idempotent: a later encounter leaves the adjusted weight alone.
    let later = VocabWord { weight: 0.4, ..seen.clone() };
    assert_eq!(mark_seen(&later, today()).weight, 0.4);
  }

  #[test]
  fn toggle_cycles_dictionary_states() {
    let unseen = VocabWord { first_seen_date: None, weight: 0.0, ..seen_word(0.0) };

    let training = toggle_mastered(&unseen, today());
    assert!(!training.mastered);
    assert_eq!(training.weight, 1.0);
    assert!(training.first_seen_date.is_some());

    let mastered = toggle_mastered(&training, today());
    assert!(mastered.mastered);
    assert_eq!(mastered.mastered_date, Some(today()));

    let back = toggle_mastered(&mastered, today());
    assert!(!back.mastered);
    assert_eq!(back.mastered_date, None);
    assert!(back.first_seen_date.is_some());
  }
}
