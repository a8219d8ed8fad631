//! Domain models: learning items, generated questions, and review records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Practice topic. Vocab and sentences carry per-item weights; verbs and
/// pronouns are drilled from fixed tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
  Vocab,
  Sentences,
  Verbs,
  Grammar,
}

/// How the learner answers: pick from options, or type free text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizMode {
  Multiple,
  Fill,
}
impl Default for QuizMode {
  // Legacy review records predate the mode field; treat them as multiple-choice.
  fn default() -> Self { QuizMode::Multiple }
}

/// What the learner must produce. `English`/`Tagalog` are translation
/// directions; the rest are label-matching kinds from the pronoun and
/// conjugation drills.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
  English,
  Tagalog,
  Pronoun,
  AspectFocus,
  Word,
  TransFocus,
  Translation,
}

/// A vocabulary item persisted for the life of the installation.
/// `weight` is the practice-need signal: 0 = never studied, 1 on first
/// encounter, then adjusted after every answered question.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabWord {
  pub id: u32,
  pub tagalog: String,
  /// Accepted English glosses, ordered; the first is canonical.
  pub english: Vec<String>,
  pub unit: u32,
  #[serde(default)] pub weight: f64,
  #[serde(default)] pub mastered: bool,
  #[serde(default)] pub mastered_date: Option<NaiveDate>,
  #[serde(default)] pub first_seen_date: Option<NaiveDate>,
  /// Consecutive correct answers; feeds mastery promotion.
  #[serde(default)] pub streak: u32,
}

impl VocabWord {
  pub fn canonical_english(&self) -> &str {
    self.english.first().map(String::as_str).unwrap_or("")
  }
}

/// A sentence-translation item. `variants` are alternate English phrasings
/// used as multiple-choice distractors.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceItem {
  pub id: u32,
  pub tagalog: String,
  pub english: String,
  #[serde(default)] pub variants: Vec<String>,
  pub unit: u32,
  #[serde(default)] pub weight: f64,
}

/// One pronoun table entry: the Tagalog form, its grammatical label
/// (e.g. "(ang, 1st, singular)"), and the English translation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PronounEntry {
  pub form: String,
  pub label: String,
  pub translation: String,
}

/// One inflected verb form plus its aspect/focus coordinates.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerbForm {
  pub word: String,
  pub translation: String,
  pub aspect: String,
  pub focus: String,
}

impl VerbForm {
  pub fn label(&self) -> String {
    format!("({}, {})", self.aspect, self.focus)
  }
}

/// A verb root with its conjugation table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerbEntry {
  pub root: String,
  pub meaning: String,
  pub forms: Vec<VerbForm>,
}

/// A presentable quiz question. Ephemeral: produced per draw, identified by
/// a fresh UUID so pending verifications can be keyed to the instance, never
/// persisted.
#[derive(Clone, Debug, Serialize)]
pub struct Question {
  pub id: Uuid,
  pub topic: Topic,
  pub prompt: String,
  /// Empty in fill mode.
  pub options: Vec<String>,
  /// Canonical correct answer (shown to the learner when wrong).
  pub answer: String,
  /// All strings judged equivalent to the answer, canonical included.
  pub accepted: Vec<String>,
  pub mode: QuizMode,
  pub target: Target,
}

impl Question {
  /// Sentence free-text answers go through the semantic pipeline; everything
  /// else is accepted-set matching only.
  pub fn is_sentence_fill(&self) -> bool {
    self.topic == Topic::Sentences && self.mode == QuizMode::Fill
  }
}

/// A wrong answer recorded for the review screen, where the learner can
/// override a free-text judgement.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WrongAnswerRecord {
  pub id: String,
  pub topic: Topic,
  pub prompt: String,
  pub correct_answer: String,
  pub user_answer: String,
  #[serde(default)] pub mode: QuizMode,
  pub timestamp: DateTime<Utc>,
}

/// How many completed units the sampler looks back over.
pub const RECENT_UNITS_CAP: usize = 5;

/// Learner profile read by the sampler. Only the lesson-completion workflow
/// writes `recent_units`; the core never reorders it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearnerProfile {
  /// Most-recent-first, deduplicated, capped at [`RECENT_UNITS_CAP`].
  #[serde(default)] pub recent_units: Vec<u32>,
  #[serde(default)] pub wrong_answers: Vec<WrongAnswerRecord>,
}

impl LearnerProfile {
  /// Lesson-completion collaborator: push `unit` to the front, dropping any
  /// older occurrence and anything past the cap.
  pub fn record_unit_completed(&mut self, unit: u32) {
    self.recent_units.retain(|u| *u != unit);
    self.recent_units.insert(0, unit);
    self.recent_units.truncate(RECENT_UNITS_CAP);
  }

  /// Current lesson unit: the most recently completed one, or 1 before any
  /// lesson has been finished.
  pub fn current_unit(&self) -> u32 {
    self.recent_units.first().copied().unwrap_or(1)
  }
}
