//! Application state: item stores, learner profile, pending questions, and
//! the optional embedding client.
//!
//! Questions are ephemeral. Each generated question is registered here under
//! its UUID together with a reference to the item it drills; answering it
//! settles (removes) the entry, so a stale or duplicate submission finds
//! nothing and cannot double-apply a weight update.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::config::{load_trainer_config_from_env, TrainerConfig};
use crate::domain::{LearnerProfile, PronounEntry, Question, VerbEntry};
use crate::embedding::EmbeddingClient;
use crate::seeds::{seed_conjugations, seed_pronouns, seed_sentences, seed_vocab};
use crate::store::{sentence_bank, vocab_bank, FilePersistence, ItemPersistence, ItemStore};
use crate::util::today;

/// Which stored item a pending question drills. Fixed-table drills (pronouns,
/// conjugations) carry no weight, so they have no reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemRef {
  Vocab(u32),
  Sentence(u32),
  None,
}

#[derive(Clone)]
pub struct PendingQuestion {
  pub question: Question,
  pub item: ItemRef,
}

#[derive(Clone)]
pub struct AppState {
  pub store: ItemStore,
  pub profile: Arc<RwLock<LearnerProfile>>,
  pub pending: Arc<RwLock<HashMap<Uuid, PendingQuestion>>>,
  pub embedding: Option<EmbeddingClient>,
  pub config: TrainerConfig,
  pub pronouns: Vec<PronounEntry>,
  pub verbs: Vec<VerbEntry>,
}

impl AppState {
  /// Build state from env: load config, open the store over the default file
  /// persistence, and init the embedding client.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let config = load_trainer_config_from_env().unwrap_or_default();
    Self::with_persistence(Box::new(FilePersistence::from_env()), config)
  }

  pub fn with_persistence(persistence: Box<dyn ItemPersistence>, config: TrainerConfig) -> Self {
    let vocab = vocab_bank(seed_vocab(), &config.vocab);
    let sentences = sentence_bank(seed_sentences(), &config.sentences);
    let (store, profile) = ItemStore::open(persistence, vocab, sentences, today());

    let embedding = EmbeddingClient::from_env(config.verifier.max_seq_len);
    if let Some(e) = &embedding {
      info!(target: "aral_backend", base_url = %e.base_url, "Embedding service enabled.");
    } else {
      info!(target: "aral_backend", "Embedding service disabled (no EMBEDDING_BASE_URL). Free-text judging uses edit distance only.");
    }

    Self {
      store,
      profile: Arc::new(RwLock::new(profile)),
      pending: Arc::new(RwLock::new(HashMap::new())),
      embedding,
      config,
      pronouns: seed_pronouns(),
      verbs: seed_conjugations(),
    }
  }

  /// Register freshly generated questions so their answers can be settled.
  #[instrument(level = "debug", skip_all, fields(count = entries.len()))]
  pub async fn register_questions(&self, entries: Vec<PendingQuestion>) {
    let mut pending = self.pending.write().await;
    for e in entries {
      pending.insert(e.question.id, e);
    }
  }

  /// Look up a pending question without settling it; verification runs
  /// against this clone while the entry stays registered.
  pub async fn pending_question(&self, id: Uuid) -> Option<PendingQuestion> {
    self.pending.read().await.get(&id).cloned()
  }

  /// Settle a question: remove and return it. Exactly one caller wins under
  /// the write lock; a second submission for the same id gets None and must
  /// not touch item state.
  #[instrument(level = "debug", skip(self), fields(%id))]
  pub async fn settle(&self, id: Uuid) -> Option<PendingQuestion> {
    self.pending.write().await.remove(&id)
  }

  /// Drop a question the learner navigated away from, with no weight change.
  #[instrument(level = "debug", skip(self), fields(%id))]
  pub async fn abandon(&self, id: Uuid) -> bool {
    self.pending.write().await.remove(&id).is_some()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{QuizMode, Target, Topic};

  fn test_state() -> AppState {
    let dir = tempfile::tempdir().unwrap();
    AppState::with_persistence(
      Box::new(FilePersistence::new(dir.path())),
      TrainerConfig::default(),
    )
  }

  fn pending(id: Uuid) -> PendingQuestion {
    PendingQuestion {
      question: Question {
        id,
        topic: Topic::Vocab,
        prompt: "aso".into(),
        options: vec![],
        answer: "dog".into(),
        accepted: vec!["dog".into()],
        mode: QuizMode::Fill,
        target: Target::English,
      },
      item: ItemRef::Vocab(1),
    }
  }

  #[tokio::test]
  async fn settle_wins_exactly_once() {
    let state = test_state();
    let id = Uuid::new_v4();
    state.register_questions(vec![pending(id)]).await;

    assert!(state.pending_question(id).await.is_some());
    assert!(state.settle(id).await.is_some());
    // Second settle for the same id finds nothing.
    assert!(state.settle(id).await.is_none());
    assert!(state.pending_question(id).await.is_none());
  }

  #[tokio::test]
  async fn abandon_discards_without_settling_twice() {
    let state = test_state();
    let id = Uuid::new_v4();
    state.register_questions(vec![pending(id)]).await;

    assert!(state.abandon(id).await);
    assert!(!state.abandon(id).await);
    assert!(state.settle(id).await.is_none());
  }
}
