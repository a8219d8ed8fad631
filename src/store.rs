//! Item stores and persistence.
//!
//! The in-memory stores are the source of truth while the process runs;
//! persistence is write-behind through a single queue so quiz handlers never
//! block on disk. Saved blobs survive schema growth: loading overlays the
//! saved study state onto the current content bank and backfills fields
//! older blobs lack.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{error, info, instrument, warn};

use crate::config::{SentenceCfg, VocabCfg};
use crate::domain::{LearnerProfile, SentenceItem, VocabWord};

pub const VOCAB_KEY: &str = "vocabWords";
pub const SENTENCE_WEIGHTS_KEY: &str = "sentenceWeights.v1";
pub const PROFILE_KEY: &str = "profile.v1";

/// Key-value blob persistence. Keys are the fixed storage keys above;
/// values are JSON documents.
pub trait ItemPersistence: Send + 'static {
  fn load(&self, key: &str) -> Option<String>;
  fn save(&mut self, key: &str, blob: &str) -> Result<(), String>;
}

/// One file per key under a data directory.
pub struct FilePersistence {
  dir: PathBuf,
}

impl FilePersistence {
  pub fn new(dir: impl Into<PathBuf>) -> Self {
    Self { dir: dir.into() }
  }

  /// Data directory from ARAL_DATA_DIR, defaulting to ./data.
  pub fn from_env() -> Self {
    let dir = std::env::var("ARAL_DATA_DIR").unwrap_or_else(|_| "data".into());
    Self::new(dir)
  }

  fn path_for(&self, key: &str) -> PathBuf {
    self.dir.join(format!("{key}.json"))
  }
}

impl ItemPersistence for FilePersistence {
  fn load(&self, key: &str) -> Option<String> {
    std::fs::read_to_string(self.path_for(key)).ok()
  }

  fn save(&mut self, key: &str, blob: &str) -> Result<(), String> {
    std::fs::create_dir_all(&self.dir).map_err(|e| e.to_string())?;
    std::fs::write(self.path_for(key), blob).map_err(|e| e.to_string())
  }
}

enum PersistCmd {
  Write { key: &'static str, blob: String },
  Flush(oneshot::Sender<()>),
}

async fn run_writer(mut persistence: Box<dyn ItemPersistence>, mut rx: mpsc::UnboundedReceiver<PersistCmd>) {
  while let Some(cmd) = rx.recv().await {
    match cmd {
      PersistCmd::Write { key, blob } => {
        if let Err(e) = persistence.save(key, &blob) {
          error!(target: "aral_backend", key, error = %e, "Persist write failed");
        }
      }
      // The queue is FIFO, so acking here means every earlier write landed.
      PersistCmd::Flush(ack) => {
        let _ = ack.send(());
      }
    }
  }
}

/// Vocabulary and sentence stores plus the persistence queue handle.
#[derive(Clone)]
pub struct ItemStore {
  pub vocab: Arc<RwLock<Vec<VocabWord>>>,
  pub sentences: Arc<RwLock<Vec<SentenceItem>>>,
  vocab_bank: Arc<Vec<VocabWord>>,
  sentence_bank: Arc<Vec<SentenceItem>>,
  tx: mpsc::UnboundedSender<PersistCmd>,
}

impl ItemStore {
  /// Open the store: load saved state through `persistence`, overlay it on
  /// the content bank (seeds plus config extras), and start the write-behind
  /// task. Also returns the saved learner profile, or a fresh one.
  #[instrument(level = "info", skip_all)]
  pub fn open(
    persistence: Box<dyn ItemPersistence>,
    vocab_bank: Vec<VocabWord>,
    sentence_bank: Vec<SentenceItem>,
    today: NaiveDate,
  ) -> (Self, LearnerProfile) {
    let saved_vocab = load_json::<Vec<VocabWord>>(&*persistence, VOCAB_KEY);
    let saved_weights = load_json::<HashMap<u32, f64>>(&*persistence, SENTENCE_WEIGHTS_KEY);
    let profile = load_json::<LearnerProfile>(&*persistence, PROFILE_KEY).unwrap_or_default();

    let vocab = merge_vocab(&vocab_bank, saved_vocab, today);
    let sentences = merge_sentences(&sentence_bank, saved_weights);

    info!(
      target: "practice",
      vocab = vocab.len(),
      sentences = sentences.len(),
      mastered = vocab.iter().filter(|w| w.mastered).count(),
      recent_units = profile.recent_units.len(),
      "Startup item inventory"
    );

    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(run_writer(persistence, rx));

    let store = Self {
      vocab: Arc::new(RwLock::new(vocab)),
      sentences: Arc::new(RwLock::new(sentences)),
      vocab_bank: Arc::new(vocab_bank),
      sentence_bank: Arc::new(sentence_bank),
      tx,
    };
    (store, profile)
  }

  /// Replace a word by id and schedule a persist of the vocab blob. Unknown
  /// ids are logged and dropped; the caller read the word from this store, so
  /// a miss means it raced a reset.
  #[instrument(level = "debug", skip(self, word), fields(id = word.id))]
  pub async fn put_word(&self, word: VocabWord) {
    let blob = {
      let mut vocab = self.vocab.write().await;
      match vocab.iter_mut().find(|w| w.id == word.id) {
        Some(slot) => *slot = word,
        None => {
          warn!(target: "practice", id = word.id, "put_word: id not in store");
          return;
        }
      }
      serialize_or_log(&*vocab)
    };
    self.schedule(VOCAB_KEY, blob);
  }

  /// Replace a sentence by id and schedule a persist of the weights blob.
  #[instrument(level = "debug", skip(self, item), fields(id = item.id))]
  pub async fn put_sentence(&self, item: SentenceItem) {
    let blob = {
      let mut sentences = self.sentences.write().await;
      match sentences.iter_mut().find(|s| s.id == item.id) {
        Some(slot) => *slot = item,
        None => {
          warn!(target: "practice", id = item.id, "put_sentence: id not in store");
          return;
        }
      }
      serialize_or_log(&weights_of(&sentences))
    };
    self.schedule(SENTENCE_WEIGHTS_KEY, blob);
  }

  pub async fn vocab_snapshot(&self) -> Vec<VocabWord> {
    self.vocab.read().await.clone()
  }

  pub async fn sentence_snapshot(&self) -> Vec<SentenceItem> {
    self.sentences.read().await.clone()
  }

  pub async fn word_by_id(&self, id: u32) -> Option<VocabWord> {
    self.vocab.read().await.iter().find(|w| w.id == id).cloned()
  }

  pub async fn sentence_by_id(&self, id: u32) -> Option<SentenceItem> {
    self.sentences.read().await.iter().find(|s| s.id == id).cloned()
  }

  /// Discard all study state: both stores go back to the pristine bank and
  /// the reset is persisted.
  #[instrument(level = "info", skip(self))]
  pub async fn reset(&self) {
    let vocab_blob = {
      let mut vocab = self.vocab.write().await;
      *vocab = self.vocab_bank.as_ref().clone();
      serialize_or_log(&*vocab)
    };
    let weights_blob = {
      let mut sentences = self.sentences.write().await;
      *sentences = self.sentence_bank.as_ref().clone();
      serialize_or_log(&weights_of(&sentences))
    };
    self.schedule(VOCAB_KEY, vocab_blob);
    self.schedule(SENTENCE_WEIGHTS_KEY, weights_blob);
  }

  /// Schedule a persist of the learner profile.
  pub fn persist_profile(&self, profile: &LearnerProfile) {
    self.schedule(PROFILE_KEY, serialize_or_log(profile));
  }

  /// Wait until every write scheduled so far has been applied.
  pub async fn flush(&self) -> Result<(), String> {
    let (ack, done) = oneshot::channel();
    self
      .tx
      .send(PersistCmd::Flush(ack))
      .map_err(|_| "persistence writer is gone".to_string())?;
    done.await.map_err(|_| "persistence writer dropped the flush ack".to_string())
  }

  fn schedule(&self, key: &'static str, blob: String) {
    if blob.is_empty() {
      return;
    }
    if self.tx.send(PersistCmd::Write { key, blob }).is_err() {
      error!(target: "aral_backend", key, "Persistence writer is gone; update not saved");
    }
  }
}

fn load_json<T: serde::de::DeserializeOwned>(persistence: &dyn ItemPersistence, key: &str) -> Option<T> {
  let blob = persistence.load(key)?;
  match serde_json::from_str(&blob) {
    Ok(v) => Some(v),
    Err(e) => {
      error!(target: "aral_backend", key, error = %e, "Discarding unreadable saved blob");
      None
    }
  }
}

fn serialize_or_log<T: serde::Serialize>(value: &T) -> String {
  match serde_json::to_string(value) {
    Ok(s) => s,
    Err(e) => {
      error!(target: "aral_backend", error = %e, "Failed to serialize store blob");
      String::new()
    }
  }
}

fn weights_of(sentences: &[SentenceItem]) -> HashMap<u32, f64> {
  sentences.iter().map(|s| (s.id, s.weight)).collect()
}

/// Overlay saved study state onto the bank. Content fields (spelling,
/// glosses, unit) always come from the bank so content fixes reach old
/// installations; ids saved but no longer in the bank are dropped. A legacy
/// record flagged mastered without a date gets stamped with today.
fn merge_vocab(bank: &[VocabWord], saved: Option<Vec<VocabWord>>, today: NaiveDate) -> Vec<VocabWord> {
  let saved_by_id: HashMap<u32, VocabWord> = saved
    .unwrap_or_default()
    .into_iter()
    .map(|w| (w.id, w))
    .collect();

  bank
    .iter()
    .map(|bank_word| {
      let mut w = bank_word.clone();
      if let Some(s) = saved_by_id.get(&w.id) {
        w.weight = s.weight;
        w.mastered = s.mastered;
        w.mastered_date = s.mastered_date;
        w.first_seen_date = s.first_seen_date;
        w.streak = s.streak;
        if w.mastered && w.mastered_date.is_none() {
          w.mastered_date = Some(today);
        }
      }
      w
    })
    .collect()
}

fn merge_sentences(bank: &[SentenceItem], saved: Option<HashMap<u32, f64>>) -> Vec<SentenceItem> {
  let weights = saved.unwrap_or_default();
  bank
    .iter()
    .map(|bank_item| {
      let mut s = bank_item.clone();
      if let Some(w) = weights.get(&s.id) {
        s.weight = *w;
      }
      s
    })
    .collect()
}

/// Merge config-file extras into the seeded vocab bank. Config entries with
/// a seeded id replace the seed so deployments can correct content.
pub fn vocab_bank(seeds: Vec<VocabWord>, extras: &[VocabCfg]) -> Vec<VocabWord> {
  let mut bank = seeds;
  for cfg in extras {
    let word = VocabWord {
      id: cfg.id,
      tagalog: cfg.tagalog.clone(),
      english: cfg.english.clone(),
      unit: cfg.unit,
      weight: 0.0,
      mastered: false,
      mastered_date: None,
      first_seen_date: None,
      streak: 0,
    };
    match bank.iter_mut().find(|w| w.id == cfg.id) {
      Some(slot) => *slot = word,
      None => bank.push(word),
    }
  }
  bank
}

/// Merge config-file extras into the seeded sentence bank.
pub fn sentence_bank(seeds: Vec<SentenceItem>, extras: &[SentenceCfg]) -> Vec<SentenceItem> {
  let mut bank = seeds;
  for cfg in extras {
    let item = SentenceItem {
      id: cfg.id,
      tagalog: cfg.tagalog.clone(),
      english: cfg.english.clone(),
      variants: cfg.variants.clone(),
      unit: cfg.unit,
      weight: 1.0,
    };
    match bank.iter_mut().find(|s| s.id == cfg.id) {
      Some(slot) => *slot = item,
      None => bank.push(item),
    }
  }
  bank
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seeds::{seed_sentences, seed_vocab};

  fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
  }

  fn open_in(dir: &std::path::Path) -> (ItemStore, LearnerProfile) {
    ItemStore::open(
      Box::new(FilePersistence::new(dir)),
      seed_vocab(),
      seed_sentences(),
      today(),
    )
  }

  #[tokio::test]
  async fn first_run_seeds_and_updates_survive_a_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
      let (store, profile) = open_in(dir.path());
      assert!(profile.recent_units.is_empty());

      let mut word = store.word_by_id(1).await.unwrap();
      word.weight = 0.8;
      word.first_seen_date = Some(today());
      store.put_word(word).await;

      let mut item = store.sentence_by_id(1).await.unwrap();
      item.weight = 1.3;
      store.put_sentence(item).await;

      store.flush().await.unwrap();
    }

    let (store, _) = open_in(dir.path());
    assert!((store.word_by_id(1).await.unwrap().weight - 0.8).abs() < 1e-9);
    assert!((store.sentence_by_id(1).await.unwrap().weight - 1.3).abs() < 1e-9);
    // Untouched items keep their seed state.
    assert_eq!(store.word_by_id(2).await.unwrap().weight, 0.0);
  }

  #[tokio::test]
  async fn legacy_mastered_record_without_date_gets_stamped() {
    let saved = vec![VocabWord {
      id: 1,
      tagalog: "old spelling".into(),
      english: vec!["dog".into()],
      unit: 1,
      weight: 0.05,
      mastered: true,
      mastered_date: None,
      first_seen_date: None,
      streak: 4,
    }];
    let merged = merge_vocab(&seed_vocab(), Some(saved), today());
    let w = merged.iter().find(|w| w.id == 1).unwrap();
    assert_eq!(w.mastered_date, Some(today()));
    // Content comes from the bank, study state from the blob.
    assert_ne!(w.tagalog, "old spelling");
    assert!((w.weight - 0.05).abs() < 1e-9);
  }

  #[tokio::test]
  async fn saved_ids_missing_from_the_bank_are_dropped() {
    let saved = vec![VocabWord {
      id: 9_999,
      tagalog: "ghost".into(),
      english: vec!["ghost".into()],
      unit: 1,
      weight: 2.0,
      mastered: false,
      mastered_date: None,
      first_seen_date: None,
      streak: 0,
    }];
    let merged = merge_vocab(&seed_vocab(), Some(saved), today());
    assert!(merged.iter().all(|w| w.id != 9_999));
  }

  #[tokio::test]
  async fn reset_restores_the_pristine_bank() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_in(dir.path());

    let mut word = store.word_by_id(3).await.unwrap();
    word.weight = 2.5;
    word.mastered = true;
    word.mastered_date = Some(today());
    store.put_word(word).await;

    store.reset().await;
    store.flush().await.unwrap();

    let w = store.word_by_id(3).await.unwrap();
    assert_eq!(w.weight, 0.0);
    assert!(!w.mastered);

    // The reset also reached disk.
    let (reopened, _) = open_in(dir.path());
    assert_eq!(reopened.word_by_id(3).await.unwrap().weight, 0.0);
  }

  #[tokio::test]
  async fn profile_round_trips_through_the_queue() {
    let dir = tempfile::tempdir().unwrap();
    let (store, _) = open_in(dir.path());

    let mut profile = LearnerProfile::default();
    profile.record_unit_completed(2);
    profile.record_unit_completed(3);
    store.persist_profile(&profile);
    store.flush().await.unwrap();

    let (_, reloaded) = open_in(dir.path());
    assert_eq!(reloaded.recent_units, vec![3, 2]);
  }

  #[test]
  fn config_extras_replace_and_extend_the_bank() {
    let extras = vec![
      VocabCfg { id: 1, tagalog: "aso (fixed)".into(), english: vec!["dog".into()], unit: 1 },
      VocabCfg { id: 900, tagalog: "gabi".into(), english: vec!["night".into()], unit: 4 },
    ];
    let bank = vocab_bank(seed_vocab(), &extras);
    assert_eq!(bank.iter().find(|w| w.id == 1).unwrap().tagalog, "aso (fixed)");
    assert!(bank.iter().any(|w| w.id == 900));
    // A corrected seed keeps a single entry.
    assert_eq!(bank.iter().filter(|w| w.id == 1).count(), 1);
  }
}
