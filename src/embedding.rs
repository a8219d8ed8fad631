//! Minimal client for the embedding inference service.
//!
//! The service is a black box: it accepts a fixed-length token-id sequence
//! plus an attention mask and returns per-token hidden-state vectors. This
//! module owns everything on our side of that contract: tokenization,
//! padding/truncation to the fixed sequence length, mask construction,
//! masked mean-pooling and cosine similarity.
//!
//! Calls are instrumented and log latencies and sizes, never sentence text.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

// BERT-family special token ids.
const PAD_ID: i64 = 0;
const UNK_ID: i64 = 100;
const CLS_ID: i64 = 101;
const SEP_ID: i64 = 102;

#[derive(Clone)]
pub struct EmbeddingClient {
  client: reqwest::Client,
  pub base_url: String,
  max_seq_len: usize,
  /// token -> id map loaded from EMBEDDING_VOCAB_PATH; tokens not in the map
  /// (or all tokens, when no map is configured) fall back to `[UNK]`.
  vocab: HashMap<String, i64>,
}

#[derive(Serialize)]
struct EmbedRequest {
  input_ids: Vec<Vec<i64>>,
  attention_mask: Vec<Vec<i64>>,
}

#[derive(Deserialize)]
struct EmbedResponse {
  /// `[seq_len][hidden_dim]` last hidden states for one input sequence.
  hidden_states: Vec<Vec<f32>>,
}

impl EmbeddingClient {
  /// Construct the client if EMBEDDING_BASE_URL is set; otherwise return None
  /// and the verifier degrades to edit-distance-only judging.
  pub fn from_env(max_seq_len: usize) -> Option<Self> {
    let base_url = std::env::var("EMBEDDING_BASE_URL").ok()?;

    let vocab = std::env::var("EMBEDDING_VOCAB_PATH")
      .ok()
      .and_then(|path| match std::fs::read_to_string(&path) {
        Ok(s) => match serde_json::from_str::<HashMap<String, i64>>(&s) {
          Ok(v) => {
            info!(target: "aral_backend", %path, entries = v.len(), "Loaded embedding vocab");
            Some(v)
          }
          Err(e) => {
            error!(target: "aral_backend", %path, error = %e, "Failed to parse embedding vocab");
            None
          }
        },
        Err(e) => {
          error!(target: "aral_backend", %path, error = %e, "Failed to read embedding vocab");
          None
        }
      })
      .unwrap_or_default();

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, base_url, max_seq_len, vocab })
  }

  #[cfg(test)]
  pub fn for_tests(base_url: &str, max_seq_len: usize, vocab: HashMap<String, i64>) -> Self {
    Self {
      client: reqwest::Client::new(),
      base_url: base_url.into(),
      max_seq_len,
      vocab,
    }
  }

  /// Tokenize a normalized sentence into `(input_ids, attention_mask)`, both
  /// exactly `max_seq_len` long: `[CLS] tokens… [SEP]` then `[PAD]` to
  /// length, mask 1 for real tokens and 0 for padding.
  pub fn encode(&self, text: &str) -> (Vec<i64>, Vec<i64>) {
    // A sequence always holds at least [CLS] and [SEP], whatever the
    // configured length says.
    let max = self.max_seq_len.max(2);
    let mut ids = Vec::with_capacity(max);
    ids.push(CLS_ID);
    for tok in text.split_whitespace() {
      // Leave room for the trailing [SEP].
      if ids.len() >= max - 1 {
        break;
      }
      ids.push(self.vocab.get(tok).copied().unwrap_or(UNK_ID));
    }
    ids.push(SEP_ID);

    let real = ids.len();
    ids.resize(max, PAD_ID);

    let mut mask = vec![1i64; real];
    mask.resize(self.max_seq_len, 0);
    (ids, mask)
  }

  /// One inference round-trip: token ids + mask in, hidden states out.
  #[instrument(level = "info", skip(self, ids, mask), fields(seq_len = ids.len()))]
  async fn hidden_states(&self, ids: &[i64], mask: &[i64]) -> Result<Vec<Vec<f32>>, String> {
    let url = format!("{}/embed", self.base_url);
    let req = EmbedRequest {
      input_ids: vec![ids.to_vec()],
      attention_mask: vec![mask.to_vec()],
    };

    let start = std::time::Instant::now();
    let res = self
      .client
      .post(&url)
      .header(USER_AGENT, "aral-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .json(&req)
      .send()
      .await
      .map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("Embedding HTTP {}: {}", status, body));
    }

    let body: EmbedResponse = res.json().await.map_err(|e| e.to_string())?;
    info!(elapsed = ?start.elapsed(), tokens = body.hidden_states.len(), "Embedding response received");
    if body.hidden_states.is_empty() {
      return Err("Embedding response contained no hidden states".into());
    }
    Ok(body.hidden_states)
  }

  /// Cosine similarity between the mean-pooled embeddings of two normalized
  /// sentences. Errors (service down, timeout, malformed body) are returned
  /// to the verifier, which degrades rather than failing the caller.
  #[instrument(level = "info", skip_all, fields(a_len = a.len(), b_len = b.len()))]
  pub async fn similarity(&self, a: &str, b: &str) -> Result<f64, String> {
    let (a_ids, a_mask) = self.encode(a);
    let (b_ids, b_mask) = self.encode(b);

    let a_hidden = self.hidden_states(&a_ids, &a_mask).await?;
    let b_hidden = self.hidden_states(&b_ids, &b_mask).await?;

    let a_emb = mean_pool(&a_hidden, &a_mask);
    let b_emb = mean_pool(&b_hidden, &b_mask);
    Ok(cosine_similarity(&a_emb, &b_emb))
  }
}

/// Mean over the hidden states of valid (mask == 1) token positions.
pub fn mean_pool(hidden: &[Vec<f32>], mask: &[i64]) -> Vec<f64> {
  let dim = hidden.first().map(Vec::len).unwrap_or(0);
  let mut sum = vec![0.0f64; dim];
  let mut count = 0usize;
  for (t, states) in hidden.iter().enumerate() {
    if mask.get(t).copied().unwrap_or(0) != 1 {
      continue;
    }
    count += 1;
    for (d, v) in states.iter().enumerate().take(dim) {
      sum[d] += *v as f64;
    }
  }
  if count > 0 {
    for v in &mut sum {
      *v /= count as f64;
    }
  }
  sum
}

/// Standard cosine similarity; 0.0 when either vector is all zeros.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
  let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
  let na: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
  let nb: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();
  if na == 0.0 || nb == 0.0 {
    0.0
  } else {
    dot / (na * nb)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn client() -> EmbeddingClient {
    let vocab: HashMap<String, i64> =
      [("he".to_string(), 500), ("went".to_string(), 501), ("home".to_string(), 502)]
        .into_iter()
        .collect();
    EmbeddingClient::for_tests("http://localhost:9", 8, vocab)
  }

  #[test]
  fn encode_pads_to_fixed_length_with_matching_mask() {
    let c = client();
    let (ids, mask) = c.encode("he went home");
    assert_eq!(ids.len(), 8);
    assert_eq!(mask.len(), 8);
    assert_eq!(&ids[..5], &[CLS_ID, 500, 501, 502, SEP_ID]);
    assert_eq!(&ids[5..], &[PAD_ID, PAD_ID, PAD_ID]);
    assert_eq!(mask, vec![1, 1, 1, 1, 1, 0, 0, 0]);
  }

  #[test]
  fn encode_truncates_leaving_room_for_sep() {
    let c = client();
    let (ids, mask) = c.encode("he went home he went home he went home");
    assert_eq!(ids.len(), 8);
    assert_eq!(ids[0], CLS_ID);
    assert_eq!(ids[7], SEP_ID);
    assert!(mask.iter().all(|m| *m == 1));
  }

  #[test]
  fn unknown_tokens_map_to_unk() {
    let c = client();
    let (ids, _) = c.encode("kumain");
    assert_eq!(ids[1], UNK_ID);
  }

  #[test]
  fn degenerate_sequence_length_still_yields_cls_sep() {
    let c = EmbeddingClient::for_tests("http://localhost:9", 0, HashMap::new());
    let (ids, mask) = c.encode("he went home");
    assert_eq!(ids, vec![CLS_ID, SEP_ID]);
    assert_eq!(mask, vec![1, 1]);
  }

  #[test]
  fn mean_pool_ignores_padded_positions() {
    let hidden = vec![vec![2.0, 4.0], vec![4.0, 8.0], vec![100.0, 100.0]];
    let mask = vec![1, 1, 0];
    assert_eq!(mean_pool(&hidden, &mask), vec![3.0, 6.0]);
  }

  #[test]
  fn cosine_similarity_bounds() {
    let a = vec![1.0, 0.0];
    let b = vec![0.0, 1.0];
    assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);
    assert!(cosine_similarity(&a, &b).abs() < 1e-12);
    assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
  }
}
