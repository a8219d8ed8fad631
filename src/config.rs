//! Loading engine configuration (tuning knobs + optional content bank) from TOML.
//!
//! See `TrainerConfig` for the expected schema. Every knob has a default, so
//! the backend runs with no config file at all.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct TrainerConfig {
  #[serde(default)]
  pub policy: PolicyTuning,
  #[serde(default)]
  pub sampler: SamplerTuning,
  #[serde(default)]
  pub verifier: VerifierTuning,
  #[serde(default)]
  pub vocab: Vec<VocabCfg>,
  #[serde(default)]
  pub sentences: Vec<SentenceCfg>,
}

/// Weight-update magnitudes and the mastery-promotion threshold.
///
/// The original material pins only the contract (correct decreases weight,
/// incorrect increases it, clamped at 0); the literal magnitudes are tuning.
/// Free-text recall is stronger evidence than recognition, so fill moves the
/// weight further in both directions.
#[derive(Clone, Debug, Deserialize)]
pub struct PolicyTuning {
  #[serde(default = "d_correct_multiple")] pub correct_multiple: f64,
  #[serde(default = "d_correct_fill")] pub correct_fill: f64,
  #[serde(default = "d_wrong_multiple")] pub wrong_multiple: f64,
  #[serde(default = "d_wrong_fill")] pub wrong_fill: f64,
  /// A word is promoted to mastered once its weight is at or below this…
  #[serde(default = "d_mastery_weight")] pub mastery_weight: f64,
  /// …and it has this many consecutive correct answers.
  #[serde(default = "d_mastery_streak")] pub mastery_streak: u32,
}

fn d_correct_multiple() -> f64 { 0.1 }
fn d_correct_fill() -> f64 { 0.2 }
fn d_wrong_multiple() -> f64 { 0.2 }
fn d_wrong_fill() -> f64 { 0.3 }
fn d_mastery_weight() -> f64 { 0.1 }
fn d_mastery_streak() -> u32 { 3 }

impl Default for PolicyTuning {
  fn default() -> Self {
    Self {
      correct_multiple: d_correct_multiple(),
      correct_fill: d_correct_fill(),
      wrong_multiple: d_wrong_multiple(),
      wrong_fill: d_wrong_fill(),
      mastery_weight: d_mastery_weight(),
      mastery_streak: d_mastery_streak(),
    }
  }
}

/// Recency weighting for the sentence sampler.
#[derive(Clone, Debug, Deserialize)]
pub struct SamplerTuning {
  /// Multiplier decrement per recency rank: rank 0 gets 1.0, rank 1 gets 0.7, …
  #[serde(default = "d_recency_step")] pub recency_step: f64,
  /// Floor multiplier for a unit not present in the recency list.
  #[serde(default = "d_recency_floor")] pub recency_floor: f64,
}

fn d_recency_step() -> f64 { 0.3 }
fn d_recency_floor() -> f64 { 0.1 }

impl Default for SamplerTuning {
  fn default() -> Self {
    Self { recency_step: d_recency_step(), recency_floor: d_recency_floor() }
  }
}

/// Answer-verifier thresholds.
#[derive(Clone, Debug, Deserialize)]
pub struct VerifierTuning {
  /// Cosine-similarity acceptance threshold, empirically calibrated.
  #[serde(default = "d_similarity_threshold")] pub similarity_threshold: f64,
  /// Edit-distance tolerance as a fraction of the reference length, floored;
  /// references shorter than a full fraction unit get no typo allowance.
  #[serde(default = "d_edit_tolerance")] pub edit_tolerance: f64,
  /// Fixed sequence length for the embedding model input.
  #[serde(default = "d_max_seq_len")] pub max_seq_len: usize,
}

fn d_similarity_threshold() -> f64 { 0.992 }
fn d_edit_tolerance() -> f64 { 0.1 }
fn d_max_seq_len() -> usize { 128 }

impl Default for VerifierTuning {
  fn default() -> Self {
    Self {
      similarity_threshold: d_similarity_threshold(),
      edit_tolerance: d_edit_tolerance(),
      max_seq_len: d_max_seq_len(),
    }
  }
}

/// Extra vocabulary entry accepted in TOML configuration, merged on top of
/// the built-in seed content.
#[derive(Clone, Debug, Deserialize)]
pub struct VocabCfg {
  pub id: u32,
  pub tagalog: String,
  pub english: Vec<String>,
  pub unit: u32,
}

/// Extra sentence entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct SentenceCfg {
  pub id: u32,
  pub tagalog: String,
  pub english: String,
  #[serde(default)] pub variants: Vec<String>,
  pub unit: u32,
}

/// Attempt to load `TrainerConfig` from ARAL_CONFIG_PATH. On any parsing/IO
/// error, returns None and the defaults apply.
pub fn load_trainer_config_from_env() -> Option<TrainerConfig> {
  let path = std::env::var("ARAL_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<TrainerConfig>(&s) {
      Ok(cfg) => {
        info!(target: "aral_backend", %path, "Loaded trainer config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "aral_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "aral_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_falls_back_to_defaults() {
    let cfg: TrainerConfig = toml::from_str(
      r#"
      [verifier]
      similarity_threshold = 0.95

      [[vocab]]
      id = 900
      tagalog = "gabi"
      english = ["night", "evening"]
      unit = 4
      "#,
    )
    .unwrap();
    assert!((cfg.verifier.similarity_threshold - 0.95).abs() < 1e-9);
    assert_eq!(cfg.verifier.max_seq_len, 128);
    assert!((cfg.policy.correct_fill - 0.2).abs() < 1e-9);
    assert_eq!(cfg.vocab.len(), 1);
    assert_eq!(cfg.vocab[0].english.len(), 2);
  }
}
