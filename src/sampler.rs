//! Weighted samplers that turn the item pools into quiz batches.
//!
//! Sentences are drawn from recently completed units only, with a recency
//! multiplier on top of each item's weight. Vocabulary has no unit filter;
//! its likelihoods come from an external table keyed by the learner's
//! current unit. Both draw with replacement: the same item may appear more
//! than once in one batch, which is accepted behavior.

use rand::Rng;

use crate::config::SamplerTuning;
use crate::domain::{SentenceItem, VocabWord};

/// One weighted draw over a score list: uniform value in `[0, total)`, then
/// walk the cumulative scores and take the first index whose running sum
/// meets it. A degenerate all-zero (or negative-total) list falls back to
/// the last index rather than erroring.
pub fn weighted_draw<R: Rng>(scores: &[f64], rng: &mut R) -> usize {
  let last = scores.len().saturating_sub(1);
  let total: f64 = scores.iter().sum();
  if !(total > 0.0) {
    return last;
  }
  let target = rng.gen_range(0.0..total);
  let mut running = 0.0;
  for (i, s) in scores.iter().enumerate() {
    running += s;
    if target <= running {
      return i;
    }
  }
  last
}

/// Recency multiplier for `unit` given the MRU-first completed-unit list.
/// Rank 0 gets 1.0, each older rank loses `recency_step`; units outside the
/// list get the floor (only reachable when the eligibility filter is
/// bypassed, kept for defensive completeness).
fn recency_multiplier(unit: u32, recent_units: &[u32], tuning: &SamplerTuning) -> f64 {
  recent_units
    .iter()
    .position(|u| *u == unit)
    .map(|idx| 1.0 - tuning.recency_step * idx as f64)
    .unwrap_or(tuning.recency_floor)
}

/// Draw `count` sentence items biased toward high weight and recent units.
/// Items from units the learner has not completed are never drawn; with no
/// eligible item at all the result is empty and callers must treat "no
/// questions available" as a normal state.
pub fn sample_sentences<R: Rng>(
  pool: &[SentenceItem],
  recent_units: &[u32],
  count: usize,
  tuning: &SamplerTuning,
  rng: &mut R,
) -> Vec<SentenceItem> {
  let eligible: Vec<&SentenceItem> =
    pool.iter().filter(|s| recent_units.contains(&s.unit)).collect();
  if eligible.is_empty() {
    return Vec::new();
  }

  let scores: Vec<f64> = eligible
    .iter()
    .map(|s| s.weight * recency_multiplier(s.unit, recent_units, tuning))
    .collect();

  (0..count)
    .map(|_| eligible[weighted_draw(&scores, rng)].clone())
    .collect()
}

/// Likelihood-table collaborator for vocabulary sampling: a parallel weights
/// list aligned to `items`, given the learner's current lesson unit.
pub trait LikelihoodTable: Send + Sync {
  fn likelihoods(&self, items: &[VocabWord], current_unit: u32) -> Vec<f64>;
}

/// Default table: practice-need weight scaled down with distance from the
/// current unit. Unseen words keep a small floor so they can still surface.
pub struct UnitLikelihoodTable;

impl LikelihoodTable for UnitLikelihoodTable {
  fn likelihoods(&self, items: &[VocabWord], current_unit: u32) -> Vec<f64> {
    items
      .iter()
      .map(|w| {
        let distance = (w.unit as i64 - current_unit as i64).unsigned_abs() as f64;
        let unit_factor = 1.0 / (1.0 + 0.5 * distance);
        w.weight.max(0.05) * unit_factor
      })
      .collect()
  }
}

/// Draw `count` vocabulary words using the opaque likelihood list. The
/// likelihoods must align index-for-index with `items`; a mismatch yields an
/// empty batch (caller bug, not worth a panic in the quiz path).
pub fn sample_vocab<R: Rng>(
  items: &[VocabWord],
  likelihoods: &[f64],
  count: usize,
  rng: &mut R,
) -> Vec<VocabWord> {
  if items.is_empty() || items.len() != likelihoods.len() {
    return Vec::new();
  }
  (0..count)
    .map(|_| items[weighted_draw(likelihoods, rng)].clone())
    .collect()
}
