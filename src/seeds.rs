//! Seed content: the default learning items shipped with the app.
//!
//! The store reseeds from these on first run and on explicit reset. The
//! pronoun and conjugation tables are fixed content (no weights), so they
//! live here permanently rather than in the store.

use crate::domain::{PronounEntry, SentenceItem, VerbEntry, VerbForm, VocabWord};

fn word(id: u32, tagalog: &str, english: &[&str], unit: u32) -> VocabWord {
  VocabWord {
    id,
    tagalog: tagalog.into(),
    english: english.iter().map(|s| s.to_string()).collect(),
    unit,
    weight: 0.0,
    mastered: false,
    mastered_date: None,
    first_seen_date: None,
    streak: 0,
  }
}

/// Default vocabulary, grouped by the lesson unit that introduces each word.
pub fn seed_vocab() -> Vec<VocabWord> {
  vec![
    word(1, "aso", &["dog"], 1),
    word(2, "pusa", &["cat"], 1),
    word(3, "bahay", &["house", "home"], 1),
    word(4, "tubig", &["water"], 1),
    word(5, "kumain", &["to eat", "ate"], 1),
    word(6, "maganda", &["beautiful", "pretty"], 2),
    word(7, "mabait", &["kind", "nice"], 2),
    word(8, "malaki", &["big", "large"], 2),
    word(9, "salamat", &["thank you", "thanks"], 2),
    word(10, "umalis", &["to leave", "left"], 3),
    word(11, "bukas", &["tomorrow"], 3),
    word(12, "kahapon", &["yesterday"], 3),
    word(13, "palengke", &["market"], 3),
    word(14, "kaibigan", &["friend"], 3),
  ]
}

fn sentence(id: u32, tagalog: &str, english: &str, variants: &[&str], unit: u32) -> SentenceItem {
  SentenceItem {
    id,
    tagalog: tagalog.into(),
    english: english.into(),
    variants: variants.iter().map(|s| s.to_string()).collect(),
    unit,
    weight: 1.0,
  }
}

/// Default sentence items. Each carries at least three distractor variants so
/// multiple-choice questions can always be formed.
pub fn seed_sentences() -> Vec<SentenceItem> {
  vec![
    sentence(
      1,
      "Kumain ako ng mansanas.",
      "I ate an apple.",
      &["I eat apples.", "He ate an apple.", "I will eat an apple."],
      1,
    ),
    sentence(
      2,
      "Malaki ang bahay namin.",
      "Our house is big.",
      &["Our house is small.", "Their house is big.", "The house is new."],
      1,
    ),
    sentence(
      3,
      "Maganda ang panahon ngayon.",
      "The weather is nice today.",
      &["The weather was nice yesterday.", "The weather is bad today.", "It is raining today."],
      2,
    ),
    sentence(
      4,
      "Pupunta ako sa palengke bukas.",
      "I'm going to the market tomorrow.",
      &["I went to the market yesterday.", "He is going to the market.", "I'm going to the store."],
      3,
    ),
    sentence(
      5,
      "Umalis siya kahapon.",
      "He left yesterday.",
      &["He is leaving tomorrow.", "They left yesterday.", "He arrived yesterday."],
      3,
    ),
    sentence(
      6,
      "Mabait ang kaibigan ko.",
      "My friend is kind.",
      &["My friend is tall.", "His friend is kind.", "My friends are kind."],
      3,
    ),
  ]
}

fn pronoun(form: &str, label: &str, translation: &str) -> PronounEntry {
  PronounEntry { form: form.into(), label: label.into(), translation: translation.into() }
}

/// Personal-pronoun table: form, grammatical label, translation. Slash
/// alternatives and parenthetical qualifiers in the translations are expanded
/// into accepted variants by the question builder.
pub fn seed_pronouns() -> Vec<PronounEntry> {
  vec![
    pronoun("ako", "(ang, 1st, singular)", "I"),
    pronoun("ikaw", "(ang, 2nd, singular)", "you"),
    pronoun("siya", "(ang, 3rd, singular)", "he / she"),
    pronoun("kami", "(ang, 1st, plural, exclusive)", "we (exclusive)"),
    pronoun("tayo", "(ang, 1st, plural, inclusive)", "we (inclusive)"),
    pronoun("sila", "(ang, 3rd, plural)", "they"),
    pronoun("ko", "(ng, 1st, singular)", "my / mine"),
    pronoun("niya", "(ng, 3rd, singular)", "his / her (possessive)"),
    pronoun("sa kaniya", "(sa, 3rd, singular)", "to / for him / her / them (singular)"),
    pronoun("sa kanila", "(sa, 3rd, plural)", "to / for them"),
  ]
}

fn form(word: &str, translation: &str, aspect: &str, focus: &str) -> VerbForm {
  VerbForm { word: word.into(), translation: translation.into(), aspect: aspect.into(), focus: focus.into() }
}

/// Verb-conjugation table: a few roots with actor/object focus forms across
/// the four aspects.
pub fn seed_conjugations() -> Vec<VerbEntry> {
  vec![
    VerbEntry {
      root: "kain".into(),
      meaning: "eat".into(),
      forms: vec![
        form("kumain", "ate", "completed", "actor"),
        form("kumakain", "is eating", "incomplete", "actor"),
        form("kakain", "will eat", "contemplated", "actor"),
        form("kainin", "to eat (something)", "infinitive", "object"),
        form("kinain", "was eaten", "completed", "object"),
      ],
    },
    VerbEntry {
      root: "alis".into(),
      meaning: "leave".into(),
      forms: vec![
        form("umalis", "left", "completed", "actor"),
        form("umaalis", "is leaving", "incomplete", "actor"),
        form("aalis", "will leave", "contemplated", "actor"),
      ],
    },
    VerbEntry {
      root: "bili".into(),
      meaning: "buy".into(),
      forms: vec![
        form("bumili", "bought", "completed", "actor"),
        form("bumibili", "is buying", "incomplete", "actor"),
        form("bibili", "will buy", "contemplated", "actor"),
        form("bilhin", "to buy (something)", "infinitive", "object"),
      ],
    },
  ]
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn seed_ids_are_unique() {
    let vocab = seed_vocab();
    let mut ids: Vec<u32> = vocab.iter().map(|w| w.id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), vocab.len());

    let sentences = seed_sentences();
    let mut sids: Vec<u32> = sentences.iter().map(|s| s.id).collect();
    sids.sort_unstable();
    sids.dedup();
    assert_eq!(sids.len(), sentences.len());
  }

  #[test]
  fn every_sentence_has_three_distractors() {
    for s in seed_sentences() {
      assert!(s.variants.len() >= 3, "sentence {} needs 3 variants", s.id);
      assert!(!s.variants.contains(&s.english));
    }
  }

  #[test]
  fn unseen_vocab_starts_at_weight_zero() {
    assert!(seed_vocab().iter().all(|w| w.weight == 0.0 && !w.mastered));
  }
}
