//! Question builders: turn a sampled item into a presentable question.
//!
//! All builders are pure construction functions over the given item plus a
//! distractor pool; randomness comes in through the caller's `Rng` so tests
//! can seed it. Distractors are always 3, distinct from the answer and from
//! each other, drawn from the same field as the answer first and topped up
//! from a fallback pool when that field runs short.

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::domain::{
  PronounEntry, Question, QuizMode, SentenceItem, Target, Topic, VerbEntry, VocabWord,
};

/// Expand a canonical answer into its accepted variants:
/// slash-separated alternatives are each accepted on their own, and any
/// parenthetical qualifier is stripped to add a de-qualified form. The
/// result is deduplicated, original strings first.
pub fn expand_accepted(answers: &[String]) -> Vec<String> {
  let mut out: Vec<String> = Vec::new();
  let mut push = |s: String| {
    if !s.is_empty() && !out.contains(&s) {
      out.push(s);
    }
  };
  for answer in answers {
    for alt in answer.split('/') {
      let alt = alt.trim().to_string();
      let stripped = strip_parenthetical(&alt);
      if stripped != alt {
        push(stripped);
      }
      push(alt);
    }
  }
  out
}

/// Remove the first "(...)" qualifier, if any, and tidy the spacing.
fn strip_parenthetical(s: &str) -> String {
  match (s.find('('), s.find(')')) {
    (Some(open), Some(close)) if close > open => {
      let mut t = String::with_capacity(s.len());
      t.push_str(s[..open].trim_end());
      t.push_str(&s[close + 1..]);
      t.trim().to_string()
    }
    _ => s.trim().to_string(),
  }
}

/// Pick 3 distractors: distinct from each other and from every accepted
/// answer, drawn from `primary` first and topped up from `fallback` when the
/// same-category pool runs short. Falls short only when both pools are too
/// small.
fn pick_distractors<R: Rng>(
  primary: &[String],
  fallback: &[String],
  accepted: &[String],
  rng: &mut R,
) -> Vec<String> {
  let mut chosen: Vec<String> = Vec::new();
  for pool in [primary, fallback] {
    if chosen.len() >= 3 {
      break;
    }
    let mut candidates: Vec<String> = Vec::new();
    for c in pool {
      let c = c.trim();
      if c.is_empty()
        || accepted.iter().any(|a| a.eq_ignore_ascii_case(c))
        || chosen.iter().any(|k| k.eq_ignore_ascii_case(c))
      {
        continue;
      }
      if !candidates.iter().any(|k| k.eq_ignore_ascii_case(c)) {
        candidates.push(c.to_string());
      }
    }
    candidates.shuffle(rng);
    chosen.extend(candidates.into_iter().take(3 - chosen.len()));
  }
  chosen
}

fn assemble_options<R: Rng>(answer: &str, distractors: Vec<String>, rng: &mut R) -> Vec<String> {
  let mut options = distractors;
  options.push(answer.to_string());
  options.shuffle(rng);
  options
}

fn coin<R: Rng>(rng: &mut R) -> bool {
  rng.gen_bool(0.5)
}

fn pick_mode<R: Rng>(mode: Option<QuizMode>, rng: &mut R) -> QuizMode {
  mode.unwrap_or(if coin(rng) { QuizMode::Multiple } else { QuizMode::Fill })
}

/// Build a vocabulary translation question. Direction and mode are chosen
/// uniformly at random when unspecified. `pool` supplies distractors: other
/// words' glosses for Tagalog->English, other Tagalog forms the other way.
pub fn build_vocab_question<R: Rng>(
  word: &VocabWord,
  pool: &[VocabWord],
  direction: Option<Target>,
  mode: Option<QuizMode>,
  rng: &mut R,
) -> Question {
  let to_english = match direction {
    Some(Target::Tagalog) => false,
    Some(_) => true,
    None => coin(rng),
  };
  let mode = pick_mode(mode, rng);

  let other_glosses: Vec<String> = pool
    .iter()
    .filter(|w| w.id != word.id)
    .flat_map(|w| w.english.iter().cloned())
    .collect();
  let other_forms: Vec<String> = pool
    .iter()
    .filter(|w| w.id != word.id)
    .map(|w| w.tagalog.clone())
    .collect();

  let (prompt, answer, accepted, wrong_pool, fallback_pool) = if to_english {
    let accepted = expand_accepted(&word.english);
    let answer = word.canonical_english().to_string();
    (word.tagalog.clone(), answer, accepted, other_glosses, other_forms)
  } else {
    // Prompt with the last gloss when there are several: later glosses are
    // the more specific ones, which makes the reverse prompt unambiguous.
    let prompt = word.english.last().cloned().unwrap_or_default();
    (prompt, word.tagalog.clone(), vec![word.tagalog.clone()], other_forms, other_glosses)
  };

  let options = match mode {
    QuizMode::Multiple => {
      let distractors = pick_distractors(&wrong_pool, &fallback_pool, &accepted, rng);
      assemble_options(&answer, distractors, rng)
    }
    QuizMode::Fill => Vec::new(),
  };

  Question {
    id: Uuid::new_v4(),
    topic: Topic::Vocab,
    prompt,
    options,
    answer,
    accepted,
    mode,
    target: if to_english { Target::English } else { Target::Tagalog },
  }
}

/// Build a sentence-translation question (always Tagalog -> English).
/// Multiple-choice options are the reference translation plus 3 of the
/// item's own distractor variants, topped up from other items' translations
/// when the variants run short.
pub fn build_sentence_question<R: Rng>(
  item: &SentenceItem,
  pool: &[SentenceItem],
  mode: Option<QuizMode>,
  rng: &mut R,
) -> Question {
  let mode = pick_mode(mode, rng);
  let accepted = vec![item.english.clone()];

  let options = match mode {
    QuizMode::Multiple => {
      let other_english: Vec<String> = pool
        .iter()
        .filter(|s| s.id != item.id)
        .map(|s| s.english.clone())
        .collect();
      let distractors = pick_distractors(&item.variants, &other_english, &accepted, rng);
      assemble_options(&item.english, distractors, rng)
    }
    QuizMode::Fill => Vec::new(),
  };

  Question {
    id: Uuid::new_v4(),
    topic: Topic::Sentences,
    prompt: item.tagalog.clone(),
    options,
    answer: item.english.clone(),
    accepted,
    mode,
    target: Target::English,
  }
}

/// The four pronoun drill variants.
#[derive(Clone, Copy, Debug)]
enum PronounVariant {
  LabelToForm,
  FormToLabel,
  FormToTranslation,
  TranslationToForm,
}

/// Build a pronoun question over the fixed pronoun table. Label-matching
/// (form -> grammatical label) has no sensible free-text form, so a
/// requested fill mode is silently corrected to multiple-choice there.
pub fn build_pronoun_question<R: Rng>(
  entry: &PronounEntry,
  pool: &[PronounEntry],
  mode: Option<QuizMode>,
  rng: &mut R,
) -> Question {
  let variant = match rng.gen_range(0..4) {
    0 => PronounVariant::LabelToForm,
    1 => PronounVariant::FormToLabel,
    2 => PronounVariant::FormToTranslation,
    _ => PronounVariant::TranslationToForm,
  };

  let others: Vec<&PronounEntry> = pool.iter().filter(|p| p.form != entry.form).collect();

  let (prompt, answer, target, mode) = match variant {
    PronounVariant::LabelToForm => {
      (entry.label.clone(), entry.form.clone(), Target::Translation, pick_mode(mode, rng))
    }
    // Category labels are always multiple-choice.
    PronounVariant::FormToLabel => {
      (entry.form.clone(), entry.label.clone(), Target::Pronoun, QuizMode::Multiple)
    }
    PronounVariant::FormToTranslation => {
      (entry.form.clone(), entry.translation.clone(), Target::Translation, pick_mode(mode, rng))
    }
    PronounVariant::TranslationToForm => {
      (entry.translation.clone(), entry.form.clone(), Target::Translation, pick_mode(mode, rng))
    }
  };

  // Same-category distractors first: labels against labels, forms against
  // forms. The fallback crosses categories only when the table runs short.
  let (wrong_pool, fallback_pool): (Vec<String>, Vec<String>) = match variant {
    PronounVariant::FormToLabel => (
      others.iter().map(|p| p.label.clone()).collect(),
      others.iter().map(|p| p.form.clone()).collect(),
    ),
    PronounVariant::FormToTranslation => (
      others.iter().map(|p| p.translation.clone()).collect(),
      others.iter().map(|p| p.form.clone()).collect(),
    ),
    _ => (
      others.iter().map(|p| p.form.clone()).collect(),
      others.iter().map(|p| p.translation.clone()).collect(),
    ),
  };

  let accepted = match (variant, mode) {
    // Free-text translations accept every slash/parenthetical variant.
    (PronounVariant::FormToTranslation, QuizMode::Fill) => {
      expand_accepted(std::slice::from_ref(&entry.translation))
    }
    _ => vec![answer.clone()],
  };

  let options = match mode {
    QuizMode::Multiple => {
      let distractors = pick_distractors(&wrong_pool, &fallback_pool, &accepted, rng);
      assemble_options(&answer, distractors, rng)
    }
    QuizMode::Fill => Vec::new(),
  };

  Question {
    id: Uuid::new_v4(),
    topic: Topic::Grammar,
    prompt,
    options,
    answer,
    accepted,
    mode,
    target,
  }
}

/// Build a verb-conjugation question: word -> label, label -> word,
/// word -> translation(+focus), or translation -> word. Distractors come
/// from the other inflected forms in the table.
pub fn build_verb_question<R: Rng>(
  entries: &[VerbEntry],
  mode: Option<QuizMode>,
  rng: &mut R,
) -> Option<Question> {
  let entry = entries.choose(rng)?;
  let form = entry.forms.choose(rng)?;

  let all_forms: Vec<&crate::domain::VerbForm> = entries
    .iter()
    .flat_map(|e| e.forms.iter())
    .filter(|f| f.word != form.word)
    .collect();

  let words: Vec<String> = all_forms.iter().map(|f| f.word.clone()).collect();
  let translations: Vec<String> = all_forms.iter().map(|f| f.translation.clone()).collect();

  let (prompt, answer, target, mode, wrong_pool, fallback_pool): (
    String,
    String,
    Target,
    QuizMode,
    Vec<String>,
    Vec<String>,
  ) = match rng.gen_range(0..4) {
    // Word -> aspect/focus label; labels are always multiple-choice.
    0 => (
      form.word.clone(),
      form.label(),
      Target::AspectFocus,
      QuizMode::Multiple,
      all_forms.iter().map(|f| f.label()).collect(),
      words.clone(),
    ),
    1 => (
      format!("{} {}", entry.root, form.label()),
      form.word.clone(),
      Target::Word,
      pick_mode(mode, rng),
      words.clone(),
      translations.clone(),
    ),
    2 => {
      let m = pick_mode(mode, rng);
      // The focus qualifier only appears in the multiple-choice rendering.
      let answer = match m {
        QuizMode::Multiple => format!("{} ({})", form.translation, form.focus),
        QuizMode::Fill => form.translation.clone(),
      };
      let pool = all_forms
        .iter()
        .map(|f| match m {
          QuizMode::Multiple => format!("{} ({})", f.translation, f.focus),
          QuizMode::Fill => f.translation.clone(),
        })
        .collect();
      (form.word.clone(), answer, Target::TransFocus, m, pool, words.clone())
    }
    _ => (
      format!("{} ({})", form.translation, form.focus),
      form.word.clone(),
      Target::Word,
      pick_mode(mode, rng),
      words.clone(),
      translations.clone(),
    ),
  };

  let accepted = vec![answer.clone()];
  let options = match mode {
    QuizMode::Multiple => {
      let distractors = pick_distractors(&wrong_pool, &fallback_pool, &accepted, rng);
      assemble_options(&answer, distractors, rng)
    }
    QuizMode::Fill => Vec::new(),
  };

  Some(Question {
    id: Uuid::new_v4(),
    topic: Topic::Verbs,
    prompt,
    options,
    answer,
    accepted,
    mode,
    target,
  })
}
