//! English-sentence normalization applied before free-text comparison.
//!
//! The transform is fixed and idempotent: glyph unification, case folding,
//! terminal-punctuation removal, gender neutralization (either third-person
//! gender is accepted), contraction expansion, whitespace collapse. Only the
//! rules listed here are applied; this is not general NLP normalization.

/// Contractions expanded in both the submitted answer and the reference.
/// Expansions contain no apostrophes, so a second pass is a no-op.
const CONTRACTIONS: &[(&str, &str)] = &[
  ("i'm", "i am"),
  ("can't", "cannot"),
  ("won't", "will not"),
  ("don't", "do not"),
  ("doesn't", "does not"),
  ("didn't", "did not"),
  ("haven't", "have not"),
  ("hadn't", "had not"),
  ("it's", "it is"),
  ("that's", "that is"),
  ("there's", "there is"),
  ("they're", "they are"),
  ("we're", "we are"),
  ("you're", "you are"),
  ("wasn't", "was not"),
  ("weren't", "were not"),
  ("wouldn't", "would not"),
  ("couldn't", "could not"),
  ("shouldn't", "should not"),
  ("ain't", "is not"),
  ("i've", "i have"),
  ("i'd", "i would"),
  ("i'll", "i will"),
  ("you've", "you have"),
  ("you'd", "you would"),
  ("you'll", "you will"),
  ("they've", "they have"),
  ("they'd", "they would"),
  ("they'll", "they will"),
  ("let's", "let us"),
];

/// Gendered third-person pronouns are mapped onto the masculine forms so a
/// learner may answer with either gender.
const GENDER_MAP: &[(&str, &str)] = &[("she", "he"), ("her", "him"), ("hers", "his")];

fn is_word_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_'
}

/// Replace whole-word occurrences of `from` with `to`. A match is a whole
/// word when the characters on both sides are non-word characters (so
/// "don't" matches inside "i don't know" but "her" does not match "there").
fn replace_word(s: &str, from: &str, to: &str) -> String {
  let mut out = String::with_capacity(s.len());
  let mut rest = s;
  loop {
    match rest.find(from) {
      None => {
        out.push_str(rest);
        return out;
      }
      Some(pos) => {
        // Left context: for a match at the slice start, the character before
        // it was already emitted to `out` on an earlier pass.
        let left = if pos == 0 {
          out.chars().next_back()
        } else {
          rest[..pos].chars().next_back()
        };
        let before_ok = left.map_or(true, |c| !is_word_char(c));
        let after_ok = rest[pos + from.len()..].chars().next().map_or(true, |c| !is_word_char(c));
        if before_ok && after_ok {
          out.push_str(&rest[..pos]);
          out.push_str(to);
        } else {
          out.push_str(&rest[..pos + from.len()]);
        }
        rest = &rest[pos + from.len()..];
      }
    }
  }
}

/// Lowercase + trim. The comparison baseline for every answer mode.
pub fn normalize_basic(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Full English normalization for sentence-translation answers.
pub fn normalize_english(sentence: &str) -> String {
  // Unify apostrophe glyph variants first so the contraction table matches.
  let mut s: String = sentence
    .chars()
    .map(|c| match c {
      '\u{2019}' | '\u{2018}' | '\u{201B}' | '`' | '\u{00B4}' => '\'',
      '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2015}' => '-',
      _ => c,
    })
    .collect();

  s = s.to_lowercase();
  s.retain(|c| !matches!(c, '.' | '?' | '!'));

  for (from, to) in GENDER_MAP {
    s = replace_word(&s, from, to);
  }
  for (from, to) in CONTRACTIONS {
    s = replace_word(&s, from, to);
  }

  s.split_whitespace().collect::<Vec<_>>().join(" ")
}
