//! Small utility helpers used across modules.

use chrono::NaiveDate;

/// Today's date in UTC. Study-history stamps (first seen, mastered) are
/// calendar dates, not instants.
pub fn today() -> NaiveDate {
  chrono::Utc::now().date_naive()
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads. The cut backs
/// off to the nearest char boundary so multibyte input never splits.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn short_strings_pass_through() {
    assert_eq!(trunc_for_log("hello", 80), "hello");
    assert_eq!(trunc_for_log("", 0), "");
  }

  #[test]
  fn truncation_backs_off_to_a_char_boundary() {
    // A curly apostrophe straddling the cut must not panic the caller.
    let s = format!("{}\u{2019}s answer goes on", "a".repeat(79));
    let out = trunc_for_log(&s, 80);
    assert!(out.starts_with(&"a".repeat(79)));
    assert!(out.ends_with(&format!("({} bytes total)", s.len())));

    // Pure ASCII cuts exactly at the limit.
    let ascii = "x".repeat(100);
    assert!(trunc_for_log(&ascii, 80).starts_with(&"x".repeat(80)));
  }
}
