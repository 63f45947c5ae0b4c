//! Small utility helpers used across modules.

/// Punctuation stripped from the end of a tapped token before matching.
const TRAILING_PUNCT: &[char] = &['.', ',', '!', '?', ';'];

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
/// This is intentionally simple (no nested/conditional logic).
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Strip trailing punctuation and lowercase, so "Lazim," and "lazim" compare equal.
pub fn normalize_token(token: &str) -> String {
  token.trim().trim_end_matches(TRAILING_PUNCT).to_lowercase()
}

/// True if `token` is `word` modulo trailing punctuation and case.
pub fn token_matches(token: &str, word: &str) -> bool {
  let t = normalize_token(token);
  !t.is_empty() && t == normalize_token(word)
}

/// Position of the first whitespace-separated token of `sentence` matching `word`.
pub fn token_position(sentence: &str, word: &str) -> Option<usize> {
  sentence.split_whitespace().position(|t| token_matches(t, word))
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge request/response payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.chars().count() <= max {
    s.to_string()
  } else {
    format!("{}… ({} bytes total)", s.chars().take(max).collect::<String>(), s.len())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fill_template_replaces_all_keys() {
    let out = fill_template("{dirty} -> {pure} ({dirty})", &[("dirty", "Lazim"), ("pure", "Pêwîst")]);
    assert_eq!(out, "Lazim -> Pêwîst (Lazim)");
  }

  #[test]
  fn normalize_strips_only_trailing_punctuation() {
    assert_eq!(normalize_token("Lazim."), "lazim");
    assert_eq!(normalize_token("ye?"), "ye");
    assert_eq!(normalize_token("Cewab;!"), "cewab");
    assert_eq!(normalize_token(".Lazim"), ".lazim");
  }

  #[test]
  fn matching_is_case_insensitive_on_non_ascii() {
    assert!(token_matches("PÊWÎST", "pêwîst"));
    assert!(!token_matches("hevalê", "Heval"));
    assert!(!token_matches("...", ""));
  }

  #[test]
  fn token_position_finds_first_match() {
    assert_eq!(token_position("Lazim e ez herim.", "lazim"), Some(0));
    assert_eq!(token_position("Ez muntezir im.", "Muntezir"), Some(1));
    assert_eq!(token_position("Ez herim.", "Lazim"), None);
  }

  #[test]
  fn trunc_for_log_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let t = trunc_for_log("pêwîstpêwîst", 3);
    assert!(t.starts_with("pêw…"));
  }
}
