// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Shell-style word expansion against a `KEY=VALUE` scope.

use std::iter::Peekable;
use std::str::Chars;

use crate::error::*;

/// Looks up a variable in a `KEY=VALUE` environment list.
pub(crate) fn env_value<'a>(env: &'a [String], name: &str) -> Option<&'a str> {
  env.iter().find_map(|entry| {
    let mut parts = entry.splitn(2, '=');
    match (parts.next(), parts.next()) {
      (Some(key), Some(value)) if key == name => Some(value),
      _ => None
    }
  })
}

/// Merges two `KEY=VALUE` lists. Entries from `overrides` replace matching
/// keys in place and are appended otherwise, so the result preserves the
/// position of each key's first assignment.
pub(crate) fn merge_env(defaults: &[String], overrides: &[String]) -> Vec<String> {
  let mut merged = defaults.to_vec();

  for entry in overrides {
    let key = entry.splitn(2, '=').next().unwrap_or("");
    match merged
      .iter_mut()
      .find(|existing| existing.splitn(2, '=').next() == Some(key))
    {
      Some(existing) => *existing = entry.clone(),
      None => merged.push(entry.clone())
    }
  }

  merged
}

/// Expands `$NAME`, `${NAME}` and the `${NAME:-...}` family in a single
/// word. Single quotes suppress expansion, double quotes allow it, and the
/// escape character suppresses the `$` that follows it. Undeclared names
/// expand to the empty string.
pub(crate) fn process_word(word: &str, env: &[String], escape: char) -> Result<String> {
  let mut lex = ShellWord::new(word, env, escape);
  let words = lex.process(false)?;

  Ok(words.into_iter().next().unwrap_or_default())
}

/// Like [`process_word`], but unquoted whitespace (including whitespace
/// introduced by an expansion) splits the result into multiple words.
pub(crate) fn process_words(word: &str, env: &[String], escape: char) -> Result<Vec<String>> {
  ShellWord::new(word, env, escape).process(true)
}

struct ShellWord<'a> {
  chars: Peekable<Chars<'a>>,
  env: &'a [String],
  escape: char
}

impl<'a> ShellWord<'a> {
  fn new(word: &'a str, env: &'a [String], escape: char) -> ShellWord<'a> {
    ShellWord {
      chars: word.chars().peekable(),
      env,
      escape
    }
  }

  fn process(&mut self, split: bool) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();

    // a quoted empty string still produces a word
    let mut quoted = false;

    while let Some(ch) = self.chars.next() {
      match ch {
        '\'' => {
          quoted = true;
          loop {
            match self.chars.next() {
              Some('\'') => break,
              Some(inner) => current.push(inner),
              None => return instruction_error("syntax error: unterminated single quote")
            }
          }
        },

        '"' => {
          quoted = true;
          loop {
            match self.chars.next() {
              Some('"') => break,
              Some('$') => current.push_str(&self.process_dollar()?),
              Some(c) if c == self.escape => {
                match self.chars.peek() {
                  Some(&next) if next == '$' || next == '"' || next == self.escape => {
                    current.push(next);
                    self.chars.next();
                  },
                  Some(_) => current.push(c),
                  None => {
                    return instruction_error("syntax error: unterminated double quote")
                  }
                }
              },
              Some(inner) => current.push(inner),
              None => return instruction_error("syntax error: unterminated double quote")
            }
          }
        },

        '$' => {
          let value = self.process_dollar()?;
          if split {
            // whitespace inside the expansion splits words too
            for c in value.chars() {
              if c.is_whitespace() {
                if !current.is_empty() || quoted {
                  words.push(std::mem::take(&mut current));
                  quoted = false;
                }
              } else {
                current.push(c);
              }
            }
          } else {
            current.push_str(&value);
          }
        },

        c if c == self.escape => {
          if let Some(next) = self.chars.next() {
            current.push(next);
          }
        },

        c if split && c.is_whitespace() => {
          if !current.is_empty() || quoted {
            words.push(std::mem::take(&mut current));
            quoted = false;
          }
        },

        c => current.push(c)
      }
    }

    if !current.is_empty() || quoted {
      words.push(current);
    }

    Ok(words)
  }

  /// Handles the text following a `$`.
  fn process_dollar(&mut self) -> Result<String> {
    match self.chars.peek() {
      Some('{') => {
        self.chars.next();
        self.process_braced()
      },
      Some(&c) if c == '_' || c.is_ascii_alphabetic() => {
        let name = self.read_name();
        Ok(self.lookup(&name).unwrap_or_default())
      },
      // not a variable reference, keep the dollar sign literal
      _ => Ok("$".to_string())
    }
  }

  /// Handles `${NAME}`, `${NAME:-default}`, `${NAME:+alt}`, `${NAME:?}`
  /// and the colon-less variants.
  fn process_braced(&mut self) -> Result<String> {
    let name = self.read_name();
    if name.is_empty() {
      return instruction_error("syntax error: bad substitution");
    }

    let mut strict = false;
    let op = loop {
      match self.chars.next() {
        Some('}') => {
          return Ok(self.lookup(&name).unwrap_or_default());
        },
        Some(':') if !strict => strict = true,
        Some(c @ '-') | Some(c @ '+') | Some(c @ '?') => break c,
        _ => return instruction_error("syntax error: missing '}'")
      }
    };

    let word = self.read_braced_word()?;
    let value = self.lookup(&name);
    let unset = match (&value, strict) {
      (None, _) => true,
      (Some(v), true) => v.is_empty(),
      (Some(_), false) => false
    };

    match op {
      '-' => {
        if unset {
          process_word(&word, self.env, self.escape)
        } else {
          Ok(value.unwrap_or_default())
        }
      },
      '+' => {
        if unset {
          Ok(String::new())
        } else {
          process_word(&word, self.env, self.escape)
        }
      },
      '?' => {
        if unset {
          instruction_error(format!("{} is not allowed to be unset", name))
        } else {
          Ok(value.unwrap_or_default())
        }
      },
      _ => unreachable!()
    }
  }

  /// Reads the modifier word up to the matching close brace, allowing
  /// nested `${...}` references.
  fn read_braced_word(&mut self) -> Result<String> {
    let mut depth = 1;
    let mut word = String::new();

    for c in &mut self.chars {
      match c {
        '{' => {
          depth += 1;
          word.push(c);
        },
        '}' => {
          depth -= 1;
          if depth == 0 {
            return Ok(word);
          }
          word.push(c);
        },
        _ => word.push(c)
      }
    }

    instruction_error("syntax error: missing '}'")
  }

  fn read_name(&mut self) -> String {
    let mut name = String::new();

    while let Some(&c) = self.chars.peek() {
      if c == '_' || c.is_ascii_alphanumeric() {
        name.push(c);
        self.chars.next();
      } else {
        break;
      }
    }

    name
  }

  fn lookup(&self, name: &str) -> Option<String> {
    env_value(self.env, name).map(String::from)
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  fn env(entries: &[&str]) -> Vec<String> {
    entries.iter().map(|s| s.to_string()).collect()
  }

  fn expand(word: &str, entries: &[&str]) -> String {
    process_word(word, &env(entries), '\\').unwrap()
  }

  #[test]
  fn plain_variables() {
    assert_eq!(expand("$FOO", &["FOO=bar"]), "bar");
    assert_eq!(expand("${FOO}", &["FOO=bar"]), "bar");
    assert_eq!(expand("pre-${FOO}-post", &["FOO=bar"]), "pre-bar-post");
    assert_eq!(expand("$FOO$BAR", &["FOO=a", "BAR=b"]), "ab");
  }

  #[test]
  fn longest_identifier_wins() {
    assert_eq!(expand("$FOOBAR", &["FOO=bar", "FOOBAR=baz"]), "baz");
    assert_eq!(expand("$FOO-BAR", &["FOO=bar"]), "bar-BAR");
  }

  #[test]
  fn undeclared_expands_empty() {
    assert_eq!(expand("a${MISSING}b", &[]), "ab");
    assert_eq!(expand("$MISSING", &["OTHER=1"]), "");
  }

  #[test]
  fn quotes() {
    assert_eq!(expand("'$FOO'", &["FOO=bar"]), "$FOO");
    assert_eq!(expand("\"$FOO\"", &["FOO=bar"]), "bar");
    assert_eq!(expand("\"a b\"", &[]), "a b");
  }

  #[test]
  fn escape_suppresses_expansion() {
    assert_eq!(expand(r"\$FOO", &["FOO=bar"]), "$FOO");
    assert_eq!(expand("\"\\$FOO\"", &["FOO=bar"]), "$FOO");
    assert_eq!(
      process_word("`$FOO", &env(&["FOO=bar"]), '`').unwrap(),
      "$FOO"
    );
  }

  #[test]
  fn default_values() {
    assert_eq!(expand("${FOO:-fallback}", &[]), "fallback");
    assert_eq!(expand("${FOO:-fallback}", &["FOO="]), "fallback");
    assert_eq!(expand("${FOO:-fallback}", &["FOO=set"]), "set");
    assert_eq!(expand("${FOO-fallback}", &["FOO="]), "");
    assert_eq!(expand("${FOO-fallback}", &[]), "fallback");
    assert_eq!(expand("${FOO:-${BAR}}", &["BAR=nested"]), "nested");
  }

  #[test]
  fn alternate_values() {
    assert_eq!(expand("${FOO:+alt}", &["FOO=set"]), "alt");
    assert_eq!(expand("${FOO:+alt}", &["FOO="]), "");
    assert_eq!(expand("${FOO:+alt}", &[]), "");
    assert_eq!(expand("${FOO+alt}", &["FOO="]), "alt");
  }

  #[test]
  fn required_values() {
    let err = process_word("${FOO:?}", &[], '\\').unwrap_err();
    assert!(err.to_string().contains("FOO is not allowed to be unset"));

    assert_eq!(expand("${FOO:?}", &["FOO=ok"]), "ok");
    assert_eq!(expand("${FOO?}", &["FOO="]), "");
  }

  #[test]
  fn bad_substitution() {
    assert!(process_word("${}", &[], '\\').is_err());
    assert!(process_word("${FOO", &[], '\\').is_err());
    assert!(process_word("'unterminated", &[], '\\').is_err());
  }

  #[test]
  fn word_splitting() {
    assert_eq!(
      process_words("$PORTS 9000", &env(&["PORTS=3000 4000"]), '\\').unwrap(),
      vec!["3000", "4000", "9000"]
    );
    assert_eq!(
      process_words("\"a b\" c", &env(&[]), '\\').unwrap(),
      vec!["a b", "c"]
    );
    assert_eq!(
      process_words("''", &env(&[]), '\\').unwrap(),
      vec![""]
    );
  }

  #[test]
  fn merge_env_order() {
    let merged = merge_env(
      &env(&["A=1", "B=2"]),
      &env(&["B=3", "C=4"])
    );
    assert_eq!(merged, env(&["A=1", "B=3", "C=4"]));
  }

  #[test]
  fn env_value_lookup() {
    let scope = env(&["A=1", "B=x=y"]);
    assert_eq!(env_value(&scope, "A"), Some("1"));
    assert_eq!(env_value(&scope, "B"), Some("x=y"));
    assert_eq!(env_value(&scope, "C"), None);
  }
}
