// (C) Copyright 2020 Hewlett Packard Enterprise Development LP

use std::fs;
use std::path::Path;

use snafu::ResultExt;

use crate::error::*;

/// Reads an ignore file: one pattern per line, `#` comments and blank
/// lines dropped, leading and trailing slashes trimmed. Order and
/// duplicates are preserved.
pub fn parse_ignore<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
  let path = path.as_ref();
  let content = fs::read_to_string(path).context(ReadError { path })?;

  Ok(
    content
      .split('\n')
      .filter_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
          return None;
        }

        let pattern = line.trim_matches('/');
        if pattern.is_empty() {
          None
        } else {
          Some(pattern.to_string())
        }
      })
      .collect()
  )
}

/// Reads `<dir>/.containerignore`, falling back to `<dir>/.dockerignore`.
/// A directory with neither file yields an empty pattern list.
pub fn parse_dockerignore<P: AsRef<Path>>(dir: P) -> Result<Vec<String>> {
  let container_ignore = dir.as_ref().join(".containerignore");
  if container_ignore.exists() {
    return parse_ignore(container_ignore);
  }

  let docker_ignore = dir.as_ref().join(".dockerignore");
  if docker_ignore.exists() {
    return parse_ignore(docker_ignore);
  }

  Ok(Vec::new())
}

#[cfg(test)]
mod tests {
  use std::fs;

  use pretty_assertions::assert_eq;

  use super::*;

  fn write_and_parse(lines: &[&str]) -> Vec<String> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ignore");
    fs::write(&path, lines.join("\n")).unwrap();
    parse_ignore(&path).unwrap()
  }

  #[test]
  fn patterns_survive_in_order() {
    assert_eq!(
      write_and_parse(&["first", "second", "", "third", "fourth"]),
      vec!["first", "second", "third", "fourth"]
    );
  }

  #[test]
  fn comments_are_dropped() {
    assert_eq!(
      write_and_parse(&["#first", "#second", "", "third", "fourth"]),
      vec!["third", "fourth"]
    );
    assert_eq!(
      write_and_parse(&["  # indented comment", "kept"]),
      vec!["kept"]
    );
  }

  #[test]
  fn hash_inside_pattern_is_kept() {
    assert_eq!(
      write_and_parse(&["first", "th#rd", "fifth#"]),
      vec!["first", "th#rd", "fifth#"]
    );
  }

  #[test]
  fn slashes_are_trimmed() {
    assert_eq!(
      write_and_parse(&["/first", "second/", "/third/", "///fourth//", "fif/th#", "/"]),
      vec!["first", "second", "third", "fourth", "fif/th#"]
    );
  }

  #[test]
  fn parsing_is_idempotent() {
    let once = write_and_parse(&["  /a/b/ ", "#gone", "c", "", "c"]);
    let strs: Vec<&str> = once.iter().map(String::as_str).collect();
    let twice = write_and_parse(&strs);
    assert_eq!(once, twice);
  }

  #[test]
  fn containerignore_wins_over_dockerignore() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join(".dockerignore"), "from-docker\n").unwrap();
    assert_eq!(parse_dockerignore(dir.path()).unwrap(), vec!["from-docker"]);

    fs::write(dir.path().join(".containerignore"), "from-container\n").unwrap();
    assert_eq!(
      parse_dockerignore(dir.path()).unwrap(),
      vec!["from-container"]
    );
  }

  #[test]
  fn missing_files_yield_no_patterns() {
    let dir = tempfile::tempdir().unwrap();
    assert_eq!(parse_dockerignore(dir.path()).unwrap(), Vec::<String>::new());
  }
}
