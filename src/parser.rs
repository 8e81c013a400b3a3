// (C) Copyright 2019-2020 Hewlett Packard Enterprise Development LP

//! Line-oriented Dockerfile parser.
//!
//! Raw bytes are joined into logical lines (honoring the escape-character
//! directive), then each logical line is tokenized into a [`Node`] using a
//! per-keyword argument form: plain string, whitespace-delimited list,
//! JSON-or-shell, key=value pairs, or sub-command.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use snafu::ResultExt;

use crate::error::*;
use crate::node::{Heredoc, Node};

lazy_static! {
  static ref DIRECTIVE_LINE: Regex =
    Regex::new(r"^#[ \t]*([a-zA-Z][a-zA-Z0-9]*)[ \t]*=[ \t]*(\S+)[ \t]*$").unwrap();
  static ref FLAG_TOKEN: Regex =
    Regex::new(r"^--[a-zA-Z][a-zA-Z0-9-]*(=.*)?$").unwrap();
  static ref HEREDOC_TOKEN: Regex =
    Regex::new(r#"^<<(-?)(["']?)([a-zA-Z_][a-zA-Z0-9_]*)(["']?)$"#).unwrap();
}

/// Parses a Dockerfile from a reader, returning the root [`Node`].
pub fn parse_dockerfile<R: Read>(reader: R) -> Result<Node> {
  let mut buf = String::new();
  let mut buf_reader = BufReader::new(reader);
  buf_reader
    .read_to_string(&mut buf)
    .context(ReadError { path: "<reader>" })?;

  parse(&buf)
}

/// Opens and parses a Dockerfile at the given path.
pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Node> {
  let path = path.as_ref();
  let f = File::open(path).context(ReadError { path })?;

  let mut buf = String::new();
  BufReader::new(f)
    .read_to_string(&mut buf)
    .context(ReadError { path })?;

  parse(&buf)
}

/// A heredoc marker found among an instruction's words, whose body still
/// needs to be collected from the following lines.
struct PendingHeredoc {
  name: String,
  expand: bool,
  chomp: bool
}

fn parse(input: &str) -> Result<Node> {
  let lines: Vec<&str> = input
    .split('\n')
    .map(|l| l.strip_suffix('\r').unwrap_or(l))
    .collect();

  let mut escape = '\\';
  let mut syntax = None;
  let mut i = 0;

  // parser directives: consecutive `# key=value` comments at the top of
  // the file, ended by the first blank line, instruction, or plain comment
  while i < lines.len() {
    let trimmed = lines[i].trim();
    if !trimmed.starts_with('#') {
      break;
    }

    let caps = match DIRECTIVE_LINE.captures(trimmed) {
      Some(caps) => caps,
      None => break
    };

    match caps[1].to_ascii_lowercase().as_str() {
      "escape" => {
        escape = match &caps[2] {
          "\\" => '\\',
          "`" => '`',
          other => {
            return ParseError {
              line: i + 1,
              message: format!("invalid escape token {:?}", other)
            }.fail()
          }
        };
        tracing::debug!(escape = %escape, "escape directive");
      },
      "syntax" => syntax = Some(caps[2].to_string()),
      _ => break
    }

    i += 1;
  }

  let mut root = Node::root(Vec::new());
  root.escape = escape;
  if let Some(syntax) = syntax {
    root.attributes.insert(format!("syntax={}", syntax));
  }

  while i < lines.len() {
    let raw = lines[i];
    let start_line = i + 1;
    i += 1;

    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
      continue;
    }

    // join continuation lines into one logical line; comments and blank
    // lines inside a continuation are skipped
    let mut logical = String::new();
    let mut current = raw.trim_start();

    loop {
      let piece = current.trim_end();
      if piece.ends_with(escape) {
        logical.push_str(&piece[..piece.len() - escape.len_utf8()]);

        let mut next = None;
        while i < lines.len() {
          let candidate = lines[i];
          i += 1;
          let ct = candidate.trim();
          if ct.is_empty() || ct.starts_with('#') {
            continue;
          }
          next = Some(candidate);
          break;
        }

        match next {
          Some(line) => current = line,
          None => break
        }
      } else {
        logical.push_str(current);
        break;
      }
    }

    let (mut node, pending) = parse_line(&logical, start_line, escape)?;

    for PendingHeredoc { name, expand, chomp } in pending {
      let mut content = String::new();
      let mut terminated = false;

      while i < lines.len() {
        let body = lines[i];
        i += 1;

        let line = if chomp {
          body.trim_start_matches('\t')
        } else {
          body
        };

        if line == name {
          terminated = true;
          break;
        }

        content.push_str(line);
        content.push('\n');
      }

      if !terminated {
        return ParseError {
          line: start_line,
          message: format!("unterminated heredoc {:?}", name)
        }.fail();
      }

      node.heredocs.push(Heredoc { name, content, expand, chomp });
    }

    root.children.push(node);
  }

  Ok(root)
}

fn parse_line(logical: &str, line: usize, escape: char) -> Result<(Node, Vec<PendingHeredoc>)> {
  let (keyword, rest) = split_first_word(logical);
  let value = keyword.to_lowercase();
  let (flags, rest) = extract_flags(rest);

  let mut node = Node {
    value: value.clone(),
    original: logical.to_string(),
    start_line: line,
    flags,
    escape,
    ..Node::default()
  };
  let mut pending = Vec::new();

  match value.as_str() {
    "run" | "cmd" | "entrypoint" | "shell" =>
      parse_maybe_json(&mut node, rest, line, &mut pending)?,

    "add" | "copy" | "volume" =>
      parse_maybe_json_to_list(&mut node, rest, line, &mut pending)?,

    "env" | "label" =>
      parse_name_val(&mut node, rest, line, escape, &value)?,

    "arg" =>
      parse_name_or_name_val(&mut node, rest, line, escape)?,

    "from" | "expose" | "onbuild" =>
      parse_strings_whitespace_delimited(&mut node, rest),

    "healthcheck" =>
      parse_health_config(&mut node, rest, line)?,

    // user, workdir, stopsignal, maintainer, and anything unrecognized
    _ => parse_string(&mut node, rest)
  }

  Ok((node, pending))
}

/// Splits off the first whitespace-delimited word; the remainder has its
/// leading whitespace removed.
fn split_first_word(s: &str) -> (&str, &str) {
  let s = s.trim_start();
  match s.find(char::is_whitespace) {
    Some(pos) => (&s[..pos], s[pos..].trim_start()),
    None => (s, "")
  }
}

/// Strips leading `--name[=value]` tokens into a flag list. A bare `--`
/// ends flag parsing.
fn extract_flags(rest: &str) -> (Vec<String>, &str) {
  let mut flags = Vec::new();
  let mut s = rest;

  loop {
    let t = s.trim_start();
    let (word, tail) = split_first_word(t);

    if word == "--" {
      return (flags, tail);
    }

    if word.starts_with("--") && FLAG_TOKEN.is_match(word) {
      flags.push(word.to_string());
      s = tail;
    } else {
      return (flags, t);
    }
  }
}

/// The whole remainder as a single argument.
fn parse_string(node: &mut Node, rest: &str) {
  let rest = rest.trim();
  if !rest.is_empty() {
    node.args.push(rest.to_string());
  }
}

/// Whitespace-delimited argument list (FROM, EXPOSE, ONBUILD).
fn parse_strings_whitespace_delimited(node: &mut Node, rest: &str) {
  node.args.extend(rest.split_whitespace().map(String::from));
}

/// JSON exec form or a single shell-form string (RUN, CMD, ENTRYPOINT,
/// SHELL).
fn parse_maybe_json(
  node: &mut Node,
  rest: &str,
  line: usize,
  pending: &mut Vec<PendingHeredoc>
) -> Result<()> {
  let rest = rest.trim();

  if rest.starts_with('[') {
    node.args = parse_json_array(rest, line)?;
    node.attributes.insert("json".to_string());
    return Ok(());
  }

  collect_heredocs(rest, pending);
  if !rest.is_empty() {
    node.args.push(rest.to_string());
  }

  Ok(())
}

/// JSON exec form or a whitespace-delimited list (ADD, COPY, VOLUME).
fn parse_maybe_json_to_list(
  node: &mut Node,
  rest: &str,
  line: usize,
  pending: &mut Vec<PendingHeredoc>
) -> Result<()> {
  let rest = rest.trim();

  if rest.starts_with('[') {
    node.args = parse_json_array(rest, line)?;
    node.attributes.insert("json".to_string());
    return Ok(());
  }

  collect_heredocs(rest, pending);
  parse_strings_whitespace_delimited(node, rest);
  Ok(())
}

/// `NONE`, or `CMD` followed by JSON or shell-form arguments.
fn parse_health_config(node: &mut Node, rest: &str, line: usize) -> Result<()> {
  let (kind, tail) = split_first_word(rest);
  if kind.is_empty() {
    return Ok(());
  }
  node.args.push(kind.to_string());

  let tail = tail.trim();
  if tail.starts_with('[') {
    node.args.extend(parse_json_array(tail, line)?);
    node.attributes.insert("json".to_string());
  } else if !tail.is_empty() {
    node.args.push(tail.to_string());
  }

  Ok(())
}

/// Key/value pairs (ENV, LABEL). Emits alternating key and value
/// arguments; the legacy `KEY VALUE` form preserves the raw remainder as
/// the value.
fn parse_name_val(
  node: &mut Node,
  rest: &str,
  line: usize,
  escape: char,
  instruction: &str
) -> Result<()> {
  let words = split_quoted_words(rest, escape, line)?;
  if words.is_empty() {
    return Ok(());
  }

  if !words[0].contains('=') {
    // legacy single-pair form, the value keeps its raw spacing
    let (key, value) = split_first_word(rest);
    if value.is_empty() {
      return ParseError {
        line,
        message: format!("{} must have two arguments", instruction.to_uppercase())
      }.fail();
    }

    node.args.push(maybe_unquote(key)?);
    node.args.push(value.trim_end().to_string());
    return Ok(());
  }

  for word in words {
    let (key, value) = split_pair(&word, line, instruction)?;
    node.args.push(key);
    node.args.push(value);
  }

  Ok(())
}

/// `NAME` or `NAME=VALUE` tokens (ARG).
fn parse_name_or_name_val(
  node: &mut Node,
  rest: &str,
  line: usize,
  escape: char
) -> Result<()> {
  for word in split_quoted_words(rest, escape, line)? {
    if word.contains('=') {
      let (key, value) = split_pair(&word, line, "arg")?;
      node.args.push(format!("{}={}", key, value));
    } else {
      node.args.push(word);
    }
  }

  Ok(())
}

fn parse_json_array(rest: &str, line: usize) -> Result<Vec<String>> {
  serde_json::from_str(rest).context(JsonParseError { line })
}

/// Records `<<EOF`-style markers found among the instruction's words.
fn collect_heredocs(rest: &str, pending: &mut Vec<PendingHeredoc>) {
  for word in rest.split_whitespace() {
    if let Some(caps) = HEREDOC_TOKEN.captures(word) {
      // opening and closing quotes must agree
      if caps[2] != caps[4] {
        continue;
      }

      pending.push(PendingHeredoc {
        name: caps[3].to_string(),
        expand: caps[2].is_empty(),
        chomp: !caps[1].is_empty()
      });
    }
  }
}

/// Splits on whitespace while keeping quoted segments (and their quotes)
/// intact, honoring the escape character inside double quotes.
fn split_quoted_words(rest: &str, escape: char, line: usize) -> Result<Vec<String>> {
  let mut words = Vec::new();
  let mut word = String::new();
  let mut in_word = false;
  let mut quote: Option<char> = None;
  let mut chars = rest.chars().peekable();

  while let Some(c) = chars.next() {
    match quote {
      Some(q) => {
        if c == escape && q != '\'' {
          word.push(c);
          if let Some(&next) = chars.peek() {
            word.push(next);
            chars.next();
          }
        } else {
          word.push(c);
          if c == q {
            quote = None;
          }
        }
      },
      None => {
        if c.is_whitespace() {
          if in_word {
            words.push(std::mem::take(&mut word));
            in_word = false;
          }
        } else {
          in_word = true;
          if c == '\'' || c == '"' {
            quote = Some(c);
            word.push(c);
          } else if c == escape {
            word.push(c);
            if let Some(&next) = chars.peek() {
              word.push(next);
              chars.next();
            }
          } else {
            word.push(c);
          }
        }
      }
    }
  }

  if quote.is_some() {
    return ParseError {
      line,
      message: "unterminated quote".to_string()
    }.fail();
  }

  if in_word {
    words.push(word);
  }

  Ok(words)
}

/// Splits a `key=value` token, unquoting either side.
fn split_pair(word: &str, line: usize, instruction: &str) -> Result<(String, String)> {
  let eq = match word.starts_with('"') || word.starts_with('\'') {
    true => closing_quote(word).map(|end| end + 1).filter(|&pos| {
      word.as_bytes().get(pos) == Some(&b'=')
    }),
    false => word.find('=')
  };

  let eq = match eq {
    Some(eq) if eq > 0 => eq,
    _ => {
      return ParseError {
        line,
        message: format!(
          "syntax error - can't find = in {:?}. Must be of the form: name=value",
          word
        )
      }.fail()
    }
  };

  let key = maybe_unquote(&word[..eq])?;
  let value = maybe_unquote(&word[eq + 1..])?;

  if key.is_empty() {
    return ParseError {
      line,
      message: format!("{} names can not be blank", instruction.to_uppercase())
    }.fail();
  }

  Ok((key, value))
}

/// Byte offset of the quote closing the quote that opens this token.
fn closing_quote(word: &str) -> Option<usize> {
  let mut chars = word.char_indices();
  let (_, open) = chars.next()?;
  let mut skip = false;

  for (pos, c) in chars {
    if skip {
      skip = false;
      continue;
    }
    if c == '\\' && open == '"' {
      skip = true;
    } else if c == open {
      return Some(pos);
    }
  }

  None
}

fn maybe_unquote(s: &str) -> Result<String> {
  if s.starts_with('"') || s.starts_with('\'') {
    enquote::unquote(s).context(UnescapeError)
  } else {
    Ok(s.to_string())
  }
}

#[cfg(test)]
mod tests {
  use indoc::indoc;
  use pretty_assertions::assert_eq;

  use super::*;

  fn parse_str(s: &str) -> Node {
    parse(s).unwrap()
  }

  fn strings(strs: &[&str]) -> Vec<String> {
    strs.iter().map(|s| String::from(*s)).collect()
  }

  #[test]
  fn basic_instructions() {
    let root = parse_str(indoc!(r#"
      FROM alpine:3.19
      RUN apk add --no-cache curl
    "#));

    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[0].value, "from");
    assert_eq!(root.children[0].args, strings(&["alpine:3.19"]));
    assert_eq!(root.children[0].start_line, 1);
    assert_eq!(root.children[1].value, "run");
    assert_eq!(root.children[1].args, strings(&["apk add --no-cache curl"]));
  }

  #[test]
  fn comments_and_blanks() {
    let root = parse_str(indoc!(r#"
      # header comment
      FROM alpine

        # indented comment

      RUN echo hi
    "#));

    assert_eq!(root.children.len(), 2);
  }

  #[test]
  fn line_continuation() {
    let root = parse_str("RUN apk add --no-cache \\\n    curl\nRUN echo done\n");

    assert_eq!(root.children.len(), 2);
    assert_eq!(
      root.children[0].args,
      strings(&["apk add --no-cache     curl"])
    );
  }

  #[test]
  fn continuation_skips_comments() {
    let root = parse_str(indoc!(r#"
      RUN apk add \
        # a comment

        curl
    "#));

    assert_eq!(root.children.len(), 1);
    assert_eq!(root.children[0].args, strings(&["apk add   curl"]));
  }

  #[test]
  fn escape_directive() {
    let root = parse_str("# escape=`\nFROM alpine\nRUN echo hi `\n  there\n");

    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[1].args, strings(&["echo hi   there"]));

    // backslash is no longer a continuation character
    let root = parse_str("# escape=`\nRUN echo \\\n");
    assert_eq!(root.children[0].args, strings(&["echo \\"]));
  }

  #[test]
  fn bad_escape_directive() {
    let err = parse("# escape=^\nFROM alpine\n").unwrap_err();
    assert!(err.to_string().contains("invalid escape token"));
  }

  #[test]
  fn syntax_directive_is_recorded() {
    let root = parse_str("# syntax=docker/dockerfile:1\nFROM alpine\n");
    assert!(root.attributes.contains("syntax=docker/dockerfile:1"));
  }

  #[test]
  fn directive_block_ends_at_plain_comment() {
    // the escape directive below a plain comment is just a comment
    let root = parse_str("# hello\n# escape=`\nRUN echo \\\n  hi\n");
    assert_eq!(root.children[0].args, strings(&["echo   hi"]));
  }

  #[test]
  fn json_exec_form() {
    let root = parse_str(r#"RUN ["echo", "hello world"]"#);

    let node = &root.children[0];
    assert_eq!(node.args, strings(&["echo", "hello world"]));
    assert!(node.attributes.contains("json"));
  }

  #[test]
  fn malformed_json_is_an_error() {
    let err = parse("CMD [\"unterminated\n").unwrap_err();
    match err {
      Error::JsonParseError { line, .. } => assert_eq!(line, 1),
      other => panic!("expected JsonParseError, got {:?}", other)
    }
  }

  #[test]
  fn flags_are_stripped() {
    let root = parse_str("COPY --from=builder --chown=1:1 /src /dest\n");

    let node = &root.children[0];
    assert_eq!(node.flags, strings(&["--from=builder", "--chown=1:1"]));
    assert_eq!(node.args, strings(&["/src", "/dest"]));
  }

  #[test]
  fn env_pairs() {
    let root = parse_str(indoc!(r#"
      ENV foo=bar baz="quoted value" qux='single'
      ENV legacy value with  spacing
    "#));

    assert_eq!(
      root.children[0].args,
      strings(&["foo", "bar", "baz", "quoted value", "qux", "single"])
    );
    assert_eq!(
      root.children[1].args,
      strings(&["legacy", "value with  spacing"])
    );
  }

  #[test]
  fn env_requires_value() {
    assert!(parse("ENV name\n").is_err());
    assert!(parse("ENV name=value name2\n").is_err());
  }

  #[test]
  fn quoted_label_keys() {
    let root = parse_str(r#"LABEL "foo=bar"=bar other="x""#);

    assert_eq!(
      root.children[0].args,
      strings(&["foo=bar", "bar", "other", "x"])
    );
  }

  #[test]
  fn escaped_quotes_in_values() {
    let root = parse_str(r#"ENV foo="bar\"baz""#);
    assert_eq!(root.children[0].args, strings(&["foo", "bar\"baz"]));
  }

  #[test]
  fn unterminated_quote() {
    let err = parse("ENV foo=\"bar\n").unwrap_err();
    assert!(err.to_string().contains("unterminated quote"));
  }

  #[test]
  fn arg_forms() {
    let root = parse_str(indoc!(r#"
      ARG FOO
      ARG BAR=baz QUX=2
    "#));

    assert_eq!(root.children[0].args, strings(&["FOO"]));
    assert_eq!(root.children[1].args, strings(&["BAR=baz", "QUX=2"]));
  }

  #[test]
  fn heredocs() {
    let root = parse_str(indoc!(r#"
      RUN <<EOF
      echo hello
      echo world
      EOF
      RUN echo after
    "#));

    assert_eq!(root.children.len(), 2);
    let node = &root.children[0];
    assert_eq!(node.heredocs.len(), 1);
    assert_eq!(node.heredocs[0].name, "EOF");
    assert_eq!(node.heredocs[0].content, "echo hello\necho world\n");
    assert!(node.heredocs[0].expand);
    assert!(!node.heredocs[0].chomp);
  }

  #[test]
  fn heredoc_chomp_strips_tabs() {
    let root = parse_str("RUN <<-EOF\n\techo hi\n\tEOF\n");

    let doc = &root.children[0].heredocs[0];
    assert_eq!(doc.content, "echo hi\n");
    assert!(doc.chomp);
  }

  #[test]
  fn quoted_heredoc_suppresses_expansion() {
    let root = parse_str("RUN <<'EOF'\necho $HOME\nEOF\n");

    let doc = &root.children[0].heredocs[0];
    assert!(!doc.expand);
    assert_eq!(doc.content, "echo $HOME\n");
  }

  #[test]
  fn unterminated_heredoc() {
    let err = parse("RUN <<EOF\necho hi\n").unwrap_err();
    assert!(err.to_string().contains("unterminated heredoc"));
  }

  #[test]
  fn healthcheck_forms() {
    let root = parse_str(indoc!(r#"
      HEALTHCHECK --interval=5s CMD curl -f http://localhost/
      HEALTHCHECK CMD ["curl", "-f", "http://localhost/"]
      HEALTHCHECK NONE
    "#));

    assert_eq!(root.children[0].flags, strings(&["--interval=5s"]));
    assert_eq!(
      root.children[0].args,
      strings(&["CMD", "curl -f http://localhost/"])
    );
    assert_eq!(
      root.children[1].args,
      strings(&["CMD", "curl", "-f", "http://localhost/"])
    );
    assert!(root.children[1].attributes.contains("json"));
    assert_eq!(root.children[2].args, strings(&["NONE"]));
  }

  #[test]
  fn unknown_instructions_become_nodes() {
    let root = parse_str("FROM alpine\nFROBNICATE all the things\n");

    assert_eq!(root.children[1].value, "frobnicate");
    assert_eq!(root.children[1].args, strings(&["all the things"]));
    assert_eq!(root.children[1].original, "FROBNICATE all the things");
  }

  #[test]
  fn crlf_line_endings() {
    let root = parse_str("FROM alpine\r\nRUN echo hi\r\n");
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[1].args, strings(&["echo hi"]));
  }
}
