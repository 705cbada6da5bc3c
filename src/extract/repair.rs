//! Text transforms that turn near-JSON model output into JSON
//!
//! Each step is a pure function over the brace span. `repair` runs them in
//! a fixed order and records which ones changed the text.

use log::trace;

/// One step of the repair pipeline, in application order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RepairStep
{   CloseString
  , CloseArrays
  , QuoteKeys
  , SingleQuotes
  , TrailingCommas
  , CloseObjects
}

/// What the repair pipeline had to do to the text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport
{   /// Steps that changed the text, in order
    pub applied: Vec<RepairStep>
  , /// A string literal was cut off and closed; its value may be partial
    pub truncated: bool
}

/// Run every repair step over `text`
pub fn repair(text: &str) -> (String, RepairReport)
{   let mut report = RepairReport::default();

    let (mut current, truncated) = close_truncated_string(text);
    if truncated
    {   report.truncated = true;
        report.applied.push(RepairStep::CloseString);
    }

    let steps: [(RepairStep, fn(&str) -> String); 5] =
    [   (RepairStep::CloseArrays, close_open_arrays)
      , (RepairStep::QuoteKeys, quote_unquoted_keys)
      , (RepairStep::SingleQuotes, single_to_double_quotes)
      , (RepairStep::TrailingCommas, remove_trailing_commas)
      , (RepairStep::CloseObjects, close_open_objects)
    ];

    for (step, apply) in steps
    {   let next = apply(&current);
        if next != current
        {   trace!("repair step {:?}: {}", step, next);
            report.applied.push(step);
            current = next;
        }
    }

    (current, report)
}

/// String-literal tracking while walking JSON-ish text.
/// Either quote style opens a literal; only the same quote closes it.
#[derive(Debug, Default)]
struct Quotes
{   open: Option<char>
  , escaped: bool
}

impl Quotes
{   /// Feed one char. Returns true when `c` belongs to a string literal,
    /// delimiters included.
    fn step(&mut self, c: char) -> bool
    {   match self.open
        {   Some(q) => {
              if self.escaped
              {   self.escaped = false;
              } else if c == '\\'
              {   self.escaped = true;
              } else if c == q
              {   self.open = None;
              }
              true
            }
          , None => {
              if c == '"' || c == '\''
              {   self.open = Some(c);
                  true
              } else
              {   false
              }
            }
        }
    }
}

/// Close a string literal left open at the end of `text`.
/// If the text still ends with `}` the quote goes before that brace.
/// Returns the new text and whether anything was closed.
pub fn close_truncated_string(text: &str) -> (String, bool)
{   let mut quotes = Quotes::default();
    for c in text.chars()
    {   quotes.step(c);
    }

    let quote = match quotes.open
    {   Some(q) => q
      , None => return (text.to_string(), false)
    };

    let mut out = text.to_string();
    if quotes.escaped
    {   // dangling backslash
        out.pop();
        out.push(quote);
    } else if out.trim_end().ends_with('}')
    {   let keep = out.trim_end().len() - 1;
        out.truncate(keep);
        out.push(quote);
        out.push('}');
    } else
    {   out.push(quote);
    }
    (out, true)
}

/// Brackets still open at the end of `text`, outermost first,
/// with their byte offsets.
fn open_brackets(text: &str) -> Vec<(char, usize)>
{   let mut quotes = Quotes::default();
    let mut stack: Vec<(char, usize)> = Vec::new();
    for (i, c) in text.char_indices()
    {   if quotes.step(c)
        {   continue;
        }
        match c
        {   '{' | '[' => stack.push((c, i))
          , '}' | ']' => {
              let opener = if c == '}' { '{' } else { '[' };
              if stack.last().map(|(o, _)| *o) == Some(opener)
              {   stack.pop();
              }
            }
          , _ => {}
        }
    }
    stack
}

/// Replace the outermost unclosed array, and everything after it, by `[]`
pub fn close_open_arrays(text: &str) -> String
{   let cut = open_brackets(text)
      .into_iter()
      .find(|(c, _)| *c == '[')
      .map(|(_, i)| i);

    match cut
    {   Some(i) => format!("{}[]", &text[..i])
      , None => text.to_string()
    }
}

fn is_ident_start(c: char) -> bool
{   c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool
{   c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Wrap bare identifier keys (`{key: 1}`) in double quotes
pub fn quote_unquoted_keys(text: &str) -> String
{   let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut quotes = Quotes::default();
    let mut last_significant: Option<char> = None;
    let mut i = 0;

    while i < chars.len()
    {   let c = chars[i];
        let in_string = quotes.open.is_some();

        if !in_string
          && is_ident_start(c)
          && matches!(last_significant, Some('{') | Some(','))
        {   let mut end = i;
            while end < chars.len() && is_ident_char(chars[end])
            {   end += 1;
            }
            let mut look = end;
            while look < chars.len() && chars[look].is_whitespace()
            {   look += 1;
            }

            let ident: String = chars[i..end].iter().collect();
            if look < chars.len() && chars[look] == ':'
            {   out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else
            {   out.push_str(&ident);
            }
            last_significant = Some(chars[end - 1]);
            i = end;
            continue;
        }

        quotes.step(c);
        if !in_string && !c.is_whitespace()
        {   last_significant = Some(c);
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Rewrite 'single-quoted' literals as "double-quoted" ones.
/// Embedded `"` get escaped and `\'` loses its backslash.
pub fn single_to_double_quotes(text: &str) -> String
{   let mut out = String::with_capacity(text.len() + 8);
    let mut open: Option<char> = None;
    let mut escaped = false;

    for c in text.chars()
    {   match open
        {   None => {
              if c == '\''
              {   open = Some('\'');
                  out.push('"');
              } else
              {   if c == '"'
                  {   open = Some('"');
                  }
                  out.push(c);
              }
            }
          , Some('"') => {
              out.push(c);
              if escaped
              {   escaped = false;
              } else if c == '\\'
              {   escaped = true;
              } else if c == '"'
              {   open = None;
              }
            }
          , Some(_) => {
              if escaped
              {   escaped = false;
                  if c == '\''
                  {   out.pop();
                  }
                  out.push(c);
              } else if c == '\\'
              {   escaped = true;
                  out.push(c);
              } else if c == '\''
              {   open = None;
                  out.push('"');
              } else if c == '"'
              {   out.push_str("\\\"");
              } else
              {   out.push(c);
              }
            }
        }
    }
    out
}

/// Drop commas followed only by whitespace and then `}`, `]` or end of text
pub fn remove_trailing_commas(text: &str) -> String
{   let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut quotes = Quotes::default();

    for (i, &c) in chars.iter().enumerate()
    {   if !quotes.step(c) && c == ','
        {   let next = chars[i + 1..]
              .iter()
              .find(|n| !n.is_whitespace());
            if matches!(next, None | Some('}') | Some(']'))
            {   continue;
            }
        }
        out.push(c);
    }
    out
}

/// Append closers for every object or array still open
pub fn close_open_objects(text: &str) -> String
{   let mut out = text.to_string();
    for (c, _) in open_brackets(text).into_iter().rev()
    {   out.push(if c == '{' { '}' } else { ']' });
    }
    out
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn closes_cut_string()
    {   let (out, cut) = close_truncated_string(r#"{"analysis": "Fire and"#);
        assert!(cut);
        assert_eq!(out, r#"{"analysis": "Fire and""#);
    }

    #[test]
    fn closes_string_before_final_brace()
    {   let (out, cut) = close_truncated_string(r#"{"a": "b}"#);
        assert!(cut);
        assert_eq!(out, r#"{"a": "b"}"#);
    }

    #[test]
    fn drops_dangling_backslash()
    {   let (out, cut) = close_truncated_string(r#"{"a": "b\"#);
        assert!(cut);
        assert_eq!(out, r#"{"a": "b""#);
    }

    #[test]
    fn apostrophe_inside_double_quotes_is_text()
    {   let text = r#"{"a": "don't"}"#;
        assert_eq!(close_truncated_string(text), (text.to_string(), false));
    }

    #[test]
    fn open_array_becomes_empty()
    {   assert_eq!(
          close_open_arrays(r#"{"a": 1, "tips": ["one", "tw"#),
          r#"{"a": 1, "tips": []"#
        );
        let closed = r#"{"tips": ["a"]}"#;
        assert_eq!(close_open_arrays(closed), closed);
    }

    #[test]
    fn bracket_inside_string_is_ignored()
    {   let text = r#"{"a": "[not an array"}"#;
        assert_eq!(close_open_arrays(text), text);
    }

    #[test]
    fn quotes_bare_keys()
    {   assert_eq!(
          quote_unquoted_keys("{roastText: 'x', burn_level : 3}"),
          r#"{"roastText": 'x', "burn_level" : 3}"#
        );
    }

    #[test]
    fn leaves_bare_values_alone()
    {   let text = r#"{"ok": true, "list": [null, false]}"#;
        assert_eq!(quote_unquoted_keys(text), text);
        let text = r#"{"a": "b, c: d"}"#;
        assert_eq!(quote_unquoted_keys(text), text);
    }

    #[test]
    fn converts_single_quotes()
    {   assert_eq!(
          single_to_double_quotes(r#"{'a': 'say "hi"', 'b': 'it\'s'}"#),
          r#"{"a": "say \"hi\"", "b": "it's"}"#
        );
    }

    #[test]
    fn keeps_apostrophes_in_double_quotes()
    {   let text = r#"{"a": "don't stop"}"#;
        assert_eq!(single_to_double_quotes(text), text);
    }

    #[test]
    fn strips_trailing_commas()
    {   assert_eq!(
          remove_trailing_commas(r#"{"a": [1, 2, ], "b": 3,}"#),
          r#"{"a": [1, 2 ], "b": 3}"#
        );
        assert_eq!(remove_trailing_commas(r#"{"a": 1,  "#), r#"{"a": 1  "#);
        let text = r#"{"a": "x,}"}"#;
        assert_eq!(remove_trailing_commas(text), text);
    }

    #[test]
    fn closes_nested_objects()
    {   assert_eq!(close_open_objects(r#"{"a": {"b": 1"#), r#"{"a": {"b": 1}}"#);
        let text = r#"{"a": "}"}"#;
        assert_eq!(close_open_objects(text), text);
    }

    #[test]
    fn pipeline_reports_steps()
    {   let (out, report) = repair("{roastText: 'Nice try', intensity: 3, burnLevel: 55,}");
        assert_eq!(out, r#"{"roastText": "Nice try", "intensity": 3, "burnLevel": 55}"#);
        assert!(!report.truncated);
        assert_eq!(report.applied, vec![
          RepairStep::QuoteKeys,
          RepairStep::SingleQuotes,
          RepairStep::TrailingCommas,
        ]);
    }

    #[test]
    fn pipeline_is_noop_on_json()
    {   let text = r#"{"a": [1, 2], "b": "c"}"#;
        let (out, report) = repair(text);
        assert_eq!(out, text);
        assert_eq!(report, RepairReport::default());
    }
}
