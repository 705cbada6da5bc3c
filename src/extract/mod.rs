//! Recover a typed shape record from free-form model text
//!
//! The model is asked for bare JSON but often wraps it in a markdown
//! fence, adds prose around it, gets cut off by the output limit or falls
//! back to JavaScript-style object syntax. `extract` tries, in order:
//!
//! 1. strip a surrounding fence
//! 2. take the span from the first `{` to the last `}`
//! 3. parse that span directly
//! 4. run the [`repair`] pipeline over the span and parse again
//!
//! and otherwise returns a typed failure carrying the raw text.
//! Everything here is pure: no I/O, no shared state.

pub mod repair;

use log::{debug, trace};

use crate::error::ExtractionError;
use crate::shape::{ShapeKind, ShapeRecord};

pub use repair::{RepairReport, RepairStep};

/// A record plus what it took to get it
#[derive(Debug, Clone, PartialEq)]
pub struct Extracted
{   pub record: ShapeRecord
  , /// Set when the direct parse failed and the repair pipeline ran
    pub repair: Option<RepairReport>
}

impl Extracted
{   /// Whether some string in the record may have been cut short
    pub fn possibly_truncated(&self) -> bool
    {   self.repair.as_ref().map_or(false, |r| r.truncated)
    }
}

/// Extract a record of `shape` from `raw_text`
pub fn extract(
  raw_text: &str
, shape: ShapeKind
) -> Result<ShapeRecord, ExtractionError>
{   extract_detailed(raw_text, shape).map(|e| e.record)
}

/// Like [`extract`], also reporting whether repair was needed
pub fn extract_detailed(
  raw_text: &str
, shape: ShapeKind
) -> Result<Extracted, ExtractionError>
{   trace!("Extracting {:?} from: {}", shape, raw_text);

    let cleaned = strip_fences(raw_text);
    let (span, closed) = match locate_object(cleaned)
    {   Some(found) => found
      , None => {
          debug!("No JSON object in {} bytes of text", raw_text.len());
          return Err(ExtractionError::NoJsonFound);
        }
    };

    if closed
    {   match ShapeRecord::from_json_str(span, shape)
        {   Ok(record) => {
              debug!("Direct parse succeeded for {:?}", shape);
              return Ok(Extracted { record, repair: None });
            }
          , Err(e) if e.is_data() => {
              // valid JSON, wrong shape: repair cannot add fields
              debug!("Shape validation failed for {:?}: {}", shape, e);
              return Err(malformed(raw_text, shape, &e));
            }
          , Err(e) => {
              debug!("Direct parse failed, trying repair: {}", e);
            }
        }
    } else
    {   debug!("Object never closed, trying repair");
    }

    let (fixed, report) = repair::repair(span);
    debug!(
      "Repair applied {:?} (truncated: {})",
      report.applied, report.truncated
    );

    ShapeRecord::from_json_str(&fixed, shape)
      .map(|record| Extracted { record, repair: Some(report) })
      .map_err(|e| {
        debug!("Repaired text still unusable for {:?}: {}", shape, e);
        malformed(raw_text, shape, &e)
      })
}

fn malformed(
  raw_text: &str
, shape: ShapeKind
, err: &serde_json::Error
) -> ExtractionError
{   ExtractionError::MalformedResponse
    {   raw: raw_text.to_string()
      , reason: format!(
          "{:?} response (needs {}): {}",
          shape, shape.required_fields().join(", "), err
        )
    }
}

/// Trim and drop a leading ```` ```lang ```` and a trailing ```` ``` ````
pub fn strip_fences(text: &str) -> &str
{   let mut s = text.trim();
    if let Some(rest) = s.strip_prefix("```")
    {   let tag_len = rest
          .find(|c: char| !c.is_ascii_alphanumeric())
          .unwrap_or(rest.len());
        s = &rest[tag_len..];
    }
    if let Some(rest) = s.strip_suffix("```")
    {   s = rest;
    }
    s.trim()
}

/// First `{` through last `}`. The flag is false when no `}` exists at
/// all, in which case the span runs to the end of the text.
fn locate_object(text: &str) -> Option<(&str, bool)>
{   let start = text.find('{')?;
    match text.rfind('}')
    {   Some(end) if end > start => Some((&text[start..=end], true))
      , Some(_) => None
      , None => Some((&text[start..], false))
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn strips_tagged_fence()
    {   assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("  ```JSON {\"a\":1}```  "), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence()
    {   assert_eq!(strip_fences("```\n{}\n```"), "{}");
    }

    #[test]
    fn leaves_unfenced_text()
    {   assert_eq!(strip_fences(" plain {} "), "plain {}");
        assert_eq!(strip_fences("```"), "");
    }

    #[test]
    fn locates_outer_span()
    {   assert_eq!(locate_object("x {\"a\":{}} y"), Some(("{\"a\":{}}", true)));
        assert_eq!(locate_object("x {\"a\": 1"), Some(("{\"a\": 1", false)));
        assert_eq!(locate_object("} then {"), None);
        assert_eq!(locate_object("no braces"), None);
    }

    #[test]
    fn wrong_shape_skips_repair()
    {   let raw = r#"{"roastText": "x", "intensity": 1, "burnLevel": 2}"#;
        match extract(raw, ShapeKind::Cringe)
        {   Err(ExtractionError::MalformedResponse { raw: kept, reason }) => {
              assert_eq!(kept, raw);
              assert!(reason.contains("needs hotLevel, cringeLevel, analysis"));
            }
          , other => panic!("expected malformed, got {:?}", other)
        }
    }

    #[test]
    fn truncated_value_is_flagged()
    {   let raw = r#"{"hotLevel": 80, "cringeLevel": 20, "analysis": "Fire and"#;
        let out = extract_detailed(raw, ShapeKind::Cringe).unwrap();
        assert!(out.possibly_truncated());
        match out.record
        {   ShapeRecord::Cringe(r) => assert_eq!(r.analysis, "Fire and")
          , other => panic!("wrong shape: {:?}", other)
        }
    }
}
