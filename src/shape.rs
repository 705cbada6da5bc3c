//! Response shapes returned by the model, one per Pal
//!
//! Ranges in the field docs describe what the prompts ask for; only the
//! JSON types are checked on the way in.

use serde::{Deserialize, Serialize};

/// Which response shape a call expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind
{   Cringe
  , Roast
  , Homework
  , Note
}

impl ShapeKind
{   /// Wire names of the fields a record of this shape must carry
    pub fn required_fields(&self) -> &'static [&'static str]
    {   match self
        {   ShapeKind::Cringe => &["hotLevel", "cringeLevel", "analysis"]
          , ShapeKind::Roast => &["roastText", "intensity", "burnLevel"]
          , ShapeKind::Homework => &["solution", "adaptedLevel"]
          , ShapeKind::Note => &["processedType"]
        }
    }
}

/// Hot vs cringe verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CringeAnalysis
{   /// 0-100
    pub hot_level: f64
  , /// 0-100
    pub cringe_level: f64
  , pub analysis: String
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tips: Option<Vec<String>>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoastAnalysis
{   pub roast_text: String
  , /// 1-5, echoes the requested intensity
    pub intensity: f64
  , /// 0-100, how savage the roast turned out
    pub burn_level: f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkAnalysis
{   pub solution: String
  , /// IQ-style level the explanation was written for, 100-160
    pub adapted_level: f64
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_by_step: Option<Vec<String>>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub writing_style: Option<String>
}

/// What Note Pal did with the notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteMode
{   Textify
  , Summarize
  , Depth
}

impl NoteMode
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   NoteMode::Textify => "textify"
          , NoteMode::Summarize => "summarize"
          , NoteMode::Depth => "depth"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteAnalysis
{   pub processed_type: NoteMode
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub digital_text: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deeper_insights: Option<String>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>
  , #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_items: Option<Vec<String>>
}

/// A validated record of exactly one shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "lowercase")]
pub enum ShapeRecord
{   Cringe(CringeAnalysis)
  , Roast(RoastAnalysis)
  , Homework(HomeworkAnalysis)
  , Note(NoteAnalysis)
}

impl ShapeRecord
{   pub fn kind(&self) -> ShapeKind
    {   match self
        {   ShapeRecord::Cringe(_) => ShapeKind::Cringe
          , ShapeRecord::Roast(_) => ShapeKind::Roast
          , ShapeRecord::Homework(_) => ShapeKind::Homework
          , ShapeRecord::Note(_) => ShapeKind::Note
        }
    }

    /// Deserialize `json` strictly as `kind`.
    /// Unknown fields are ignored; missing or mistyped required fields fail.
    pub fn from_json_str(
      json: &str
    , kind: ShapeKind
    ) -> Result<ShapeRecord, serde_json::Error>
    {   Ok(match kind
        {   ShapeKind::Cringe => {
              ShapeRecord::Cringe(serde_json::from_str(json)?)
            }
          , ShapeKind::Roast => {
              ShapeRecord::Roast(serde_json::from_str(json)?)
            }
          , ShapeKind::Homework => {
              ShapeRecord::Homework(serde_json::from_str(json)?)
            }
          , ShapeKind::Note => {
              ShapeRecord::Note(serde_json::from_str(json)?)
            }
        })
    }

    /// The record's own fields as a JSON object, without the shape tag
    pub fn to_metadata(&self) -> serde_json::Value
    {   let value = match self
        {   ShapeRecord::Cringe(r) => serde_json::to_value(r)
          , ShapeRecord::Roast(r) => serde_json::to_value(r)
          , ShapeRecord::Homework(r) => serde_json::to_value(r)
          , ShapeRecord::Note(r) => serde_json::to_value(r)
        };
        // plain structs of strings and numbers always serialize
        value.unwrap_or(serde_json::Value::Null)
    }

    /// Main text a user would read or share
    pub fn headline(&self) -> String
    {   match self
        {   ShapeRecord::Cringe(r) => r.analysis.clone()
          , ShapeRecord::Roast(r) => r.roast_text.clone()
          , ShapeRecord::Homework(r) => r.solution.clone()
          , ShapeRecord::Note(r) => r.summary.clone()
              .or_else(|| r.digital_text.clone())
              .or_else(|| r.deeper_insights.clone())
              .unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn unknown_fields_are_ignored()
    {   let json = r#"{"roastText":"ok","intensity":2,"burnLevel":40,"mood":"spicy"}"#;
        let record = ShapeRecord::from_json_str(json, ShapeKind::Roast)
          .unwrap();
        assert_eq!(record, ShapeRecord::Roast(RoastAnalysis
        {   roast_text: "ok".to_string()
          , intensity: 2.0
          , burn_level: 40.0
        }));
    }

    #[test]
    fn string_is_not_a_number()
    {   let json = r#"{"hotLevel":"80","cringeLevel":20,"analysis":"x"}"#;
        assert!(ShapeRecord::from_json_str(json, ShapeKind::Cringe).is_err());
    }

    #[test]
    fn null_optional_means_absent()
    {   let json = r#"{"hotLevel":1,"cringeLevel":2,"analysis":"x","tips":null}"#;
        match ShapeRecord::from_json_str(json, ShapeKind::Cringe).unwrap()
        {   ShapeRecord::Cringe(r) => assert_eq!(r.tips, None)
          , other => panic!("wrong shape: {:?}", other)
        }
    }

    #[test]
    fn null_required_fails()
    {   let json = r#"{"solution":null,"adaptedLevel":120}"#;
        assert!(ShapeRecord::from_json_str(json, ShapeKind::Homework).is_err());
    }

    #[test]
    fn note_mode_must_be_known()
    {   let ok = r#"{"processedType":"summarize","summary":"short"}"#;
        let bad = r#"{"processedType":"shorten"}"#;
        assert!(ShapeRecord::from_json_str(ok, ShapeKind::Note).is_ok());
        assert!(ShapeRecord::from_json_str(bad, ShapeKind::Note).is_err());
    }

    #[test]
    fn duplicate_key_is_rejected()
    {   let json = r#"{"hotLevel":1,"hotLevel":3,"cringeLevel":2,"analysis":"x"}"#;
        let err = ShapeRecord::from_json_str(json, ShapeKind::Cringe)
          .unwrap_err();
        assert!(err.is_data());
        assert!(err.to_string().contains("duplicate field"));
    }

    #[test]
    fn metadata_has_wire_names()
    {   let record = ShapeRecord::Cringe(CringeAnalysis
        {   hot_level: 80.0
          , cringe_level: 20.0
          , analysis: "Fire.".to_string()
          , tips: None
        });
        let meta = record.to_metadata();
        assert_eq!(meta["hotLevel"], 80.0);
        assert!(meta.get("tips").is_none());
        assert!(meta.get("shape").is_none());
    }
}
