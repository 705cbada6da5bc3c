//! Saved creations: validated records plus where they came from

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::Error;
use crate::request::AnalysisResponse;
use crate::shape::ShapeKind;

/// A saved analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creation
{   pub id: String
  , pub user_id: String
  , #[serde(rename = "type")]
    pub kind: ShapeKind
  , /// Photo the analysis was made from, if any
    #[serde(default)]
    pub image_uri: Option<String>
  , /// Main model text (roast, verdict, solution, summary)
    pub ai_response: String
  , /// The record's fields, wire names
    pub metadata: serde_json::Value
  , pub created_at: DateTime<Utc>
  , #[serde(default)]
    pub share_count: u32
  , #[serde(default)]
    pub like_count: u32
}

impl Creation
{   /// New creation with a fresh id and zeroed counters
    pub fn from_response(
      user_id: impl Into<String>
    , image_uri: Option<String>
    , response: &AnalysisResponse
    ) -> Self
    {   Creation
        {   id: uuid::Uuid::new_v4().to_string()
          , user_id: user_id.into()
          , kind: response.record.kind()
          , image_uri
          , ai_response: response.record.headline()
          , metadata: response.record.to_metadata()
          , created_at: Utc::now()
          , share_count: 0
          , like_count: 0
        }
    }

    /// Message used when sharing this creation
    pub fn share_text(&self) -> String
    {   let label = match self.kind
        {   ShapeKind::Roast => "roast"
          , ShapeKind::Cringe => "cringe analysis"
          , ShapeKind::Homework => "homework solution"
          , ShapeKind::Note => "notes"
        };
        let base = format!("Check out my {} from Pal Universe! 🔥", label);
        let meta = &self.metadata;

        match self.kind
        {   ShapeKind::Roast if meta.get("intensity").is_some() => {
              format!(
                "{}\n\n🔥 Roast Level: {}/5\n💀 Burn Level: {}%\n\nGet roasted at Pal Universe!",
                base,
                level(meta.get("intensity")),
                level(meta.get("burnLevel")),
              )
            }
          , ShapeKind::Cringe => {
              format!(
                "{}\n\n🔥 Hot Level: {}%\n😬 Cringe Level: {}%\n\nGet your cringe analyzed at Pal Universe!",
                base,
                level(meta.get("hotLevel")),
                level(meta.get("cringeLevel")),
              )
            }
          , _ => base
        }
    }
}

/// Whole numbers print without a fraction; missing values print as 0
fn level(value: Option<&serde_json::Value>) -> String
{   let n = value.and_then(|v| v.as_f64()).unwrap_or(0.0);
    if n.fract() == 0.0
    {   format!("{}", n as i64)
    } else
    {   format!("{}", n)
    }
}

/// Somewhere creations can be kept
#[async_trait]
pub trait CreationStore: Send + Sync
{   /// Store `creation`, newest first; returns its id
    async fn save(&self, creation: Creation) -> Result<String, Error>;

    /// All creations, newest first
    async fn list(&self) -> Result<Vec<Creation>, Error>;

    async fn get(&self, id: &str) -> Result<Creation, Error>;

    /// Returns false when nothing had that id
    async fn delete(&self, id: &str) -> Result<bool, Error>;

    /// Bump the share counter, returning the new count
    async fn record_share(&self, id: &str) -> Result<u32, Error>;

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<Creation>, Error>
    {   Ok(self.list().await?
          .into_iter()
          .filter(|c| c.user_id == user_id)
          .collect())
    }
}

/// Creations kept as one JSON array in a local file
pub struct LocalCreationStore
{   path: PathBuf
  , lock: Mutex<()>
}

impl LocalCreationStore
{   pub fn new(path: impl Into<PathBuf>) -> Self
    {   LocalCreationStore
        {   path: path.into()
          , lock: Mutex::new(())
        }
    }

    pub fn from_config(config: &crate::config::StoreConfig) -> Self
    {   LocalCreationStore::new(config.path.clone())
    }

    pub fn path(&self) -> &Path
    {   &self.path
    }

    async fn load(&self) -> Result<Vec<Creation>, Error>
    {   let text = match tokio::fs::read_to_string(&self.path).await
        {   Ok(text) => text
          , Err(e) if e.kind() == ErrorKind::NotFound => {
              debug!("No creations file at {}", self.path.display());
              return Ok(Vec::new());
            }
          , Err(e) => {
              error!("Failed to read {}: {}", self.path.display(), e);
              return Err(Error::Storage(e.to_string()));
            }
        };
        if text.trim().is_empty()
        {   return Ok(Vec::new());
        }
        serde_json::from_str(&text).map_err(|e| {
          error!("Corrupt creations file {}: {}", self.path.display(), e);
          Error::Storage(format!("{}: {}", self.path.display(), e))
        })
    }

    async fn write(&self, creations: &[Creation]) -> Result<(), Error>
    {   let storage = |e: std::io::Error| {
          error!("Failed to write {}: {}", self.path.display(), e);
          Error::Storage(e.to_string())
        };
        let text = serde_json::to_string_pretty(creations)
          .map_err(|e| Error::Storage(e.to_string()))?;

        if let Some(parent) = self.path.parent()
        {   if !parent.as_os_str().is_empty()
            {   tokio::fs::create_dir_all(parent).await.map_err(storage)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, text).await.map_err(storage)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(storage)?;
        debug!("Wrote {} creations", creations.len());
        Ok(())
    }
}

#[async_trait]
impl CreationStore for LocalCreationStore
{   async fn save(&self, creation: Creation) -> Result<String, Error>
    {   let _guard = self.lock.lock().await;
        let mut creations = self.load().await?;
        let id = creation.id.clone();
        creations.retain(|c| c.id != id);
        creations.insert(0, creation);
        self.write(&creations).await?;
        debug!("Saved creation {}", id);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<Creation>, Error>
    {   let _guard = self.lock.lock().await;
        let mut creations = self.load().await?;
        creations.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(creations)
    }

    async fn get(&self, id: &str) -> Result<Creation, Error>
    {   let _guard = self.lock.lock().await;
        self.load().await?
          .into_iter()
          .find(|c| c.id == id)
          .ok_or_else(|| Error::CreationNotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<bool, Error>
    {   let _guard = self.lock.lock().await;
        let mut creations = self.load().await?;
        let before = creations.len();
        creations.retain(|c| c.id != id);
        if creations.len() == before
        {   debug!("No creation {} to delete", id);
            return Ok(false);
        }
        self.write(&creations).await?;
        debug!("Deleted creation {}", id);
        Ok(true)
    }

    async fn record_share(&self, id: &str) -> Result<u32, Error>
    {   let _guard = self.lock.lock().await;
        let mut creations = self.load().await?;
        let creation = creations.iter_mut()
          .find(|c| c.id == id)
          .ok_or_else(|| Error::CreationNotFound(id.to_string()))?;
        creation.share_count += 1;
        let count = creation.share_count;
        self.write(&creations).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::shape::{CringeAnalysis, RoastAnalysis, ShapeRecord};

    fn response(record: ShapeRecord) -> AnalysisResponse
    {   AnalysisResponse
        {   record
          , raw_text: String::new()
          , model: "test".to_string()
          , truncated: false
        }
    }

    #[test]
    fn roast_share_text()
    {   let creation = Creation::from_response(
          "u1",
          None,
          &response(ShapeRecord::Roast(RoastAnalysis
          {   roast_text: "Nice try".to_string()
            , intensity: 3.0
            , burn_level: 55.5
          }))
        );
        assert_eq!(creation.ai_response, "Nice try");
        assert_eq!(
          creation.share_text(),
          "Check out my roast from Pal Universe! 🔥\n\n🔥 Roast Level: 3/5\n💀 Burn Level: 55.5%\n\nGet roasted at Pal Universe!"
        );
    }

    #[test]
    fn cringe_share_text()
    {   let creation = Creation::from_response(
          "u1",
          Some("file:///a.jpg".to_string()),
          &response(ShapeRecord::Cringe(CringeAnalysis
          {   hot_level: 80.0
            , cringe_level: 20.0
            , analysis: "Fire.".to_string()
            , tips: None
          }))
        );
        assert!(creation.share_text().contains("🔥 Hot Level: 80%\n😬 Cringe Level: 20%"));
        assert_eq!(creation.kind, ShapeKind::Cringe);
        assert_eq!(creation.share_count, 0);
    }

    #[test]
    fn wire_format_uses_type_key()
    {   let creation = Creation::from_response(
          "u1",
          None,
          &response(ShapeRecord::Roast(RoastAnalysis
          {   roast_text: "x".to_string()
            , intensity: 1.0
            , burn_level: 1.0
          }))
        );
        let value = serde_json::to_value(&creation).unwrap();
        assert_eq!(value["type"], "roast");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["metadata"]["roastText"], "x");
    }
}
