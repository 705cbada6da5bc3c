//! Analysis requests and responses

use std::path::Path;

use base64::Engine;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::shape::{NoteMode, ShapeKind, ShapeRecord};

/// The Pals that talk to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pal
{   Cringe
  , Roast
  , Homework
  , Notes
}

impl Pal
{   /// Response shape this Pal asks the model for
    pub fn shape(&self) -> ShapeKind
    {   match self
        {   Pal::Cringe => ShapeKind::Cringe
          , Pal::Roast => ShapeKind::Roast
          , Pal::Homework => ShapeKind::Homework
          , Pal::Notes => ShapeKind::Note
        }
    }

    /// Sampling temperature; roasts run hotter
    pub fn temperature(&self) -> Option<f32>
    {   match self
        {   Pal::Roast => Some(0.8)
          , _ => None
        }
    }
}

/// Photo sent inline with the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput
{   pub mime_type: String
  , pub data: Vec<u8>
}

impl ImageInput
{   pub fn new(mime_type: impl Into<String>, data: Vec<u8>) -> Self
    {   ImageInput
        {   mime_type: mime_type.into()
          , data
        }
    }

    /// Read an image file, guessing the MIME type from its extension
    pub async fn from_path(
      path: impl AsRef<Path>
    ) -> Result<Self, Error>
    {   let path = path.as_ref();
        let data = tokio::fs::read(path).await
          .map_err(|e| {
            Error::InvalidInput(
              format!("Failed to read image {}: {}", path.display(), e)
            )
          })?;
        let mime_type = mime_guess::from_path(path)
          .first()
          .filter(|m| m.type_() == mime_guess::mime::IMAGE)
          .map(|m| m.essence_str().to_string())
          .unwrap_or_else(|| "image/jpeg".to_string());
        debug!(
          "Loaded image {} ({}, {} bytes)",
          path.display(), mime_type, data.len()
        );
        Ok(ImageInput { mime_type, data })
    }

    pub fn to_base64(&self) -> String
    {   base64::engine::general_purpose::STANDARD.encode(&self.data)
    }
}

/// Per-Pal knobs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalOptions
{   None
  , Roast
    {   /// 1 (Playful) to 5 (Career Ending)
        intensity: u8
    }
  , Homework
    {   /// Target reading level, 100-160
        iq_level: u16
    }
  , Notes
    {   mode: NoteMode
    }
}

/// One user-initiated analysis
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRequest
{   pub pal: Pal
  , pub text: String
  , pub image: Option<ImageInput>
  , pub options: PalOptions
}

impl AnalysisRequest
{   pub fn cringe(text: impl Into<String>, image: Option<ImageInput>)
      -> Self
    {   AnalysisRequest
        {   pal: Pal::Cringe
          , text: text.into()
          , image
          , options: PalOptions::None
        }
    }

    pub fn roast(
      text: impl Into<String>
    , intensity: u8
    , image: Option<ImageInput>
    ) -> Self
    {   AnalysisRequest
        {   pal: Pal::Roast
          , text: text.into()
          , image
          , options: PalOptions::Roast { intensity }
        }
    }

    pub fn homework(
      text: impl Into<String>
    , iq_level: u16
    , image: Option<ImageInput>
    ) -> Self
    {   AnalysisRequest
        {   pal: Pal::Homework
          , text: text.into()
          , image
          , options: PalOptions::Homework { iq_level }
        }
    }

    pub fn notes(
      text: impl Into<String>
    , mode: NoteMode
    , image: Option<ImageInput>
    ) -> Self
    {   AnalysisRequest
        {   pal: Pal::Notes
          , text: text.into()
          , image
          , options: PalOptions::Notes { mode }
        }
    }

    /// Reject requests that would waste a remote call
    pub fn validate(&self) -> Result<(), Error>
    {   if self.text.trim().is_empty() && self.image.is_none()
        {   return Err(Error::InvalidInput(
              "Enter some text or select an image".to_string()
            ));
        }
        if let Some(image) = &self.image
        {   if image.data.is_empty()
            {   return Err(Error::InvalidInput(
                  "Image is empty".to_string()
                ));
            }
        }
        match (self.pal, self.options)
        {   (Pal::Cringe, PalOptions::None) => Ok(())
          , (Pal::Roast, PalOptions::Roast { intensity }) => {
              if (1..=5).contains(&intensity)
              {   Ok(())
              } else
              {   Err(Error::InvalidInput(
                    format!("Roast intensity {} is not in 1-5", intensity)
                  ))
              }
            }
          , (Pal::Homework, PalOptions::Homework { iq_level }) => {
              if (100..=160).contains(&iq_level)
              {   Ok(())
              } else
              {   Err(Error::InvalidInput(
                    format!("IQ level {} is not in 100-160", iq_level)
                  ))
              }
            }
          , (Pal::Notes, PalOptions::Notes { .. }) => Ok(())
          , (pal, options) => {
              Err(Error::InvalidInput(
                format!("{:?} does not take {:?}", pal, options)
              ))
            }
        }
    }
}

/// Validated answer to an [`AnalysisRequest`]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResponse
{   pub record: ShapeRecord
  , /// Model text the record came from
    pub raw_text: String
  , /// Model that produced it
    pub model: String
  , /// Some string was cut off by the output limit and closed by repair
    pub truncated: bool
}
