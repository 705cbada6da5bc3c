use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use log::{debug, trace, error, info};
use std::time::Duration;

use crate::config::GeminiConfig;
use crate::error::Error;
use crate::request::ImageInput;

/// Header carrying the key; never sent in the query string
pub const API_KEY_HEADER: &str = "x-goog-api-key";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineData
{   pub mime_type: String
  , pub data: String
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part
{   Text
    {   text: String
    }
  , InlineData
    {   inline_data: InlineData
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Content
{   pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig
{   pub temperature: f32
  , pub top_k: u32
  , pub top_p: f32
  , pub max_output_tokens: u32
  , pub candidate_count: u32
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
  , pub generation_config: GenerationConfig
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   pub content: Option<CandidateContent>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent
{   #[serde(default)]
    pub parts: Vec<CandidatePart>
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidatePart
{   pub text: Option<String>
}

/// Prompt plus optional photo, as sent to the model
#[derive(Debug, Clone)]
pub struct GenerateArgs
{   pub prompt: String
  , pub image: Option<ImageInput>
  , pub temperature: Option<f32>
}

pub type GenerateReply = Result<String, Error>;

// ===== Gemini Client Actor =====

/// Commands for GeminiClient actor
pub enum GeminiCommand
{   Generate
    {   args: GenerateArgs
      , reply: mpsc::UnboundedSender<GenerateReply>
    }
  , SetApiKey
    {   key: String
      , reply: mpsc::UnboundedSender<Result<(), Error>>
    }
  , Shutdown
}

/// Gemini client state
pub struct GeminiClientState
{   config: GeminiConfig
  , http_client: reqwest::Client
}

impl GeminiClientState
{   pub fn new(config: GeminiConfig) -> Self
    {   debug!("Creating GeminiClientState for {}", config.model);
        let http_client = reqwest::Client::builder()
          .timeout(Duration::from_secs(config.timeout_secs))
          .build()
          .unwrap_or_else(|e| {
            error!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
          });
        GeminiClientState
        {   config
          , http_client
        }
    }

    fn api_key(&self) -> Result<&str, Error>
    {   self.config.api_key.as_deref()
          .filter(|k| !k.is_empty())
          .ok_or_else(|| {
            error!("No Gemini API key configured");
            Error::MissingApiKey(
              format!("Gemini:{}", self.config.model)
            )
          })
    }

    fn build_request(&self, args: &GenerateArgs) -> GenerateContentRequest
    {   let mut parts = vec![
          Part::Text
          {   text: args.prompt.clone()
          }
        ];
        if let Some(image) = &args.image
        {   parts.push(Part::InlineData
            {   inline_data: InlineData
                {   mime_type: image.mime_type.clone()
                  , data: image.to_base64()
                }
            });
        }

        GenerateContentRequest
        {   contents: vec![Content { parts }]
          , generation_config: GenerationConfig
            {   temperature: args.temperature
                  .unwrap_or(self.config.temperature)
              , top_k: 1
              , top_p: 1.0
              , max_output_tokens: self.config.max_output_tokens
              , candidate_count: 1
            }
        }
    }

    async fn handle_generate(
      &self
    , args: GenerateArgs
    ) -> Result<String, Error>
    {   let api_key = self.api_key()?;
        debug!(
          "Handling generate for {} (image: {})",
          self.config.model, args.image.is_some()
        );

        let request = self.build_request(&args);
        trace!("Gemini prompt: {}", args.prompt);

        let response = self.http_client
          .post(format!(
            "{}/models/{}:generateContent",
            self.config.api_base, self.config.model
          ))
          .header(API_KEY_HEADER, api_key)
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            let e = e.without_url();
            error!("HTTP error: {}", e);
            if e.is_timeout()
            {   Error::Timeout
            } else
            {   Error::HttpError(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {   error!("Gemini rate limit hit");
            return Err(Error::RateLimitExceeded);
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Gemini API error {}: {}", status, error_text);
            return Err(Error::ApiError
            {   status: status.as_u16()
              , body: error_text
            });
        }

        let body: GenerateContentResponse
          = response.json().await.map_err(|e| {
            let e = e.without_url();
            error!("Parse error: {}", e);
            Error::ParseError(e.to_string())
          })?;

        candidate_text(body)
    }

    fn handle_set_api_key(&mut self, key: String) -> Result<(), Error>
    {   if key.trim().is_empty()
        {   return Err(Error::InvalidConfiguration(
              "Empty Gemini API key".to_string()
            ));
        }
        debug!("Setting Gemini API key");
        self.config.api_key = Some(key);
        Ok(())
    }
}

/// Concatenated text parts of the first candidate
pub fn candidate_text(
  body: GenerateContentResponse
) -> Result<String, Error>
{   let candidate = body.candidates.into_iter().next()
      .ok_or_else(|| {
        error!("No candidates in response");
        Error::NoCandidates
      })?;

    if let Some(reason) = &candidate.finish_reason
    {   debug!("Finish reason: {}", reason);
    }

    let text: String = candidate.content
      .map(|c| c.parts)
      .unwrap_or_default()
      .into_iter()
      .filter_map(|p| p.text)
      .collect();

    if text.is_empty()
    {   error!("No text in first candidate");
        return Err(Error::NoCandidates);
    }
    Ok(text)
}

/// Public Gemini client interface
pub struct GeminiClient
{   tx: mpsc::UnboundedSender<GeminiCommand>
  , model: String
  , _task: tokio::task::JoinHandle<()>
}

impl GeminiClient
{   /// Create and spawn a new Gemini client
    pub fn new(config: GeminiConfig) -> Self
    {   debug!("Creating GeminiClient");
        let (cmd_tx, cmd_rx)
          = mpsc::unbounded_channel();
        let model = config.model.clone();

        let _task = tokio::spawn(async move {
          run_gemini_loop(cmd_rx, config).await;
        });

        GeminiClient
        {   tx: cmd_tx
          , model
          , _task
        }
    }

    pub fn model(&self) -> &str
    {   &self.model
    }

    /// Queue a generate request - returns immediately
    pub fn generate(
      &self
    , args: GenerateArgs
    , reply: mpsc::UnboundedSender<GenerateReply>
    ) -> Result<(), Error>
    {   debug!("generate queued for model: {}", self.model);
        self.tx.send(GeminiCommand::Generate {
          args,
          reply,
        }).map_err(|_| {
          error!("Gemini client disconnected");
          Error::Other(
            "Gemini client disconnected".to_string()
          )
        })
    }

    /// Queue a generate request and wait for its reply
    pub async fn generate_text(
      &self
    , args: GenerateArgs
    ) -> Result<String, Error>
    {   let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();
        self.generate(args, reply_tx)?;
        reply_rx.recv().await
          .unwrap_or_else(|| {
            Err(Error::Other(
              "Gemini client dropped the request".to_string()
            ))
          })
    }

    /// Queue set_api_key request
    pub fn set_api_key(
      &self
    , key: String
    , reply: mpsc::UnboundedSender<Result<(), Error>>
    ) -> Result<(), Error>
    {   debug!("set_api_key queued");
        self.tx.send(GeminiCommand::SetApiKey {
          key,
          reply,
        }).map_err(|_| {
          error!("Gemini client disconnected");
          Error::Other(
            "Gemini client disconnected".to_string()
          )
        })
    }

    /// Shutdown the client
    pub fn shutdown(&self) -> Result<(), Error>
    {   debug!("Shutting down GeminiClient");
        self.tx.send(GeminiCommand::Shutdown)
          .map_err(|_| {
            Error::Other(
              "Client already shutdown".to_string()
            )
          })
    }
}

/// Main gemini event loop
async fn run_gemini_loop(
  mut cmd_rx: mpsc::UnboundedReceiver<GeminiCommand>
, config: GeminiConfig
)
{   debug!("Starting Gemini client loop");
    let mut state = GeminiClientState::new(config);

    loop
    { match cmd_rx.recv().await
      {   Some(GeminiCommand::Generate { args, reply }) => {
            debug!("Processing Generate");
            let result = state.handle_generate(args).await;
            let _ = reply.send(result);
          }
        , Some(GeminiCommand::SetApiKey { key, reply }) => {
            debug!("Processing SetApiKey");
            let result = state.handle_set_api_key(key);
            let _ = reply.send(result);
          }
        , Some(GeminiCommand::Shutdown) => {
            info!("Gemini client shutting down");
            break;
          }
        , None => {
            debug!("Command channel closed");
            break;
          }
      }
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    fn state() -> GeminiClientState
    {   GeminiClientState::new(GeminiConfig::default())
    }

    #[test]
    fn request_body_matches_api()
    {   let args = GenerateArgs
        {   prompt: "hi".to_string()
          , image: Some(ImageInput::new("image/png", b"hi".to_vec()))
          , temperature: Some(0.8)
        };
        let body = serde_json::to_value(state().build_request(&args))
          .unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(
          body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
          "image/png"
        );
        assert_eq!(body["contents"][0]["parts"][1]["inline_data"]["data"], "aGk=");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["generationConfig"]["candidateCount"], 1);
        assert_eq!(body["generationConfig"]["topK"], 1);
    }

    #[test]
    fn joins_candidate_parts()
    {   let body: GenerateContentResponse = serde_json::from_str(
          r#"{"candidates":[{"content":{"parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#
        ).unwrap();
        assert_eq!(candidate_text(body).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn empty_candidates_fail()
    {   let body: GenerateContentResponse
          = serde_json::from_str(r#"{"promptFeedback":{}}"#).unwrap();
        assert_eq!(candidate_text(body), Err(Error::NoCandidates));

        let body: GenerateContentResponse = serde_json::from_str(
          r#"{"candidates":[{"content":{"parts":[]}}]}"#
        ).unwrap();
        assert_eq!(candidate_text(body), Err(Error::NoCandidates));
    }

    #[test]
    fn missing_key_is_reported()
    {   assert!(matches!(state().api_key(), Err(Error::MissingApiKey(_))));
    }
}
