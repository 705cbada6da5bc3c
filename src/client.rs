use std::sync::Arc;

use tokio::sync::mpsc;
use log::{debug, error, info, warn};

use crate::config::PalConfig;
use crate::error::Error;
use crate::extract::extract_detailed;
use crate::providers::gemini::{GeminiClient, GenerateArgs};
use crate::request::{AnalysisRequest, AnalysisResponse};
use crate::retry::RetryPolicy;
use crate::PalFoot;

/// Backend state: the model client plus how to retry it
pub struct PalBackendState
{   pub gemini: GeminiClient
  , pub retry: RetryPolicy
}

impl PalBackendState
{   /// Create a new backend state from configuration
    pub fn new(config: PalConfig) -> Self
    {   debug!("Initializing PalBackendState");
        PalBackendState
        {   retry: RetryPolicy::from(&config.retry)
          , gemini: GeminiClient::new(config.gemini)
        }
    }

    /// Prompt the model, retrying transient failures, then extract
    /// the Pal's shape from its answer
    pub async fn handle_analyze(
      &self
    , request: AnalysisRequest
    ) -> Result<AnalysisResponse, Error>
    {   request.validate()?;
        let shape = request.pal.shape();
        let args = GenerateArgs
        {   prompt: crate::prompts::build_prompt(&request)
          , image: request.image.clone()
          , temperature: request.pal.temperature()
        };

        let mut attempt = 0;
        let raw_text = loop
        {   match self.gemini.generate_text(args.clone()).await
            {   Ok(text) => break text
              , Err(e) if self.retry.should_retry(attempt, &e) => {
                  let wait = self.retry.backoff_for_attempt(attempt);
                  warn!(
                    "{:?} request failed ({}), retrying in {:?}",
                    request.pal, e, wait
                  );
                  tokio::time::sleep(wait).await;
                  attempt += 1;
                }
              , Err(e) => {
                  error!("{:?} request failed: {}", request.pal, e);
                  return Err(e);
                }
            }
        };

        let extracted = extract_detailed(&raw_text, shape)
          .map_err(|e| {
            error!("Could not extract {:?}: {}", shape, e);
            Error::Extraction(e)
          })?;
        let truncated = extracted.possibly_truncated();
        if truncated
        {   warn!("{:?} response was cut off and repaired", shape);
        }

        Ok(AnalysisResponse
        {   record: extracted.record
          , raw_text
          , model: self.gemini.model().to_string()
          , truncated
        })
    }
}

/// Public API for the Pal backend - owns the task
pub struct PalBackend
{   hand: crate::PalHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl PalBackend
{   /// Create and spawn a new Pal backend
    /// Returns immediately - spawns background task
    pub fn new(config: PalConfig) -> Self
    {   debug!("Creating PalBackend with task ownership");

        let (analyze_tx, analyze_rx)
          = mpsc::unbounded_channel();
        let (set_api_key_tx, set_api_key_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::PalHand
        {   analyze_tx
          , set_api_key_tx
          , kill_process_tx
        };

        let foot = crate::PalFoot
        {   analyze_rx
          , set_api_key_rx
          , kill_process_rx
        };

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, config).await
        });

        PalBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue an analysis - returns almost immediately.
    /// Analyses are answered one at a time, in queue order.
    pub fn analyze(
      &self
    , request: AnalysisRequest
    ) -> Result<
        mpsc::UnboundedReceiver<crate::AnalyzeReply>,
        Error
      >
    {   debug!("analyze queuing {:?} request", request.pal);
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::AnalyzeArgs
        {   request
          , reply: reply_tx
        };

        self.hand.analyze_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Queue an analysis and wait for its result
    pub async fn analyze_and_wait(
      &self
    , request: AnalysisRequest
    ) -> crate::AnalyzeReply
    {   let mut rx = self.analyze(request)?;
        rx.recv().await
          .unwrap_or_else(|| {
            Err(Error::Other(
              "Backend dropped the request".to_string()
            ))
          })
    }

    /// Replace the Gemini API key - returns almost immediately
    pub fn set_api_key(
      &self
    , key: String
    ) -> Result<
        mpsc::UnboundedReceiver<crate::SetApiKeyReply>,
        Error
      >
    {   debug!("set_api_key queuing");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        self.hand.set_api_key_tx
          .send(crate::SetApiKeyArgs { key, reply: reply_tx })
          .map_err(|_| {
            error!("Backend channel closed");
            Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        Ok(reply_rx)
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), Error>
    {   debug!("Shutting down PalBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(Error::Timeout)
        }
    }
}

/// Runs queued analyses in order, one at a time
async fn run_analysis_worker(
  mut work_rx: mpsc::UnboundedReceiver<crate::AnalyzeArgs>
, state: Arc<PalBackendState>
)
{   while let Some(cmd) = work_rx.recv().await
    {   debug!("Running Analyze for {:?}", cmd.request.pal);
        let result = state.handle_analyze(cmd.request).await;
        let _ = cmd.reply.send(result);
    }
    debug!("Analysis queue closed");
}

/// Main backend event loop
///
/// Analyses (retries and backoff included) run on a separate worker, so
/// set_api_key and shutdown are answered while one is in flight. A new
/// key takes effect once the model call in flight returns.
async fn run_backend_loop(
  foot: PalFoot
, config: PalConfig
)
{   debug!("Starting PalBackend event loop");
    let state = Arc::new(PalBackendState::new(config));
    let PalFoot
    {   mut analyze_rx
      , mut set_api_key_rx
      , mut kill_process_rx
    } = foot;

    let (work_tx, work_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(
      run_analysis_worker(work_rx, Arc::clone(&state))
    );

    loop
    { tokio::select!
      { Some(cmd) = analyze_rx.recv() => {
          debug!("Received Analyze for {:?}", cmd.request.pal);
          if let Err(mpsc::error::SendError(cmd)) = work_tx.send(cmd)
          {   error!("Analysis worker stopped");
              let _ = cmd.reply.send(Err(Error::Other(
                "Analysis worker stopped".to_string()
              )));
          }
        }
      , Some(cmd) = set_api_key_rx.recv() => {
          debug!("Received SetApiKey");
          let crate::SetApiKeyArgs { key, reply } = cmd;
          let (tx, mut rx) = mpsc::unbounded_channel();
          match state.gemini.set_api_key(key, tx)
          {   Ok(()) => {
                tokio::spawn(async move {
                  let result = rx.recv().await.unwrap_or_else(|| {
                    Err(Error::Other(
                      "Gemini client dropped the request".to_string()
                    ))
                  });
                  let _ = reply.send(result);
                });
              }
            , Err(e) => {
                let _ = reply.send(Err(e));
              }
          }
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          // pending analyses see their reply channel close
          worker.abort();
          let _ = state.gemini.shutdown();
          let _ = cmd.reply.send(Ok(()));
          info!("PalBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
