pub mod error;
pub mod config;
pub mod shape;
pub mod extract;
pub mod prompts;
pub mod providers;
pub mod request;
pub mod retry;
pub mod client;
pub mod store;

/*

pal_universe: the non-UI core of the Pal Universe app.

Each Pal (Cringe, Roast, Homework, Notes) sends text or a photo to
Gemini with its own prompt and gets back free text that should hold one
JSON object. `extract` digs that object out (fences, truncation, sloppy
quoting), checks it against the Pal's shape and returns a typed record.
`PalBackend` runs the whole round trip as a task; `store` keeps past
results ("creations").

src/
├── lib.rs          # Backend channel API and re-exports
├── error.rs        # Error and ExtractionError
├── config.rs       # Gemini, retry and store configuration
├── shape.rs        # The four response shapes
├── extract/        # Fence stripping, brace span, repair pipeline
├── prompts.rs      # Prompt per Pal
├── providers/      # Gemini client task
├── request.rs      # AnalysisRequest / AnalysisResponse
├── retry.rs        # Backoff for transient failures
├── client.rs       # PalBackend task
└── store.rs        # Saved creations and share text

*/

pub use client::PalBackend;
pub use config::PalConfig;
pub use error::{Error, ExtractionError};
pub use extract::{extract, extract_detailed, Extracted, RepairReport};
pub use request::{AnalysisRequest, AnalysisResponse, ImageInput, Pal};
pub use shape::{
  CringeAnalysis, HomeworkAnalysis, NoteAnalysis, NoteMode, RoastAnalysis,
  ShapeKind, ShapeRecord,
};
pub use store::{Creation, CreationStore, LocalCreationStore};

/// PAL BACKEND INTERFACE:

// ===== Analyze =====

pub type AnalyzeReply = Result<crate::request::AnalysisResponse, crate::error::Error>;
pub type AnalyzeReplySender
  = tokio::sync::mpsc::UnboundedSender<AnalyzeReply>;

pub struct AnalyzeArgs
{   pub request: crate::request::AnalysisRequest
  , pub reply: AnalyzeReplySender
}

// ===== SetApiKey =====

pub type SetApiKeyReply = Result<(), crate::error::Error>;
pub type SetApiKeyReplySender
  = tokio::sync::mpsc::UnboundedSender<SetApiKeyReply>;

pub struct SetApiKeyArgs
{   pub key: String
  , pub reply: SetApiKeyReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== PalHand (sender side) =====

pub struct PalHand
{   pub analyze_tx
      : tokio::sync::mpsc::UnboundedSender<AnalyzeArgs>
  , pub set_api_key_tx
      : tokio::sync::mpsc::UnboundedSender<SetApiKeyArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== PalFoot (receiver side) =====

pub struct PalFoot
{   pub analyze_rx
      : tokio::sync::mpsc::UnboundedReceiver<AnalyzeArgs>
  , pub set_api_key_rx
      : tokio::sync::mpsc::UnboundedReceiver<SetApiKeyArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
