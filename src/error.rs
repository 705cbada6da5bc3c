use std::fmt;

/// Failure to recover a shape record from model text.
/// Both variants are recoverable: the caller decides whether to retry
/// the remote request or show a fallback message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError
{   /// No brace-delimited span exists in the cleaned text
    NoJsonFound
  , /// Span found but unusable even after repair
    MalformedResponse
    {   raw: String
      , reason: String
    }
}

impl ExtractionError
{   /// Raw model text kept for diagnostics, if any
    pub fn raw_text(&self) -> Option<&str>
    {   match self
        {   ExtractionError::NoJsonFound => None
          , ExtractionError::MalformedResponse { raw, .. } => {
              Some(raw.as_str())
            }
        }
    }
}

impl fmt::Display for ExtractionError
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   ExtractionError::NoJsonFound => {
              write!(f, "No JSON object found in response")
            }
          , ExtractionError::MalformedResponse { reason, .. } => {
              write!(f, "Malformed response: {}", reason)
            }
        }
    }
}

impl std::error::Error for ExtractionError {}

/// Custom error type for Pal operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing
    MissingApiKey(String)
  , /// HTTP request error
    HttpError(String)
  , /// API returned an error response
    ApiError
    {   status: u16
      , body: String
    }
  , /// Failed to parse the API envelope
    ParseError(String)
  , /// No candidate text in API response
    NoCandidates
  , /// Rate limit exceeded
    RateLimitExceeded
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Request rejected before it was sent
    InvalidInput(String)
  , /// Model answered but the answer could not be used
    Extraction(ExtractionError)
  , /// Creation store failure
    Storage(String)
  , /// No creation with this id
    CreationNotFound(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl Error
{   /// Whether re-issuing the same remote request may succeed
    pub fn is_transient(&self) -> bool
    {   match self
        {   Error::HttpError(_)
          | Error::RateLimitExceeded
          | Error::Timeout => true
          , Error::ApiError { status, .. } => *status >= 500
          , _ => false
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(what) => {
              write!(f, "Missing API key for: {}", what)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, body } => {
              write!(f, "API error {}: {}", status, body)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoCandidates => {
              write!(f, "API response contained no candidate text")
            }
          , Error::RateLimitExceeded => {
              write!(f, "API rate limit exceeded")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::InvalidInput(msg) => {
              write!(f, "Invalid input: {}", msg)
            }
          , Error::Extraction(e) => {
              write!(f, "Could not analyze response: {}", e)
            }
          , Error::Storage(msg) => {
              write!(f, "Storage error: {}", msg)
            }
          , Error::CreationNotFound(id) => {
              write!(f, "Creation not found: {}", id)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<ExtractionError> for Error
{   fn from(e: ExtractionError) -> Self
    {   Error::Extraction(e)
    }
}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn transient_errors()
    {   assert!(Error::HttpError("reset".into()).is_transient());
        assert!(Error::RateLimitExceeded.is_transient());
        assert!(Error::ApiError { status: 503, body: String::new() }
          .is_transient());
        assert!(!Error::ApiError { status: 400, body: String::new() }
          .is_transient());
        assert!(!Error::Extraction(ExtractionError::NoJsonFound)
          .is_transient());
    }

    #[test]
    fn raw_text_is_kept()
    {   let e = ExtractionError::MalformedResponse
        {   raw: "{oops".to_string()
          , reason: "eof".to_string()
        };
        assert_eq!(e.raw_text(), Some("{oops"));
        assert_eq!(ExtractionError::NoJsonFound.raw_text(), None);
    }
}
