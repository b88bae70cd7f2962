use std::fmt;

/// Custom error type for Nova operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// Connection refused, DNS failure, timeout or body read failure
    Transport(String)
  , /// Backend answered with a non-2xx status
    HttpStatus
    {   status: u16
      , body: String
    }
  , /// Body could not be parsed as structured data
    ParseError(String)
  , /// Filesystem error
    Io(String)
  , /// Audio capture or playback error
    Audio(String)
  , /// Speech-to-text error
    Transcription(String)
  , /// Text-to-speech error
    Synthesis(String)
  , /// Plugin lookup error
    Plugin(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::Transport(msg) => {
              write!(f, "Transport error: {}", msg)
            }
          , Error::HttpStatus { status, body } => {
              write!(f, "HTTP status {}: {}", status, body)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::Io(msg) => {
              write!(f, "IO error: {}", msg)
            }
          , Error::Audio(msg) => {
              write!(f, "Audio error: {}", msg)
            }
          , Error::Transcription(msg) => {
              write!(f, "Transcription error: {}", msg)
            }
          , Error::Synthesis(msg) => {
              write!(f, "Synthesis error: {}", msg)
            }
          , Error::Plugin(msg) => {
              write!(f, "Plugin error: {}", msg)
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

impl Error
{   /// Whether the dispatcher may retry after this error
    pub fn is_retryable(&self) -> bool
    {   matches!(
          self,
          Error::Transport(_)
            | Error::HttpStatus { .. }
            | Error::Timeout
        )
    }
}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error
{   fn from(e: serde_json::Error) -> Self
    {   Error::ParseError(e.to_string())
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   Error::Timeout
        } else
        {   Error::Transport(e.to_string())
        }
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
    fn test_display_status()
    {   let err = Error::HttpStatus
        {   status: 500
          , body: "boom".to_string()
        };
        assert_eq!(err.to_string(), "HTTP status 500: boom");
    }

    #[test]
    fn test_retryable_kinds()
    {   assert!(Error::Transport("refused".into()).is_retryable());
        assert!(Error::Timeout.is_retryable());
        assert!(!Error::ParseError("bad".into()).is_retryable());
        assert!(!Error::Io("gone".into()).is_retryable());
    }
}
