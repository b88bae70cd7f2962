//! Request bodies, dispatch results and reply normalization

use serde::{Deserialize, Serialize};

/// Reply fields checked in priority order
pub const REPLY_FIELDS: [&str; 3] = ["response", "output", "text"];

/// Body sent to the primary backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimaryRequest
{   pub model: String
  , pub prompt: String
}

/// Body sent to the secondary backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryRequest
{   pub prompt: String
}

/// Backend that served a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Backend
{   Primary
  , Secondary
  , /// Neither backend answered
    None
}

impl Backend
{   pub fn label(&self) -> &'static str
    {   match self
        {   Backend::Primary => "primary"
          , Backend::Secondary => "secondary"
          , Backend::None => "none"
        }
    }
}

impl std::fmt::Display for Backend
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {   f.write_str(self.label())
    }
}

/// Outcome of one dispatch; empty text means no answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult
{   pub text: String
  , pub backend_used: Backend
  , pub fallback_occurred: bool
}

impl DispatchResult
{   pub fn failed(fallback_occurred: bool) -> Self
    {   DispatchResult
        {   text: String::new()
          , backend_used: Backend::None
          , fallback_occurred
        }
    }

    pub fn is_answer(&self) -> bool
    {   self.backend_used != Backend::None && !self.text.is_empty()
    }

    pub fn info(&self) -> LastResultInfo
    {   LastResultInfo
        {   backend: self.backend_used
          , fallback: self.fallback_occurred
        }
    }
}

/// Snapshot of the most recent dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastResultInfo
{   pub backend: Backend
  , pub fallback: bool
}

impl Default for LastResultInfo
{   fn default() -> Self
    {   LastResultInfo
        {   backend: Backend::None
          , fallback: false
        }
    }
}

/// Pull the reply text out of a successful response body
///
/// The first present field of [`REPLY_FIELDS`] wins; anything that is
/// not a JSON object carrying one of them is returned verbatim.
pub fn normalize_reply(body: &str) -> String
{   let parsed: serde_json::Value = match serde_json::from_str(body)
    {   Ok(v) => v
      , Err(_) => return body.to_string()
    };
    let object = match parsed.as_object()
    {   Some(o) => o
      , None => return body.to_string()
    };
    REPLY_FIELDS
      .iter()
      .filter_map(|field| object.get(*field))
      .find(|v| !v.is_null())
      .map(|v| match v
      {   serde_json::Value::String(s) => s.clone()
        , other => other.to_string()
      })
      .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_response_beats_output()
    {   assert_eq!(normalize_reply(r#"{"response":"A","output":"B"}"#), "A");
    }

    #[test]
    fn test_output_then_text()
    {   assert_eq!(normalize_reply(r#"{"output":"B","text":"C"}"#), "B");
        assert_eq!(normalize_reply(r#"{"text":"C"}"#), "C");
    }

    #[test]
    fn test_null_field_is_skipped()
    {   assert_eq!(normalize_reply(r#"{"response":null,"text":"C"}"#), "C");
    }

    #[test]
    fn test_raw_fallbacks()
    {   assert_eq!(normalize_reply("plain words"), "plain words");
        assert_eq!(normalize_reply(r#"{"other":1}"#), r#"{"other":1}"#);
        assert_eq!(normalize_reply("[1,2]"), "[1,2]");
    }

    #[test]
    fn test_primary_body_shape()
    {   let body = serde_json::to_value(PrimaryRequest
        {   model: "llama3".to_string()
          , prompt: "hi".to_string()
        }).unwrap();
        assert_eq!(body, serde_json::json!({"model": "llama3", "prompt": "hi"}));
    }
}
