//! Layered configuration for the reasoning backends and the assistant
//!
//! Resolution order is defaults < YAML file < environment secrets <
//! per-call overrides. Every layer is a [`ConfigLayer`] with optional
//! fields; [`resolve`] folds them into one immutable [`ResolvedConfig`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use log::{debug, warn};

pub const DEFAULT_PRIMARY_ENDPOINT: &str
  = "http://localhost:11434/api/generate";
pub const DEFAULT_PRIMARY_MODEL: &str = "llama3";
pub const DEFAULT_SECONDARY_ENDPOINT: &str
  = "http://localhost:8080/api/generate";
pub const DEFAULT_RETRY_COUNT: u32 = 2;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
/// Longest base delay between secondary attempts
pub const MAX_RETRY_DELAY_SECS: f64 = 3600.0;

/// Per-attempt HTTP timeout, fixed for both backends
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

pub const ENV_PRIMARY_API_KEY: &str = "NOVA_PRIMARY_API_KEY";
pub const ENV_PRIMARY_API_KEY_STYLE: &str
  = "NOVA_PRIMARY_API_KEY_STYLE";
pub const ENV_SECONDARY_API_KEY: &str = "NOVA_SECONDARY_API_KEY";
pub const ENV_SECONDARY_API_KEY_STYLE: &str
  = "NOVA_SECONDARY_API_KEY_STYLE";
pub const ENV_SECONDARY_API_KEY_ALIAS: &str = "OPEN_WEBUI_API_KEY";
pub const ENV_SECONDARY_API_KEY_STYLE_ALIAS: &str
  = "OPEN_WEBUI_API_KEY_STYLE";

/// Which header carries a backend secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuthHeaderStyle
{   #[default]
    Bearer
  , XApiKey
}

impl AuthHeaderStyle
{   /// Case-insensitive selector; anything unrecognized is Bearer
    pub fn parse(selector: &str) -> Self
    {   match selector.trim().to_ascii_lowercase().as_str()
        {   "x-api-key" | "x_api_key" | "xapikey" => {
              AuthHeaderStyle::XApiKey
            }
          , _ => AuthHeaderStyle::Bearer
        }
    }

    /// Header name and value for `key`
    pub fn header(&self, key: &str) -> (&'static str, String)
    {   match self
        {   AuthHeaderStyle::XApiKey => ("X-API-Key", key.to_string())
          , AuthHeaderStyle::Bearer => {
              ("Authorization", format!("Bearer {}", key))
            }
        }
    }
}

/// A secret together with the header style it travels in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiKey
{   pub key: String
  , pub style: AuthHeaderStyle
}

impl ApiKey
{   fn from_parts(
      key: Option<String>
    , style: Option<String>
    ) -> Option<Self>
    {   let key = key?;
        if key.is_empty()
        {   return None;
        }
        Some(ApiKey
        {   key
          , style: style
              .as_deref()
              .map(AuthHeaderStyle::parse)
              .unwrap_or_default()
        })
    }
}

/// One layer of backend settings; unset fields fall through
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigLayer
{   pub use_secondary_first: Option<bool>
  , pub primary_endpoint: Option<String>
  , pub primary_model: Option<String>
  , pub primary_api_key: Option<String>
  , pub primary_api_key_style: Option<String>
  , pub secondary_endpoint: Option<String>
  , pub secondary_api_key: Option<String>
  , pub secondary_api_key_style: Option<String>
  , pub secondary_retries: Option<i64>
  , pub secondary_retry_delay: Option<f64>
}

impl ConfigLayer
{   /// Read the environment layer
    pub fn from_env() -> Self
    {   ConfigLayer::from_env_with(|name| std::env::var(name).ok())
    }

    /// Build the environment layer from an arbitrary lookup
    pub fn from_env_with<F>(lookup: F) -> Self
    where
      F: Fn(&str) -> Option<String>
    {   let get = |primary: &str, alias: Option<&str>| {
          lookup(primary)
            .or_else(|| alias.and_then(&lookup))
            .filter(|v| !v.is_empty())
        };
        ConfigLayer
        {   primary_api_key: get(ENV_PRIMARY_API_KEY, None)
          , primary_api_key_style: get(ENV_PRIMARY_API_KEY_STYLE, None)
          , secondary_api_key: get(
              ENV_SECONDARY_API_KEY
            , Some(ENV_SECONDARY_API_KEY_ALIAS)
            )
          , secondary_api_key_style: get(
              ENV_SECONDARY_API_KEY_STYLE
            , Some(ENV_SECONDARY_API_KEY_STYLE_ALIAS)
            )
          , ..ConfigLayer::default()
        }
    }

    /// Fields set here win over `lower`
    pub fn over(self, lower: ConfigLayer) -> ConfigLayer
    {   ConfigLayer
        {   use_secondary_first: self.use_secondary_first
              .or(lower.use_secondary_first)
          , primary_endpoint: self.primary_endpoint
              .or(lower.primary_endpoint)
          , primary_model: self.primary_model.or(lower.primary_model)
          , primary_api_key: self.primary_api_key
              .or(lower.primary_api_key)
          , primary_api_key_style: self.primary_api_key_style
              .or(lower.primary_api_key_style)
          , secondary_endpoint: self.secondary_endpoint
              .or(lower.secondary_endpoint)
          , secondary_api_key: self.secondary_api_key
              .or(lower.secondary_api_key)
          , secondary_api_key_style: self.secondary_api_key_style
              .or(lower.secondary_api_key_style)
          , secondary_retries: self.secondary_retries
              .or(lower.secondary_retries)
          , secondary_retry_delay: self.secondary_retry_delay
              .or(lower.secondary_retry_delay)
        }
    }
}

/// Settings a single dispatch runs with
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig
{   pub primary_endpoint: String
  , pub primary_model: String
  , pub primary_auth: Option<ApiKey>
  , pub secondary_endpoint: String
  , pub secondary_auth: Option<ApiKey>
  , pub use_secondary_first: bool
  , /// Always at least 1
    pub retry_count: u32
  , /// Always finite and non-negative
    pub retry_delay_secs: f64
}

impl Default for ResolvedConfig
{   fn default() -> Self
    {   resolve(
          &ConfigLayer::default()
        , &ConfigLayer::default()
        , &ConfigLayer::default()
        )
    }
}

/// Merge file, environment and override layers over the defaults
pub fn resolve(
  file: &ConfigLayer
, env: &ConfigLayer
, overrides: &ConfigLayer
) -> ResolvedConfig
{   let merged = overrides.clone()
      .over(env.clone())
      .over(file.clone());

    let retry_count = merged.secondary_retries
      .map(|n| n.clamp(1, u32::MAX as i64) as u32)
      .unwrap_or(DEFAULT_RETRY_COUNT);
    let retry_delay_secs = match merged.secondary_retry_delay
    {   Some(d) if d.is_finite() && d > MAX_RETRY_DELAY_SECS => {
          warn!(
            "Capping secondary_retry_delay {} at {}",
            d, MAX_RETRY_DELAY_SECS
          );
          MAX_RETRY_DELAY_SECS
        }
      , Some(d) if d.is_finite() && d >= 0.0 => d
      , Some(d) => {
          warn!("Ignoring invalid secondary_retry_delay {}", d);
          0.0
        }
      , None => DEFAULT_RETRY_DELAY_SECS
    };

    let resolved = ResolvedConfig
    {   primary_endpoint: merged.primary_endpoint
          .unwrap_or_else(|| DEFAULT_PRIMARY_ENDPOINT.to_string())
      , primary_model: merged.primary_model
          .unwrap_or_else(|| DEFAULT_PRIMARY_MODEL.to_string())
      , primary_auth: ApiKey::from_parts(
          merged.primary_api_key
        , merged.primary_api_key_style
        )
      , secondary_endpoint: merged.secondary_endpoint
          .unwrap_or_else(|| DEFAULT_SECONDARY_ENDPOINT.to_string())
      , secondary_auth: ApiKey::from_parts(
          merged.secondary_api_key
        , merged.secondary_api_key_style
        )
      , use_secondary_first: merged.use_secondary_first
          .unwrap_or(false)
      , retry_count
      , retry_delay_secs
    };
    debug!(
      "Resolved config: secondary_first={} retries={} delay={}s",
      resolved.use_secondary_first,
      resolved.retry_count,
      resolved.retry_delay_secs
    );
    resolved
}

/// A selectable text-to-speech voice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voice
{   pub name: String
  , #[serde(default)]
    pub language: String
  , #[serde(default)]
    pub style: String
}

/// Settings for the collaborators around the dispatcher
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig
{   pub memory_file: PathBuf
  , pub reminder_file: PathBuf
  , pub memory_limit: usize
  , pub whisper_path: PathBuf
  , pub whisper_model: PathBuf
  , pub tts_endpoint: String
  , pub record_seconds: u32
  , pub sample_rate: u32
  , pub input_wav: PathBuf
  , pub reply_wav: PathBuf
  , pub voices: Vec<Voice>
  , pub default_voice: String
  , pub web_bind: String
  , /// Extra values handed to every plugin
    pub plugins: BTreeMap<String, serde_json::Value>
}

impl Default for AssistantConfig
{   fn default() -> Self
    {   AssistantConfig
        {   memory_file: PathBuf::from("logs/conversation_history.json")
          , reminder_file: PathBuf::from("logs/active_reminders.json")
          , memory_limit: 20
          , whisper_path: PathBuf::from("./whisper.cpp/main")
          , whisper_model: PathBuf::from("models/ggml-base.en.bin")
          , tts_endpoint: "http://localhost:5002/api/tts".to_string()
          , record_seconds: 5
          , sample_rate: 16000
          , input_wav: PathBuf::from("temp_input.wav")
          , reply_wav: PathBuf::from("nova_reply.wav")
          , voices: vec![
              Voice
              {   name: "en_US".to_string()
                , language: "English".to_string()
                , style: "neutral".to_string()
              }
            ]
          , default_voice: "en_US".to_string()
          , web_bind: "0.0.0.0:5000".to_string()
          , plugins: BTreeMap::new()
        }
    }
}

/// Everything the YAML settings file may contain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NovaFile
{   #[serde(flatten)]
    pub backends: ConfigLayer
  , pub assistant: AssistantConfig
}

impl NovaFile
{   /// Parse YAML; malformed input collapses to defaults
    pub fn from_yaml_str(text: &str) -> Self
    {   if text.trim().is_empty()
        {   return NovaFile::default();
        }
        match serde_yaml::from_str::<NovaFile>(text)
        {   Ok(file) => file
          , Err(e) => {
              warn!("Malformed config, using defaults: {}", e);
              NovaFile::default()
            }
        }
    }

    /// Load from disk; a missing file is not an error
    pub fn load(path: &Path) -> Self
    {   match std::fs::read_to_string(path)
        {   Ok(text) => {
              debug!("Loaded config from {}", path.display());
              NovaFile::from_yaml_str(&text)
            }
          , Err(e) => {
              debug!(
                "No config at {} ({}), using defaults",
                path.display(), e
              );
              NovaFile::default()
            }
        }
    }

    /// Resolve backend settings against the process environment
    pub fn resolve(&self, overrides: &ConfigLayer) -> ResolvedConfig
    {   resolve(&self.backends, &ConfigLayer::from_env(), overrides)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> ConfigLayer
    {   let map: HashMap<String, String> = pairs
          .iter()
          .map(|(k, v)| (k.to_string(), v.to_string()))
          .collect();
        ConfigLayer::from_env_with(|name| map.get(name).cloned())
    }

    #[test]
    fn test_defaults()
    {   let cfg = ResolvedConfig::default();
        assert_eq!(cfg.primary_endpoint, DEFAULT_PRIMARY_ENDPOINT);
        assert_eq!(cfg.primary_model, "llama3");
        assert!(!cfg.use_secondary_first);
        assert_eq!(cfg.retry_count, DEFAULT_RETRY_COUNT);
        assert!(cfg.primary_auth.is_none());
        assert!(cfg.secondary_auth.is_none());
    }

    #[test]
    fn test_precedence_file_env_override()
    {   let file = NovaFile::from_yaml_str(
          "use_secondary_first: true\n\
           secondary_api_key: file-key\n\
           secondary_retries: 4\n\
           primary_model: mistral\n"
        );
        let env = env_of(&[("NOVA_SECONDARY_API_KEY", "env-key")]);
        let overrides = ConfigLayer
        {   use_secondary_first: Some(false)
          , ..ConfigLayer::default()
        };

        let cfg = resolve(&file.backends, &env, &overrides);
        assert!(!cfg.use_secondary_first);
        assert_eq!(cfg.retry_count, 4);
        assert_eq!(cfg.primary_model, "mistral");
        assert_eq!(
          cfg.secondary_auth.map(|k| k.key),
          Some("env-key".to_string())
        );
    }

    #[test]
    fn test_env_alias_and_style()
    {   let env = env_of(&[
          ("OPEN_WEBUI_API_KEY", "alias-key")
        , ("OPEN_WEBUI_API_KEY_STYLE", "X-Api-Key")
        ]);
        let cfg = resolve(
          &ConfigLayer::default(), &env, &ConfigLayer::default()
        );
        assert_eq!(
          cfg.secondary_auth,
          Some(ApiKey
          {   key: "alias-key".to_string()
            , style: AuthHeaderStyle::XApiKey
          })
        );
    }

    #[test]
    fn test_style_without_key_is_dropped()
    {   let env = env_of(&[("NOVA_PRIMARY_API_KEY_STYLE", "x-api-key")]);
        let cfg = resolve(
          &ConfigLayer::default(), &env, &ConfigLayer::default()
        );
        assert!(cfg.primary_auth.is_none());
    }

    #[test]
    fn test_clamping()
    {   let file = NovaFile::from_yaml_str(
          "secondary_retries: 0\nsecondary_retry_delay: -2.5\n"
        );
        let cfg = resolve(
          &file.backends
        , &ConfigLayer::default()
        , &ConfigLayer::default()
        );
        assert_eq!(cfg.retry_count, 1);
        assert_eq!(cfg.retry_delay_secs, 0.0);
    }

    #[test]
    fn test_huge_delay_is_capped()
    {   let file = NovaFile::from_yaml_str("secondary_retry_delay: 1e20\n");
        let cfg = resolve(
          &file.backends
        , &ConfigLayer::default()
        , &ConfigLayer::default()
        );
        assert_eq!(cfg.retry_delay_secs, MAX_RETRY_DELAY_SECS);
    }

    #[test]
    fn test_malformed_yaml_collapses_to_defaults()
    {   let file = NovaFile::from_yaml_str("secondary_retries: [oops");
        assert_eq!(file, NovaFile::default());
    }

    #[test]
    fn test_missing_file()
    {   let file = NovaFile::load(Path::new("/nonexistent/nova.yaml"));
        assert_eq!(file, NovaFile::default());
    }

    #[test]
    fn test_assistant_section()
    {   let file = NovaFile::from_yaml_str(
          "assistant:\n  memory_limit: 5\n  plugins:\n    news_api_key: abc\n"
        );
        assert_eq!(file.assistant.memory_limit, 5);
        assert_eq!(file.assistant.sample_rate, 16000);
        assert_eq!(
          file.assistant.plugins.get("news_api_key"),
          Some(&serde_json::Value::String("abc".to_string()))
        );
    }

    #[test]
    fn test_auth_style_parse()
    {   assert_eq!(AuthHeaderStyle::parse("X-API-KEY"), AuthHeaderStyle::XApiKey);
        assert_eq!(AuthHeaderStyle::parse("bearer"), AuthHeaderStyle::Bearer);
        assert_eq!(AuthHeaderStyle::parse("token"), AuthHeaderStyle::Bearer);
        assert_eq!(
          AuthHeaderStyle::Bearer.header("k"),
          ("Authorization", "Bearer k".to_string())
        );
        assert_eq!(
          AuthHeaderStyle::XApiKey.header("k"),
          ("X-API-Key", "k".to_string())
        );
    }
}
