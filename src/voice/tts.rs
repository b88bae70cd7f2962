//! Text-to-speech through an HTTP synthesis server

use std::path::Path;

use serde::Serialize;
use log::{debug, error, info};

#[derive(Debug, Serialize)]
struct TtsRequest<'a>
{   text: &'a str
  , #[serde(skip_serializing_if = "Option::is_none")]
    speaker_id: Option<&'a str>
  , #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<&'a str>
}

/// Posts text to a TTS server and writes the returned audio
#[derive(Debug, Clone)]
pub struct HttpSynthesizer
{   http_client: reqwest::Client
  , endpoint: String
}

impl HttpSynthesizer
{   pub fn new(endpoint: impl Into<String>) -> Self
    {   HttpSynthesizer
        {   http_client: reqwest::Client::new()
          , endpoint: endpoint.into()
        }
    }
}

#[async_trait::async_trait]
impl super::SpeechSynthesizer for HttpSynthesizer
{   async fn synthesize(
      &self
    , text: &str
    , voice: Option<&crate::config::Voice>
    , output: &Path
    ) -> Result<(), crate::error::Error>
    {   let request = TtsRequest
        {   text
          , speaker_id: voice.map(|v| v.name.as_str())
          , style: voice
              .map(|v| v.style.as_str())
              .filter(|s| !s.is_empty())
        };
        debug!("TTS request to {}: {:?}", self.endpoint, request);

        let response = self.http_client
          .post(&self.endpoint)
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("TTS request failed: {}", e);
            crate::error::Error::Synthesis(e.to_string())
          })?;

        let status = response.status();
        if !status.is_success()
        {   let body = response.text().await.unwrap_or_default();
            error!("TTS server error {}: {}", status, body);
            return Err(crate::error::Error::Synthesis(
              format!("TTS server error {}: {}", status, body)
            ));
        }

        let audio = response.bytes().await.map_err(|e| {
          crate::error::Error::Synthesis(e.to_string())
        })?;
        tokio::fs::write(output, &audio).await?;
        info!("Synthesized speech saved to {}", output.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::voice::SpeechSynthesizer;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_writes_audio()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .and(path("/api/tts"))
          .and(body_json(serde_json::json!({
            "text": "hello", "speaker_id": "en_US", "style": "calm"
          })))
          .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFdata".to_vec()))
          .expect(1)
          .mount(&server)
          .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("reply.wav");
        let voice = crate::config::Voice
        {   name: "en_US".to_string()
          , language: "English".to_string()
          , style: "calm".to_string()
        };
        let tts = HttpSynthesizer::new(format!("{}/api/tts", server.uri()));
        tts.synthesize("hello", Some(&voice), &out).await.unwrap();
        assert_eq!(std::fs::read(&out).unwrap(), b"RIFFdata");
    }

    #[tokio::test]
    async fn test_server_error()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .respond_with(ResponseTemplate::new(503))
          .mount(&server)
          .await;

        let dir = tempfile::tempdir().unwrap();
        let tts = HttpSynthesizer::new(server.uri());
        let result = tts
          .synthesize("hello", None, &dir.path().join("reply.wav"))
          .await;
        assert!(matches!(result, Err(crate::error::Error::Synthesis(_))));
    }
}
