use serde::Serialize;
use log::{debug, trace, error};

use crate::config::{ApiKey, ResolvedConfig, REQUEST_TIMEOUT};
use crate::request::{PrimaryRequest, SecondaryRequest};

/// Single-attempt HTTP client for text-generation backends
#[derive(Debug, Clone)]
pub struct GenerateClient
{   http_client: reqwest::Client
}

impl GenerateClient
{   pub fn new() -> Self
    {   debug!("Creating GenerateClient");
        let http_client = reqwest::Client::builder()
          .timeout(REQUEST_TIMEOUT)
          .build()
          .unwrap_or_else(|e| {
            error!("Falling back to default HTTP client: {}", e);
            reqwest::Client::new()
          });
        GenerateClient
        {   http_client
        }
    }

    /// POST `{model, prompt}` to the primary backend
    pub async fn send_primary(
      &self
    , config: &ResolvedConfig
    , prompt: &str
    ) -> Result<String, crate::error::Error>
    {   let request = PrimaryRequest
        {   model: config.primary_model.clone()
          , prompt: prompt.to_string()
        };
        self.post(
          &config.primary_endpoint
        , &request
        , config.primary_auth.as_ref()
        ).await
    }

    /// POST `{prompt}` to the secondary backend
    pub async fn send_secondary(
      &self
    , config: &ResolvedConfig
    , prompt: &str
    ) -> Result<String, crate::error::Error>
    {   let request = SecondaryRequest
        {   prompt: prompt.to_string()
        };
        self.post(
          &config.secondary_endpoint
        , &request
        , config.secondary_auth.as_ref()
        ).await
    }

    async fn post<B: Serialize>(
      &self
    , endpoint: &str
    , body: &B
    , auth: Option<&ApiKey>
    ) -> Result<String, crate::error::Error>
    {   let mut builder = self.http_client
          .post(endpoint)
          .header("Content-Type", "application/json")
          .json(body);

        if let Some(api_key) = auth
        {   let (name, value) = api_key.style.header(&api_key.key);
            trace!("Attaching {} header", name);
            builder = builder.header(name, value);
        }

        let response = builder
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error posting to {}: {}", endpoint, e);
            crate::error::Error::from(e)
          })?;

        let status = response.status();
        trace!("Response status from {}: {}", endpoint, status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            error!("Backend {} returned {}: {}", endpoint, status, error_text);
            return Err(crate::error::Error::HttpStatus
            {   status: status.as_u16()
              , body: error_text
            });
        }

        let text = response.text().await.map_err(|e| {
          error!("Failed to read body from {}: {}", endpoint, e);
          crate::error::Error::from(e)
        })?;

        Ok(crate::request::normalize_reply(&text))
    }
}

impl Default for GenerateClient
{   fn default() -> Self
    {   GenerateClient::new()
    }
}
