use std::time::Duration;

use serde::Deserialize;
use log::debug;

const OPENWEATHER_URL: &str
  = "https://api.openweathermap.org/data/2.5/weather";

#[derive(Debug, Deserialize)]
struct WeatherResponse
{   weather: Vec<WeatherEntry>
  , main: WeatherMain
}

#[derive(Debug, Deserialize)]
struct WeatherEntry
{   description: String
}

#[derive(Debug, Deserialize)]
struct WeatherMain
{   temp: f64
}

#[derive(Debug, Deserialize)]
struct ApiMessage
{   message: Option<String>
}

/// Current conditions from OpenWeather
pub struct WeatherPlugin
{   http_client: reqwest::Client
  , base_url: String
  , api_key: Option<String>
  , city: String
}

impl WeatherPlugin
{   pub fn new(api_key: Option<String>, city: impl Into<String>) -> Self
    {   WeatherPlugin
        {   http_client: reqwest::Client::new()
          , base_url: OPENWEATHER_URL.to_string()
          , api_key: api_key.filter(|k| !k.is_empty())
          , city: city.into()
        }
    }

    /// Key from `OPENWEATHER_API_KEY`, city from `NOVA_WEATHER_CITY`
    pub fn from_env() -> Self
    {   WeatherPlugin::new(
          std::env::var("OPENWEATHER_API_KEY").ok()
        , std::env::var("NOVA_WEATHER_CITY")
            .unwrap_or_else(|_| "London".to_string())
        )
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self
    {   self.base_url = base_url.into();
        self
    }
}

#[async_trait::async_trait]
impl super::Plugin for WeatherPlugin
{   fn name(&self) -> &str
    {   "weather"
    }

    async fn run(
      &self
    , _context: &super::PluginContext
    ) -> Result<String, crate::error::Error>
    {   let api_key = match &self.api_key
        {   Some(key) => key
          , None => {
              return Ok(
                "Weather API key not set. Set OPENWEATHER_API_KEY env variable."
                  .to_string()
              );
            }
        };

        debug!("Fetching weather for {}", self.city);
        let response = self.http_client
          .get(&self.base_url)
          .query(&[
            ("q", self.city.as_str())
          , ("appid", api_key.as_str())
          , ("units", "metric")
          ])
          .timeout(Duration::from_secs(5))
          .send()
          .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success()
        {   let message = serde_json::from_str::<ApiMessage>(&body)
              .ok()
              .and_then(|m| m.message)
              .unwrap_or_else(|| "Unknown error".to_string());
            return Ok(format!("Weather API error: {}", message));
        }

        let data: WeatherResponse = serde_json::from_str(&body)?;
        let description = data.weather
          .first()
          .map(|w| w.description.as_str())
          .unwrap_or("unknown");
        Ok(format!(
          "Weather in {}: {}, {}°C.",
          self.city, description, data.main.temp
        ))
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::plugins::{Plugin, PluginContext};
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_missing_key_message()
    {   let plugin = WeatherPlugin::new(None, "Oslo");
        let out = plugin.run(&PluginContext::default()).await.unwrap();
        assert!(out.starts_with("Weather API key not set"));
    }

    #[tokio::test]
    async fn test_reports_conditions()
    {   let server = MockServer::start().await;
        Mock::given(method("GET"))
          .and(query_param("q", "Oslo"))
          .and(query_param("appid", "k"))
          .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "weather": [{"description": "light snow"}],
            "main": {"temp": -3.5}
          })))
          .mount(&server)
          .await;

        let plugin = WeatherPlugin::new(Some("k".into()), "Oslo")
          .with_base_url(server.uri());
        let out = plugin.run(&PluginContext::default()).await.unwrap();
        assert_eq!(out, "Weather in Oslo: light snow, -3.5°C.");
    }

    #[tokio::test]
    async fn test_api_error_message()
    {   let server = MockServer::start().await;
        Mock::given(method("GET"))
          .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "message": "Invalid API key"
          })))
          .mount(&server)
          .await;

        let plugin = WeatherPlugin::new(Some("bad".into()), "Oslo")
          .with_base_url(server.uri());
        let out = plugin.run(&PluginContext::default()).await.unwrap();
        assert_eq!(out, "Weather API error: Invalid API key");
    }
}
