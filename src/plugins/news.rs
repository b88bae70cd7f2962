use std::time::Duration;

use serde::Deserialize;
use log::debug;

const NEWSAPI_URL: &str = "https://newsapi.org/v2/top-headlines";

#[derive(Debug, Deserialize)]
struct NewsResponse
{   #[serde(default)]
    articles: Vec<Article>
  , message: Option<String>
}

#[derive(Debug, Deserialize)]
struct Article
{   #[serde(default)]
    title: String
}

/// Top three US headlines; key comes from the `news_api_key` context entry
pub struct NewsPlugin
{   http_client: reqwest::Client
  , base_url: String
}

impl NewsPlugin
{   pub fn new() -> Self
    {   NewsPlugin
        {   http_client: reqwest::Client::new()
          , base_url: NEWSAPI_URL.to_string()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self
    {   self.base_url = base_url.into();
        self
    }
}

impl Default for NewsPlugin
{   fn default() -> Self
    {   NewsPlugin::new()
    }
}

#[async_trait::async_trait]
impl super::Plugin for NewsPlugin
{   fn name(&self) -> &str
    {   "news"
    }

    async fn run(
      &self
    , context: &super::PluginContext
    ) -> Result<String, crate::error::Error>
    {   let api_key = match context.get_str("news_api_key")
        {   Some(key) => key
          , None => {
              return Ok(
                "News API key not set. Add 'news_api_key' under assistant.plugins in the config."
                  .to_string()
              );
            }
        };

        debug!("Fetching headlines");
        let response = self.http_client
          .get(&self.base_url)
          .query(&[("country", "us"), ("apiKey", api_key)])
          .timeout(Duration::from_secs(5))
          .send()
          .await?;

        let status = response.status();
        let data: NewsResponse = response.json().await?;
        if !status.is_success()
        {   return Ok(format!(
              "News API error: {}",
              data.message.unwrap_or_else(|| "Unknown error".to_string())
            ));
        }

        let headlines: Vec<&str> = data.articles
          .iter()
          .take(3)
          .map(|a| a.title.as_str())
          .collect();
        Ok(format!("News: {}", headlines.join("; ")))
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::plugins::{Plugin, PluginContext};
    use std::collections::BTreeMap;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context_with_key() -> PluginContext
    {   let mut values = BTreeMap::new();
        values.insert("news_api_key".to_string(), "nk".into());
        PluginContext::new(values)
    }

    #[tokio::test]
    async fn test_first_three_headlines()
    {   let server = MockServer::start().await;
        Mock::given(method("GET"))
          .and(query_param("apiKey", "nk"))
          .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "articles": [
              {"title": "one"}, {"title": "two"},
              {"title": "three"}, {"title": "four"}
            ]
          })))
          .mount(&server)
          .await;

        let plugin = NewsPlugin::new().with_base_url(server.uri());
        let out = plugin.run(&context_with_key()).await.unwrap();
        assert_eq!(out, "News: one; two; three");
    }

    #[tokio::test]
    async fn test_missing_key()
    {   let out = NewsPlugin::new().run(&PluginContext::default()).await.unwrap();
        assert!(out.starts_with("News API key not set"));
    }
}
