//! Best-effort lookups run alongside the assistant
//!
//! Plugins are registered explicitly at startup. Each one runs in
//! isolation: an error from one plugin is recorded as its output and the
//! rest still run.

pub mod calendar;
pub mod image_info;
pub mod news;
pub mod weather;

use std::collections::BTreeMap;

use log::{debug, warn};

pub use calendar::CalendarPlugin;
pub use image_info::ImagePlugin;
pub use news::NewsPlugin;
pub use weather::WeatherPlugin;

/// Values handed to every plugin: config file entries plus call context
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PluginContext
{   values: BTreeMap<String, serde_json::Value>
}

impl PluginContext
{   pub fn new(values: BTreeMap<String, serde_json::Value>) -> Self
    {   PluginContext
        {   values
        }
    }

    /// Layer `call` over `config`; call values win
    pub fn merged(
      config: &BTreeMap<String, serde_json::Value>
    , call: BTreeMap<String, serde_json::Value>
    ) -> Self
    {   let mut values = config.clone();
        values.extend(call);
        PluginContext::new(values)
    }

    pub fn get_str(&self, key: &str) -> Option<&str>
    {   self.values
          .get(key)
          .and_then(|v| v.as_str())
          .filter(|s| !s.is_empty())
    }
}

#[async_trait::async_trait]
pub trait Plugin: Send + Sync
{   fn name(&self) -> &str;

    async fn run(
      &self
    , context: &PluginContext
    ) -> Result<String, crate::error::Error>;
}

/// Ordered set of plugins
#[derive(Default)]
pub struct PluginRegistry
{   plugins: Vec<Box<dyn Plugin>>
}

impl PluginRegistry
{   pub fn new() -> Self
    {   PluginRegistry::default()
    }

    /// Calendar, weather, news and image, configured from the environment
    pub fn with_defaults() -> Self
    {   let mut registry = PluginRegistry::new();
        registry.register(Box::new(CalendarPlugin::from_home()));
        registry.register(Box::new(WeatherPlugin::from_env()));
        registry.register(Box::new(NewsPlugin::new()));
        registry.register(Box::new(ImagePlugin::new()));
        registry
    }

    pub fn register(&mut self, plugin: Box<dyn Plugin>)
    {   debug!("Registering plugin {}", plugin.name());
        self.plugins.push(plugin);
    }

    pub fn names(&self) -> Vec<&str>
    {   self.plugins.iter().map(|p| p.name()).collect()
    }

    /// Run every plugin; failures become `"Error: ..."` entries
    pub async fn run_all(
      &self
    , context: &PluginContext
    ) -> BTreeMap<String, String>
    {   let mut results = BTreeMap::new();
        for plugin in &self.plugins
        {   let output = match plugin.run(context).await
            {   Ok(text) => text
              , Err(e) => {
                  warn!("Plugin {} failed: {}", plugin.name(), e);
                  format!("Error: {}", e)
                }
            };
            results.insert(plugin.name().to_string(), output);
        }
        results
    }
}
