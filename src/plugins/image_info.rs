use std::path::{Path, PathBuf};

use image::ColorType;
use log::debug;

const NO_IMAGE: &str = "No image provided or file not found.";

/// Describes the picture named by the `image_path` context entry
#[derive(Debug, Clone, Default)]
pub struct ImagePlugin;

impl ImagePlugin
{   pub fn new() -> Self
    {   ImagePlugin
    }
}

/// Short channel layout name, e.g. `RGB` or `L`
pub fn mode_name(color: ColorType) -> String
{   match color
    {   ColorType::L8 => "L".to_string()
      , ColorType::La8 => "LA".to_string()
      , ColorType::Rgb8 => "RGB".to_string()
      , ColorType::Rgba8 => "RGBA".to_string()
      , ColorType::L16 => "I;16".to_string()
      , other => format!("{:?}", other)
    }
}

fn describe(path: &Path) -> String
{   match image::open(path)
    {   Ok(img) => format!(
          "Processed image: Image size: ({}, {}), mode: {}",
          img.width(), img.height(), mode_name(img.color())
        )
      , Err(e) => format!("Image processing error: {}", e)
    }
}

#[async_trait::async_trait]
impl super::Plugin for ImagePlugin
{   fn name(&self) -> &str
    {   "image"
    }

    async fn run(
      &self
    , context: &super::PluginContext
    ) -> Result<String, crate::error::Error>
    {   let path = match context.get_str("image_path")
        {   Some(path) => PathBuf::from(path)
          , None => return Ok(NO_IMAGE.to_string())
        };
        if !tokio::fs::try_exists(&path).await.unwrap_or(false)
        {   debug!("Image {} not found", path.display());
            return Ok(NO_IMAGE.to_string());
        }
        tokio::task::spawn_blocking(move || describe(&path))
          .await
          .map_err(|e| crate::error::Error::Plugin(e.to_string()))
    }
}
