//! Microphone capture into a mono 16-bit WAV file

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use log::{debug, error, info};

/// Sample rate for speech capture
pub const SAMPLE_RATE: u32 = 16000;

/// Records from the default input device
#[derive(Debug, Clone)]
pub struct CpalRecorder
{   sample_rate: u32
}

impl CpalRecorder
{   pub fn new(sample_rate: u32) -> Self
    {   CpalRecorder
        {   sample_rate
        }
    }
}

impl Default for CpalRecorder
{   fn default() -> Self
    {   CpalRecorder::new(SAMPLE_RATE)
    }
}

#[async_trait::async_trait]
impl super::AudioRecorder for CpalRecorder
{   async fn record(
      &self
    , path: &Path
    , seconds: u32
    ) -> Result<(), crate::error::Error>
    {   info!("Recording for {} seconds...", seconds);
        let sample_rate = self.sample_rate;
        let path: PathBuf = path.to_path_buf();

        // cpal streams are not Send; keep the whole capture on one thread
        tokio::task::spawn_blocking(move || -> Result<(), crate::error::Error> {
          let samples = capture_blocking(sample_rate, seconds.max(1))?;
          write_wav(&path, &samples, sample_rate)?;
          debug!(
            "Audio saved to {} ({} samples)",
            path.display(), samples.len()
          );
          Ok(())
        })
        .await
        .map_err(audio_error)?
    }
}

fn capture_blocking(
  sample_rate: u32
, seconds: u32
) -> Result<Vec<f32>, crate::error::Error>
{   let host = cpal::default_host();
    let device = host
      .default_input_device()
      .ok_or_else(|| audio_error("no input device available"))?;

    let supported = device
      .supported_input_configs()
      .map_err(audio_error)?
      .find(|c| {
        c.channels() == 1
          && c.min_sample_rate() <= SampleRate(sample_rate)
          && c.max_sample_rate() >= SampleRate(sample_rate)
      })
      .ok_or_else(|| audio_error("no mono input config at the requested rate"))?;
    let config: StreamConfig = supported
      .with_sample_rate(SampleRate(sample_rate))
      .config();
    debug!(
      "Capturing from {} at {} Hz",
      device.name().unwrap_or_default(), sample_rate
    );

    let buffer = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&buffer);
    let stream = device
      .build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
          if let Ok(mut buf) = sink.lock()
          {   buf.extend_from_slice(data);
          }
        },
        |err| {
          error!("Audio capture error: {}", err);
        },
        None,
      )
      .map_err(audio_error)?;

    stream.play().map_err(audio_error)?;
    std::thread::sleep(Duration::from_secs(u64::from(seconds)));
    drop(stream);

    let samples = buffer
      .lock()
      .map(|mut buf| std::mem::take(&mut *buf))
      .unwrap_or_default();
    Ok(samples)
}

/// Write `[-1.0, 1.0]` samples as mono 16-bit PCM
pub fn write_wav(
  path: &Path
, samples: &[f32]
, sample_rate: u32
) -> Result<(), crate::error::Error>
{   if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty())
    {   std::fs::create_dir_all(parent)?;
    }
    let spec = hound::WavSpec
    {   channels: 1
      , sample_rate
      , bits_per_sample: 16
      , sample_format: hound::SampleFormat::Int
    };
    let mut writer = hound::WavWriter::create(path, spec)
      .map_err(audio_error)?;
    for &sample in samples
    {   let value = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer.write_sample(value).map_err(audio_error)?;
    }
    writer.finalize().map_err(audio_error)?;
    Ok(())
}

pub(crate) fn audio_error(e: impl std::fmt::Display) -> crate::error::Error
{   crate::error::Error::Audio(e.to_string())
}
