//! WAV playback to the default output device

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use log::{debug, error};

use super::capture::audio_error;

/// Plays WAV files through cpal
#[derive(Debug, Clone, Default)]
pub struct CpalPlayer;

impl CpalPlayer
{   pub fn new() -> Self
    {   CpalPlayer
    }
}

#[async_trait::async_trait]
impl super::AudioPlayer for CpalPlayer
{   async fn play(&self, path: &Path) -> Result<(), crate::error::Error>
    {   debug!("Playing {}", path.display());
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || -> Result<(), crate::error::Error> {
          let (samples, sample_rate) = read_wav_mono(&path)?;
          play_blocking(samples, sample_rate)
        })
        .await
        .map_err(audio_error)?
    }
}

/// Decode a WAV file to mono `[-1.0, 1.0]` samples and its sample rate
pub fn read_wav_mono(
  path: &Path
) -> Result<(Vec<f32>, u32), crate::error::Error>
{   let mut reader = hound::WavReader::open(path).map_err(audio_error)?;
    let spec = reader.spec();
    let interleaved: Vec<f32> = match spec.sample_format
    {   hound::SampleFormat::Int => {
          let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
          reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / scale))
            .collect::<Result<_, _>>()
            .map_err(audio_error)?
        }
      , hound::SampleFormat::Float => {
          reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(audio_error)?
        }
    };

    let channels = usize::from(spec.channels.max(1));
    let samples = interleaved
      .chunks(channels)
      .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
      .collect();
    Ok((samples, spec.sample_rate))
}

fn play_blocking(
  samples: Vec<f32>
, sample_rate: u32
) -> Result<(), crate::error::Error>
{   if samples.is_empty()
    {   return Ok(());
    }

    let host = cpal::default_host();
    let device = host
      .default_output_device()
      .ok_or_else(|| audio_error("no output device available"))?;

    let supports = |channels: u16| {
      device
        .supported_output_configs()
        .ok()?
        .find(|c| {
          c.channels() == channels
            && c.min_sample_rate() <= SampleRate(sample_rate)
            && c.max_sample_rate() >= SampleRate(sample_rate)
        })
    };
    let supported = supports(1)
      .or_else(|| supports(2))
      .ok_or_else(|| audio_error("no output config at the file's sample rate"))?;
    let config: StreamConfig = supported
      .with_sample_rate(SampleRate(sample_rate))
      .config();
    let channels = usize::from(config.channels);

    let total = samples.len();
    let samples = Arc::new(samples);
    let position = Arc::new(AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));

    let stream = {
      let samples = Arc::clone(&samples);
      let position = Arc::clone(&position);
      let finished = Arc::clone(&finished);
      device
        .build_output_stream(
          &config,
          move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels)
            {   let pos = position.load(Ordering::Relaxed);
                let sample = match samples.get(pos)
                {   Some(s) => {
                      position.store(pos + 1, Ordering::Relaxed);
                      *s
                    }
                  , None => {
                      finished.store(true, Ordering::Relaxed);
                      0.0
                    }
                };
                for out in frame.iter_mut()
                {   *out = sample;
                }
            }
          },
          |err| {
            error!("Audio playback error: {}", err);
          },
          None,
        )
        .map_err(audio_error)?
    };
    stream.play().map_err(audio_error)?;

    let duration_ms = (total as u64 * 1000) / u64::from(sample_rate.max(1));
    let timeout = Duration::from_millis(duration_ms + 500);
    let started = Instant::now();
    while !finished.load(Ordering::Relaxed) && started.elapsed() < timeout
    {   std::thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
    debug!("Playback complete ({} samples)", total);
    Ok(())
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn test_stereo_is_downmixed()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reply.wav");
        let spec = hound::WavSpec
        {   channels: 2
          , sample_rate: 22050
          , bits_per_sample: 16
          , sample_format: hound::SampleFormat::Int
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for sample in [16384i16, 0, -16384, -16384]
        {   writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let (samples, rate) = read_wav_mono(&path).unwrap();
        assert_eq!(rate, 22050);
        assert_eq!(samples, vec![0.25, -0.5]);
    }

    #[tokio::test]
    async fn test_missing_file_is_audio_error()
    {   use crate::voice::AudioPlayer;
        let err = CpalPlayer::new()
          .play(Path::new("/nonexistent/reply.wav"))
          .await
          .unwrap_err();
        assert!(matches!(err, crate::error::Error::Audio(_)));
    }
}
