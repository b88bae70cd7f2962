//! Voice collaborators
//!
//! Capture and playback run in-process on cpal with WAV files through
//! hound. Speech to text runs a whisper.cpp binary and speech synthesis
//! posts to a TTS server.

mod capture;
mod playback;
mod stt;
mod tts;

use std::path::Path;

pub use capture::{write_wav, CpalRecorder, SAMPLE_RATE};
pub use playback::{read_wav_mono, CpalPlayer};
pub use stt::WhisperCpp;
pub use tts::HttpSynthesizer;

/// Records mono 16-bit PCM into a WAV file
#[async_trait::async_trait]
pub trait AudioRecorder: Send + Sync
{   async fn record(
      &self
    , path: &Path
    , seconds: u32
    ) -> Result<(), crate::error::Error>;
}

/// Turns a WAV file into plain text
#[async_trait::async_trait]
pub trait Transcriber: Send + Sync
{   async fn transcribe(
      &self
    , path: &Path
    ) -> Result<String, crate::error::Error>;
}

/// Renders text to a playable audio file
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync
{   async fn synthesize(
      &self
    , text: &str
    , voice: Option<&crate::config::Voice>
    , output: &Path
    ) -> Result<(), crate::error::Error>;
}

/// Plays an audio file to completion
#[async_trait::async_trait]
pub trait AudioPlayer: Send + Sync
{   async fn play(&self, path: &Path) -> Result<(), crate::error::Error>;
}
