//! Speech-to-text through a whisper.cpp executable

use std::path::{Path, PathBuf};

use log::{debug, error, info};
use tokio::process::Command;

/// Runs `whisper -f <wav> -m <model> -otxt` and reads the transcript
#[derive(Debug, Clone)]
pub struct WhisperCpp
{   binary: PathBuf
  , model: PathBuf
}

impl WhisperCpp
{   pub fn new(binary: impl Into<PathBuf>, model: impl Into<PathBuf>) -> Self
    {   WhisperCpp
        {   binary: binary.into()
          , model: model.into()
        }
    }

    /// Files whisper.cpp may have written the transcript to
    fn transcript_candidates(audio: &Path) -> [PathBuf; 2]
    {   let mut appended = audio.as_os_str().to_owned();
        appended.push(".txt");
        [audio.with_extension("txt"), PathBuf::from(appended)]
    }
}

#[async_trait::async_trait]
impl super::Transcriber for WhisperCpp
{   async fn transcribe(
      &self
    , path: &Path
    ) -> Result<String, crate::error::Error>
    {   info!("Transcribing {} with whisper.cpp", path.display());
        let output = Command::new(&self.binary)
          .arg("-f").arg(path)
          .arg("-m").arg(&self.model)
          .arg("-otxt")
          .output()
          .await
          .map_err(|e| {
            error!("Failed to start {}: {}", self.binary.display(), e);
            crate::error::Error::Transcription(e.to_string())
          })?;

        if !output.status.success()
        {   let stderr = String::from_utf8_lossy(&output.stderr);
            error!("whisper.cpp error: {}", stderr);
            return Err(crate::error::Error::Transcription(
              stderr.trim().to_string()
            ));
        }

        for candidate in WhisperCpp::transcript_candidates(path)
        {   match tokio::fs::read_to_string(&candidate).await
            {   Ok(text) => {
                  debug!("Read transcript from {}", candidate.display());
                  return Ok(text.trim().to_string());
                }
              , Err(e) => {
                  debug!("No transcript at {}: {}", candidate.display(), e);
                }
            }
        }
        Err(crate::error::Error::Transcription(
          format!("no transcript written for {}", path.display())
        ))
    }
}

#[cfg(all(test, unix))]
mod tests
{   use super::*;
    use crate::voice::Transcriber;
    use std::os::unix::fs::PermissionsExt;

    fn fake_whisper(dir: &Path, body: &str) -> PathBuf
    {   let script = dir.join("whisper");
        std::fs::write(&script, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(
          &script, std::fs::Permissions::from_mode(0o755)
        ).unwrap();
        script
    }

    #[tokio::test]
    async fn test_reads_sibling_txt()
    {   let dir = tempfile::tempdir().unwrap();
        // $2 is the wav path passed after -f
        let script = fake_whisper(
          dir.path()
        , r#"printf '  hello nova \n' > "${2%.wav}.txt""#
        );
        let wav = dir.path().join("input.wav");
        std::fs::write(&wav, b"RIFF").unwrap();

        let whisper = WhisperCpp::new(script, "model.bin");
        let text = whisper.transcribe(&wav).await.unwrap();
        assert_eq!(text, "hello nova");
    }

    #[tokio::test]
    async fn test_failure_exit()
    {   let dir = tempfile::tempdir().unwrap();
        let script = fake_whisper(dir.path(), "echo broken >&2; exit 3");
        let whisper = WhisperCpp::new(script, "model.bin");
        let err = whisper
          .transcribe(&dir.path().join("input.wav"))
          .await
          .unwrap_err();
        assert_eq!(err, crate::error::Error::Transcription("broken".into()));
    }
}
