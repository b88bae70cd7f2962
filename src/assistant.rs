//! One assistant turn: listen, think, speak, remember

use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, error, info, warn};

use crate::config::{AssistantConfig, Voice};
use crate::led::{LedState, LogIndicator, StatusIndicator};
use crate::memory::ConversationStore;
use crate::request::DispatchResult;
use crate::voice::{
  AudioPlayer, AudioRecorder, CpalPlayer, CpalRecorder,
  HttpSynthesizer, SpeechSynthesizer, Transcriber, WhisperCpp,
};

/// Shown to users when no backend answered
pub const NO_ANSWER_MESSAGE: &str
  = "Sorry, I don't have an answer right now.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome
{   /// Nothing intelligible was recorded
    NoTranscript
  , /// Neither backend answered
    NoAnswer
    {   transcript: String
      , result: DispatchResult
    }
  , Answered
    {   transcript: String
      , result: DispatchResult
    }
}

pub struct Assistant
{   backend: Arc<crate::NovaBackend>
  , recorder: Box<dyn AudioRecorder>
  , transcriber: Box<dyn Transcriber>
  , synthesizer: Box<dyn SpeechSynthesizer>
  , player: Box<dyn AudioPlayer>
  , indicator: Box<dyn StatusIndicator>
  , store: ConversationStore
  , record_seconds: u32
  , input_wav: PathBuf
  , reply_wav: PathBuf
  , voice: Option<Voice>
}

impl Assistant
{   /// Wire the default collaborators from `config`
    pub fn new(
      backend: Arc<crate::NovaBackend>
    , config: &AssistantConfig
    ) -> Self
    {   let voice = config.voices
          .iter()
          .find(|v| v.name == config.default_voice)
          .cloned();
        Assistant
        {   backend
          , recorder: Box::new(CpalRecorder::new(config.sample_rate))
          , transcriber: Box::new(WhisperCpp::new(
              config.whisper_path.clone()
            , config.whisper_model.clone()
            ))
          , synthesizer: Box::new(HttpSynthesizer::new(
              config.tts_endpoint.clone()
            ))
          , player: Box::new(CpalPlayer::new())
          , indicator: Box::new(LogIndicator::new())
          , store: ConversationStore::new(
              config.memory_file.clone()
            , config.memory_limit
            )
          , record_seconds: config.record_seconds
          , input_wav: config.input_wav.clone()
          , reply_wav: config.reply_wav.clone()
          , voice
        }
    }

    pub fn with_recorder(mut self, recorder: Box<dyn AudioRecorder>) -> Self
    {   self.recorder = recorder;
        self
    }

    pub fn with_transcriber(mut self, transcriber: Box<dyn Transcriber>) -> Self
    {   self.transcriber = transcriber;
        self
    }

    pub fn with_synthesizer(
      mut self
    , synthesizer: Box<dyn SpeechSynthesizer>
    ) -> Self
    {   self.synthesizer = synthesizer;
        self
    }

    pub fn with_player(mut self, player: Box<dyn AudioPlayer>) -> Self
    {   self.player = player;
        self
    }

    pub fn with_indicator(mut self, indicator: Box<dyn StatusIndicator>) -> Self
    {   self.indicator = indicator;
        self
    }

    pub fn store(&self) -> &ConversationStore
    {   &self.store
    }

    /// Record, transcribe, dispatch, speak and save one exchange
    ///
    /// Only a recording failure is an error; everything after it degrades
    /// to a [`TurnOutcome`]. The indicator always ends idle.
    pub async fn run_turn(
      &self
    , use_secondary: Option<bool>
    ) -> Result<TurnOutcome, crate::error::Error>
    {   self.indicator.set_state(LedState::Listening);
        let outcome = self.listen_and_answer(use_secondary).await;
        self.indicator.set_state(LedState::Idle);
        outcome
    }

    async fn listen_and_answer(
      &self
    , use_secondary: Option<bool>
    ) -> Result<TurnOutcome, crate::error::Error>
    {   self.recorder
          .record(&self.input_wav, self.record_seconds)
          .await?;

        self.indicator.set_state(LedState::Thinking);
        let transcript = self.transcriber
          .transcribe(&self.input_wav)
          .await
          .unwrap_or_else(|e| {
            error!("Transcription failed: {}", e);
            String::new()
          });
        info!("Transcript: {}", transcript);
        if transcript.trim().is_empty()
        {   info!("No transcript to process");
            return Ok(TurnOutcome::NoTranscript);
        }

        let result = self.backend
          .dispatch(transcript.clone(), use_secondary)
          .await;
        if !result.is_answer()
        {   warn!("No response from reasoning engine");
            return Ok(TurnOutcome::NoAnswer { transcript, result });
        }
        info!("Nova response: {}", result.text);

        self.indicator.set_state(LedState::Speaking);
        self.speak(&result.text).await;
        self.remember(&transcript, &result.text);
        Ok(TurnOutcome::Answered { transcript, result })
    }

    /// Text-only exchange: dispatch and save, no audio
    pub async fn ask(
      &self
    , text: &str
    , use_secondary: Option<bool>
    ) -> DispatchResult
    {   let result = self.backend
          .dispatch(text.to_string(), use_secondary)
          .await;
        if result.is_answer()
        {   self.remember(text, &result.text);
        }
        result
    }

    async fn speak(&self, text: &str)
    {   if let Err(e) = self.synthesizer
          .synthesize(text, self.voice.as_ref(), &self.reply_wav)
          .await
        {   error!("Speech synthesis failed: {}", e);
            return;
        }
        if let Err(e) = self.player.play(&self.reply_wav).await
        {   error!("Playback failed: {}", e);
        }
    }

    fn remember(&self, user_text: &str, reply: &str)
    {   match self.store.save_turn(user_text, reply)
        {   Ok(()) => debug!("Turn saved")
          , Err(e) => error!("Failed to save turn: {}", e)
        }
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use std::path::Path;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SilentRecorder;

    #[async_trait::async_trait]
    impl AudioRecorder for SilentRecorder
    {   async fn record(
          &self
        , _path: &Path
        , _seconds: u32
        ) -> Result<(), crate::error::Error>
        {   Ok(())
        }
    }

    struct FixedTranscript(&'static str);

    #[async_trait::async_trait]
    impl Transcriber for FixedTranscript
    {   async fn transcribe(
          &self
        , _path: &Path
        ) -> Result<String, crate::error::Error>
        {   Ok(self.0.to_string())
        }
    }

    #[derive(Clone, Default)]
    struct Spoken(Arc<Mutex<Vec<String>>>);

    #[async_trait::async_trait]
    impl SpeechSynthesizer for Spoken
    {   async fn synthesize(
          &self
        , text: &str
        , _voice: Option<&Voice>
        , _output: &Path
        ) -> Result<(), crate::error::Error>
        {   self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct NoPlayback;

    #[async_trait::async_trait]
    impl AudioPlayer for NoPlayback
    {   async fn play(&self, _path: &Path) -> Result<(), crate::error::Error>
        {   Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct States(Arc<Mutex<Vec<LedState>>>);

    impl StatusIndicator for States
    {   fn set_state(&self, state: LedState)
        {   self.0.lock().unwrap().push(state);
        }
    }

    fn assistant(
      primary: &str
    , dir: &tempfile::TempDir
    , transcript: &'static str
    ) -> (Assistant, Spoken, States)
    {   let resolved = crate::ResolvedConfig
        {   primary_endpoint: primary.to_string()
          , ..crate::ResolvedConfig::default()
        };
        let config = AssistantConfig
        {   memory_file: dir.path().join("history.json")
          , ..AssistantConfig::default()
        };
        let spoken = Spoken::default();
        let states = States::default();
        let assistant = Assistant::new(
            Arc::new(crate::NovaBackend::new(resolved))
          , &config
          )
          .with_recorder(Box::new(SilentRecorder))
          .with_transcriber(Box::new(FixedTranscript(transcript)))
          .with_synthesizer(Box::new(spoken.clone()))
          .with_player(Box::new(NoPlayback))
          .with_indicator(Box::new(states.clone()));
        (assistant, spoken, states)
    }

    #[tokio::test]
    async fn test_answered_turn()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .respond_with(ResponseTemplate::new(200)
            .set_body_json(serde_json::json!({"response": "It's 2 PM."})))
          .mount(&server)
          .await;

        let dir = tempfile::tempdir().unwrap();
        let (assistant, spoken, states) = assistant(&server.uri(), &dir, "What's the time?");
        let outcome = assistant.run_turn(None).await.unwrap();

        assert!(matches!(outcome, TurnOutcome::Answered { .. }));
        assert_eq!(*spoken.0.lock().unwrap(), vec!["It's 2 PM.".to_string()]);
        assert_eq!(
          *states.0.lock().unwrap(),
          vec![LedState::Listening, LedState::Thinking, LedState::Speaking, LedState::Idle]
        );
        let turns = assistant.store().load();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user, "What's the time?");
    }

    #[tokio::test]
    async fn test_empty_transcript_skips_dispatch()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .respond_with(ResponseTemplate::new(200))
          .expect(0)
          .mount(&server)
          .await;

        let dir = tempfile::tempdir().unwrap();
        let (assistant, spoken, states) = assistant(&server.uri(), &dir, "   ");
        let outcome = assistant.run_turn(None).await.unwrap();

        assert_eq!(outcome, TurnOutcome::NoTranscript);
        assert!(spoken.0.lock().unwrap().is_empty());
        assert_eq!(states.0.lock().unwrap().last(), Some(&LedState::Idle));
    }

    #[tokio::test]
    async fn test_no_answer_is_not_saved()
    {   let server = MockServer::start().await;
        Mock::given(method("POST"))
          .respond_with(ResponseTemplate::new(500))
          .mount(&server)
          .await;

        let dir = tempfile::tempdir().unwrap();
        let (assistant, _spoken, _states) = assistant(&server.uri(), &dir, "hello");
        let outcome = assistant.run_turn(None).await.unwrap();

        match outcome
        {   TurnOutcome::NoAnswer { result, .. } => {
              assert_eq!(result, DispatchResult::failed(false));
            }
          , other => panic!("unexpected outcome: {:?}", other)
        }
        assert!(assistant.store().load().is_empty());
    }
}
