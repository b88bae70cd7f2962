//! Status indicator for the assistant's listening/thinking/speaking cycle

use std::sync::Mutex;

use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedState
{   Listening
  , Thinking
  , Speaking
  , Idle
}

impl LedState
{   /// RGB color shown for this state
    pub fn color(&self) -> (u8, u8, u8)
    {   match self
        {   LedState::Listening => (0, 0, 255)
          , LedState::Thinking => (255, 255, 255)
          , LedState::Speaking => (255, 140, 0)
          , LedState::Idle => (0, 0, 0)
        }
    }

    pub fn name(&self) -> &'static str
    {   match self
        {   LedState::Listening => "listening"
          , LedState::Thinking => "thinking"
          , LedState::Speaking => "speaking"
          , LedState::Idle => "idle"
        }
    }
}

/// Something that can show the assistant's state
pub trait StatusIndicator: Send + Sync
{   fn set_state(&self, state: LedState);
}

/// Reports state changes through the log
#[derive(Debug, Default)]
pub struct LogIndicator
{   current: Mutex<Option<LedState>>
}

impl LogIndicator
{   pub fn new() -> Self
    {   LogIndicator::default()
    }

    pub fn current(&self) -> Option<LedState>
    {   self.current.lock().ok().and_then(|s| *s)
    }
}

impl StatusIndicator for LogIndicator
{   fn set_state(&self, state: LedState)
    {   let (r, g, b) = state.color();
        info!("Status: {} (#{:02x}{:02x}{:02x})", state.name(), r, g, b);
        if let Ok(mut current) = self.current.lock()
        {   *current = Some(state);
        }
    }
}
