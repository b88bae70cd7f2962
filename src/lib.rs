pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod failover;
pub mod client;
pub mod memory;
pub mod voice;
pub mod led;
pub mod plugins;
pub mod assistant;
pub mod web;

pub use client::{Dispatcher, NovaBackend};
pub use config::{AssistantConfig, ConfigLayer, NovaFile, ResolvedConfig};
pub use request::{Backend, DispatchResult, LastResultInfo};

/*

nova is an async voice assistant loop: record, transcribe, ask a
reasoning backend, speak the reply, remember the turn.

nova/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Actor API types and re-exports
│   ├── main.rs         # `nova` command line
│   ├── error.rs        # Error type shared by every module
│   ├── config.rs       # Layered file/env/override resolution
│   ├── client.rs       # Dispatcher and its backend actor
│   ├── failover.rs     # Route selection and linear retry policy
│   ├── request.rs      # Wire bodies, results, reply normalization
│   ├── providers/      # HTTP text-generation clients
│   ├── memory.rs       # Conversation history and reminders
│   ├── voice/          # Recorder, transcriber, synthesizer, player
│   ├── led.rs          # Status indicator states
│   ├── plugins/        # Best-effort lookups (calendar, weather, news, image)
│   ├── assistant.rs    # One voice or text turn
│   └── web.rs          # Status page
└── tests/

*/

/// NOVA API INTERFACE:

// ===== Dispatch =====

pub type DispatchReplySender
  = tokio::sync::mpsc::UnboundedSender<crate::DispatchResult>;

pub struct DispatchArgs
{   pub prompt: String
  , /// `Some` wins over the configured backend order
    pub use_secondary: Option<bool>
  , pub reply: DispatchReplySender
}

// ===== SetConfig =====

pub type SetConfigReply = Result<(), crate::error::Error>;
pub type SetConfigReplySender
  = tokio::sync::mpsc::UnboundedSender<SetConfigReply>;

pub struct SetConfigArgs
{   pub config: crate::ResolvedConfig
  , pub reply: SetConfigReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== NovaHand (sender side) =====

pub struct NovaHand
{   pub dispatch_tx
      : tokio::sync::mpsc::UnboundedSender<DispatchArgs>
  , pub set_config_tx
      : tokio::sync::mpsc::UnboundedSender<SetConfigArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== NovaFoot (receiver side) =====

pub struct NovaFoot
{   pub dispatch_rx
      : tokio::sync::mpsc::UnboundedReceiver<DispatchArgs>
  , pub set_config_rx
      : tokio::sync::mpsc::UnboundedReceiver<SetConfigArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}
