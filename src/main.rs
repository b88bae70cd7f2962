use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use log::{error, info, warn};

use nova::assistant::{Assistant, TurnOutcome, NO_ANSWER_MESSAGE};
use nova::memory::ReminderStore;
use nova::plugins::{PluginContext, PluginRegistry};
use nova::{ConfigLayer, NovaBackend, NovaFile};

/// Nova: ambient personal assistant
#[derive(Parser)]
#[command(name = "nova", version)]
struct Cli
{   /// YAML settings file
    #[arg(short, long, env = "NOVA_CONFIG", default_value = "nova.yaml")]
    config: PathBuf

  , /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8

  , #[command(subcommand)]
    command: Command
}

#[derive(Args, Clone, Copy)]
struct BackendFlags
{   /// Try the secondary backend first, falling back to the primary
    #[arg(long, conflicts_with = "primary")]
    secondary: bool

  , /// Send only to the primary backend
    #[arg(long)]
    primary: bool
}

impl BackendFlags
{   fn override_value(&self) -> Option<bool>
    {   match (self.secondary, self.primary)
        {   (true, _) => Some(true)
          , (_, true) => Some(false)
          , _ => None
        }
    }
}

#[derive(Subcommand)]
enum Command
{   /// Send one text prompt and print the reply
    Ask
    {   text: String
      , #[command(flatten)]
        backend: BackendFlags
    }
  , /// Run voice turns: record, transcribe, answer, speak
    Listen
    {   /// Number of turns to run
        #[arg(long, default_value_t = 1)]
        turns: u32
      , #[command(flatten)]
        backend: BackendFlags
    }
  , /// Serve the status page
    Serve
    {   /// Address to bind, overriding the config file
        #[arg(long)]
        bind: Option<String>
    }
  , /// Run every plugin once and print the results
    Plugins
    {   /// Picture handed to the image plugin
        #[arg(long)]
        image: Option<PathBuf>
    }
  , /// Manage reminders
    Reminders
    {   #[command(subcommand)]
        action: ReminderAction
    }
  , /// Show or clear conversation memory
    Memory
    {   /// Delete the stored history
        #[arg(long)]
        clear: bool
    }
}

#[derive(Subcommand)]
enum ReminderAction
{   /// List active reminders
    List
  , /// Add a reminder, optionally at HH:MM
    Add
    {   routine: String
      , #[arg(long)]
        time: Option<String>
    }
  , /// Print reminders due this minute
    Due
}

fn init_logging(verbose: u8)
{   let level = match verbose
    {   0 => "info"
      , 1 => "debug"
      , _ => "trace"
    };
    env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or(level)
    ).init();
}

#[tokio::main]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    init_logging(cli.verbose);
    info!("Nova: Ambient Personal AI - starting up");

    match run(cli).await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) => {
          error!("{}", e);
          ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), nova::error::Error>
{   let file = NovaFile::load(&cli.config);
    let settings = file.assistant.clone();
    let resolved = file.resolve(&ConfigLayer::default());
    let backend = Arc::new(NovaBackend::new(resolved));
    let assistant = Arc::new(Assistant::new(backend.clone(), &settings));
    let reminders = ReminderStore::new(settings.reminder_file.clone());

    match cli.command
    {   Command::Ask { text, backend: flags } => {
          let result = assistant.ask(&text, flags.override_value()).await;
          if result.is_answer()
          {   println!("{}", result.text);
          } else
          {   println!("{}", NO_ANSWER_MESSAGE);
          }
          info!(
            "Served by {} (fallback: {})",
            result.backend_used, result.fallback_occurred
          );
        }
      , Command::Listen { turns, backend: flags } => {
          for _ in 0..turns
          {   match assistant.run_turn(flags.override_value()).await?
              {   TurnOutcome::Answered { result, .. } => {
                    println!("{}", result.text);
                  }
                , TurnOutcome::NoAnswer { .. } => {
                    println!("{}", NO_ANSWER_MESSAGE);
                  }
                , TurnOutcome::NoTranscript => {
                    warn!("No transcript to process");
                  }
              }
              for reminder in reminders.due_now()
              {   println!("Reminder: {}", reminder);
              }
          }
        }
      , Command::Serve { bind } => {
          let bind = bind.unwrap_or_else(|| settings.web_bind.clone());
          let state = Arc::new(nova::web::WebState::new(
            assistant.clone(), backend.clone(), &settings
          ));
          nova::web::serve(state, &bind).await?;
        }
      , Command::Plugins { image } => {
          let registry = PluginRegistry::with_defaults();
          let mut call = BTreeMap::new();
          if let Some(path) = image
          {   call.insert(
                "image_path".to_string(),
                path.display().to_string().into(),
              );
          }
          let context = PluginContext::merged(&settings.plugins, call);
          for (name, output) in registry.run_all(&context).await
          {   println!("{}: {}", name, output);
          }
        }
      , Command::Reminders { action } => match action
        {   ReminderAction::List => {
              for reminder in reminders.list()
              {   println!("{}", reminder);
              }
            }
          , ReminderAction::Add { routine, time } => {
              reminders.add(&routine, time.as_deref())?;
            }
          , ReminderAction::Due => {
              for reminder in reminders.due_now()
              {   println!("{}", reminder);
              }
            }
        }
      , Command::Memory { clear } => {
          if clear
          {   assistant.store().clear()?;
          } else
          {   println!("{}", assistant.store().suggest_routine());
              for turn in assistant.store().load()
              {   println!("User: {}\nNova: {}\n", turn.user, turn.nova);
              }
          }
        }
    }

    drop(assistant);
    if let Ok(backend) = Arc::try_unwrap(backend)
    {   let _ = backend.shutdown().await;
    }
    Ok(())
}
