use tokio::sync::{mpsc, watch};
use log::{debug, error, info, warn};

use crate::failover::{RetryPolicy, Route};
use crate::request::{Backend, DispatchResult, LastResultInfo};
use crate::NovaFoot;

/// Routes one prompt to the reasoning backends
///
/// Holds the resolved configuration and the outcome of its most recent
/// dispatch. A `Dispatcher` handles one prompt at a time; share it
/// through [`NovaBackend`] when several callers need it.
pub struct Dispatcher
{   config: crate::ResolvedConfig
  , client: crate::providers::GenerateClient
  , last: LastResultInfo
}

impl Dispatcher
{   pub fn new(config: crate::ResolvedConfig) -> Self
    {   debug!("Initializing Dispatcher");
        Dispatcher
        {   config
          , client: crate::providers::GenerateClient::new()
          , last: LastResultInfo::default()
        }
    }

    pub fn set_config(&mut self, config: crate::ResolvedConfig)
    {   debug!("Replacing dispatcher config");
        self.config = config;
    }

    /// Outcome of the most recent dispatch
    pub fn last_result_info(&self) -> LastResultInfo
    {   self.last
    }

    /// Send `prompt` to whichever backend answers first
    ///
    /// Never fails: total failure is an empty text with
    /// [`Backend::None`].
    pub async fn dispatch(
      &mut self
    , prompt: &str
    , use_secondary_override: Option<bool>
    ) -> DispatchResult
    {   let route = Route::select(&self.config, use_secondary_override);
        let result = match route
        {   Route::PrimaryOnly => self.primary_leg(prompt, false).await
          , Route::SecondaryFirst => {
              match self.secondary_leg(prompt).await
              {   Some(text) => DispatchResult
                  {   text
                    , backend_used: Backend::Secondary
                    , fallback_occurred: false
                  }
                , None => {
                    warn!("Secondary backend exhausted, falling back to primary");
                    self.primary_leg(prompt, true).await
                  }
              }
            }
        };

        self.last = result.info();
        info!(
          "Dispatch served by {} (fallback: {})",
          result.backend_used, result.fallback_occurred
        );
        result
    }

    async fn secondary_leg(&self, prompt: &str) -> Option<String>
    {   if self.config.secondary_endpoint.trim().is_empty()
        {   warn!("No secondary endpoint configured");
            return None;
        }

        let policy = RetryPolicy::from_config(&self.config);
        let mut attempt = 1;
        loop
        {   debug!(
              "Secondary attempt {}/{}", attempt, policy.max_attempts
            );
            match self.client
              .send_secondary(&self.config, prompt)
              .await
            {   Ok(text) => return Some(text)
              , Err(e) => {
                  warn!("Secondary attempt {} failed: {}", attempt, e);
                  if !e.is_retryable() || !policy.has_next(attempt)
                  {   return None;
                  }
                  tokio::time::sleep(
                    policy.backoff_for_attempt(attempt)
                  ).await;
                  attempt += 1;
                }
            }
        }
    }

    async fn primary_leg(
      &self
    , prompt: &str
    , fallback_occurred: bool
    ) -> DispatchResult
    {   match self.client
          .send_primary(&self.config, prompt)
          .await
        {   Ok(text) => DispatchResult
            {   text
              , backend_used: Backend::Primary
              , fallback_occurred
            }
          , Err(e) => {
              error!("Primary backend failed: {}", e);
              DispatchResult::failed(fallback_occurred)
            }
        }
    }
}

/// Public API for the dispatcher - owns the task
pub struct NovaBackend
{   hand: crate::NovaHand
  , last_rx: watch::Receiver<LastResultInfo>
  , _task_handle: tokio::task::JoinHandle<()>
}

impl NovaBackend
{   /// Create and spawn a new dispatcher task
    /// Returns immediately - spawns background task
    pub fn new(config: crate::ResolvedConfig) -> Self
    {   debug!("Creating NovaBackend with task ownership");

        let (dispatch_tx, dispatch_rx)
          = mpsc::unbounded_channel();
        let (set_config_tx, set_config_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::NovaHand
        {   dispatch_tx
          , set_config_tx
          , kill_process_tx
        };

        let foot = crate::NovaFoot
        {   dispatch_rx
          , set_config_rx
          , kill_process_rx
        };

        let (last_tx, last_rx)
          = watch::channel(LastResultInfo::default());

        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, config, last_tx).await
        });

        NovaBackend
        {   hand
          , last_rx
          , _task_handle
        }
    }

    /// Dispatch a prompt and wait for its result
    pub async fn dispatch(
      &self
    , prompt: String
    , use_secondary: Option<bool>
    ) -> DispatchResult
    {   debug!("dispatch queuing prompt ({} chars)", prompt.len());
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::DispatchArgs
        {   prompt
          , use_secondary
          , reply: reply_tx
        };

        if self.hand.dispatch_tx.send(cmd).is_err()
        {   error!("Backend channel closed");
            return DispatchResult::failed(false);
        }

        match reply_rx.recv().await
        {   Some(result) => result
          , None => {
              error!("Backend dropped dispatch reply");
              DispatchResult::failed(false)
            }
        }
    }

    /// Read-only snapshot of the most recent completed dispatch
    ///
    /// Published by the backend task after each dispatch; reading it never
    /// waits on a dispatch in flight.
    pub fn last_result_info(&self) -> LastResultInfo
    {   *self.last_rx.borrow()
    }

    /// Swap the configuration used by later dispatches
    pub async fn set_config(
      &self
    , config: crate::ResolvedConfig
    ) -> Result<(), crate::error::Error>
    {   debug!("set_config queuing command");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::SetConfigArgs
        {   config
          , reply: reply_tx
        };

        self.hand.set_config_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            crate::error::Error::Other(
              "Backend disconnected".to_string()
            )
          })?;

        reply_rx.recv().await.unwrap_or_else(|| {
          Err(crate::error::Error::Other(
            "Backend disconnected".to_string()
          ))
        })
    }

    /// Gracefully shutdown the backend
    pub async fn shutdown(self)
      -> Result<(), crate::error::Error>
    {   debug!("Shutting down NovaBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            crate::error::Error::Other(
              "Backend already shutdown".to_string()
            )
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(crate::error::Error::Timeout)
        }
    }
}

/// Main backend event loop
///
/// Each dispatch is awaited before the next command is read, so at most
/// one reasoning request is in flight per backend.
async fn run_backend_loop(
  foot: crate::NovaFoot
, config: crate::ResolvedConfig
, last_tx: watch::Sender<LastResultInfo>
)
{   debug!("Starting NovaBackend event loop");
    let mut dispatcher = Dispatcher::new(config);
    let NovaFoot
    {   mut dispatch_rx
      , mut set_config_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = dispatch_rx.recv() => {
          debug!("Received Dispatch");
          let result = dispatcher
            .dispatch(&cmd.prompt, cmd.use_secondary)
            .await;
          last_tx.send_replace(dispatcher.last_result_info());
          let _ = cmd.reply.send(result);
        }
      , Some(cmd) = set_config_rx.recv() => {
          debug!("Received SetConfig");
          dispatcher.set_config(cmd.config);
          let _ = cmd.reply.send(Ok(()));
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!("Received KillProcess");
          let _ = cmd.reply.send(Ok(()));
          info!("NovaBackend shutting down");
          break;
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
