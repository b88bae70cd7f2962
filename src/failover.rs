//! Backend selection and retry policy for the reasoning dispatcher

use std::time::Duration;
use log::debug;

/// Linear retry policy for the secondary leg
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy
{   pub max_attempts: u32
  , pub delay: Duration
}

impl RetryPolicy
{   /// Create a new retry policy; at least one attempt is always made
    pub fn new(
      max_attempts: u32
    , delay_secs: f64
    ) -> Self
    {   let delay = if delay_secs.is_finite() && delay_secs > 0.0
        {   Duration::try_from_secs_f64(delay_secs)
              .unwrap_or(Duration::MAX)
        } else
        {   Duration::ZERO
        };
        RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , delay
        }
    }

    pub fn from_config(config: &crate::config::ResolvedConfig) -> Self
    {   RetryPolicy::new(config.retry_count, config.retry_delay_secs)
    }

    /// Sleep to take after failed attempt number `attempt` (1-based)
    pub fn backoff_for_attempt(
      &self
    , attempt: u32
    ) -> Duration
    {   debug!("Calculating backoff for attempt {}", attempt);
        self.delay.saturating_mul(attempt)
    }

    /// Check if another attempt follows `attempt`
    pub fn has_next(&self, attempt: u32) -> bool
    {   attempt < self.max_attempts
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(
          crate::config::DEFAULT_RETRY_COUNT
        , crate::config::DEFAULT_RETRY_DELAY_SECS
        )
    }
}

/// Order in which backends are tried for one dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route
{   /// Primary once, no fallback
    PrimaryOnly
  , /// Secondary with retries, then primary once
    SecondaryFirst
}

impl Route
{   /// An explicit override wins over the configured default
    pub fn select(
      config: &crate::config::ResolvedConfig
    , use_secondary_override: Option<bool>
    ) -> Self
    {   let secondary = use_secondary_override
          .unwrap_or(config.use_secondary_first);
        debug!(
          "Route selection: override={:?} configured={} -> secondary={}",
          use_secondary_override, config.use_secondary_first, secondary
        );
        if secondary
        {   Route::SecondaryFirst
        } else
        {   Route::PrimaryOnly
        }
    }
}
