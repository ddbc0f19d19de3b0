// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Retry with constant or exponential backoff.

use rand::Rng;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::duration::deserialize_optional;
use crate::engine::Context;
use crate::errors::ExecutionError;

const DEFAULT_CONSTANT_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_INITIAL_INTERVAL: Duration = Duration::from_millis(500);
const DEFAULT_MULTIPLIER: f64 = 1.5;
const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);

/// A named retry policy from `resiliency.retries`.
///
/// Retries are unbounded unless `maxRetries` (or, for exponential backoff,
/// `maxElapsedTime`) is given.
///
/// # Example
/// ```yaml
/// retries:
///   events:
///     policy: constant
///     duration: 100ms
///     maxRetries: 3
///   database:
///     policy: exponential
///     initialInterval: 50ms
///     maxInterval: 2s
///     maxElapsedTime: 30s
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum RetryConfig {
    #[serde(rename_all = "camelCase")]
    Constant {
        #[serde(default, deserialize_with = "deserialize_optional")]
        duration: Option<Duration>,
        #[serde(default)]
        max_retries: Option<u32>,
    },
    #[serde(rename_all = "camelCase")]
    Exponential {
        #[serde(default, deserialize_with = "deserialize_optional")]
        initial_interval: Option<Duration>,
        #[serde(default)]
        randomization_factor: Option<f64>,
        #[serde(default)]
        multiplier: Option<f64>,
        #[serde(default, deserialize_with = "deserialize_optional")]
        max_interval: Option<Duration>,
        #[serde(default, deserialize_with = "deserialize_optional")]
        max_elapsed_time: Option<Duration>,
        #[serde(default)]
        max_retries: Option<u32>,
    },
}

impl RetryConfig {
    /// Fixed delay between attempts.
    pub fn constant(duration: Duration, max_retries: Option<u32>) -> Self {
        RetryConfig::Constant {
            duration: Some(duration),
            max_retries,
        }
    }

    /// Creates a fresh backoff schedule. Each policy run gets its own.
    pub fn backoff(&self) -> Box<dyn Backoff> {
        match *self {
            RetryConfig::Constant {
                duration,
                max_retries,
            } => Box::new(ConstantBackoff {
                interval: duration.unwrap_or(DEFAULT_CONSTANT_INTERVAL),
                max_retries,
                retries: 0,
            }),
            RetryConfig::Exponential {
                initial_interval,
                randomization_factor,
                multiplier,
                max_interval,
                max_elapsed_time,
                max_retries,
            } => {
                let initial = initial_interval.unwrap_or(DEFAULT_INITIAL_INTERVAL);
                Box::new(ExponentialBackoff {
                    current: initial,
                    multiplier: multiplier.unwrap_or(DEFAULT_MULTIPLIER),
                    randomization_factor: randomization_factor
                        .unwrap_or(DEFAULT_RANDOMIZATION_FACTOR)
                        .clamp(0.0, 1.0),
                    max_interval: max_interval.unwrap_or(DEFAULT_MAX_INTERVAL),
                    max_elapsed_time: max_elapsed_time.filter(|d| !d.is_zero()),
                    max_retries,
                    retries: 0,
                    started: Instant::now(),
                })
            }
        }
    }
}

/// A retry schedule. `None` means give up.
pub trait Backoff: Send {
    fn next_backoff(&mut self) -> Option<Duration>;
}

pub struct ConstantBackoff {
    interval: Duration,
    max_retries: Option<u32>,
    retries: u32,
}

impl Backoff for ConstantBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.max_retries.is_some_and(|max| self.retries >= max) {
            return None;
        }
        self.retries += 1;
        Some(self.interval)
    }
}

/// Each delay is the current interval scaled by a random factor in
/// `[1 - randomization, 1 + randomization]`; the interval then grows by
/// `multiplier` up to `max_interval`.
pub struct ExponentialBackoff {
    current: Duration,
    multiplier: f64,
    randomization_factor: f64,
    max_interval: Duration,
    max_elapsed_time: Option<Duration>,
    max_retries: Option<u32>,
    retries: u32,
    started: Instant,
}

impl Backoff for ExponentialBackoff {
    fn next_backoff(&mut self) -> Option<Duration> {
        if self.max_retries.is_some_and(|max| self.retries >= max) {
            return None;
        }

        let delay = if self.randomization_factor > 0.0 {
            let delta = self.randomization_factor * self.current.as_secs_f64();
            let low = self.current.as_secs_f64() - delta;
            let high = self.current.as_secs_f64() + delta;
            Duration::from_secs_f64(rand::thread_rng().gen_range(low..=high))
        } else {
            self.current
        };

        if let Some(max_elapsed) = self.max_elapsed_time {
            if self.started.elapsed() + delay > max_elapsed {
                return None;
            }
        }

        self.retries += 1;
        let grown = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_interval);
        self.current = grown.min(self.max_interval);
        Some(delay)
    }
}

/// Runs `op` until it succeeds, the backoff gives up, the error is permanent,
/// or `ctx` is cancelled.
///
/// `notify` is called once per failed attempt that will be retried, with the
/// error and the delay before the next attempt. `recovered` is called once
/// when an attempt succeeds after at least one failure.
///
/// Errors are returned as produced, permanent marking included; callers that
/// own the retry boundary strip it with [`ExecutionError::into_inner`].
pub async fn notify_recover<F, Fut, T, N, R>(
    ctx: &Context,
    mut op: F,
    backoff: &mut dyn Backoff,
    mut notify: N,
    recovered: R,
) -> Result<T, ExecutionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ExecutionError>>,
    N: FnMut(&ExecutionError, Duration),
    R: FnOnce(),
{
    let mut failed = false;
    loop {
        let err = match op().await {
            Ok(value) => {
                if failed {
                    recovered();
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if err.is_permanent() || ctx.is_cancelled() {
            return Err(err);
        }
        let Some(delay) = backoff.next_backoff() else {
            return Err(err);
        };

        failed = true;
        notify(&err, delay);

        tokio::select! {
            _ = ctx.cancelled() => return Err(err),
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[tokio::test(start_paused = true)]
    async fn test_notify_recover_counts_notifications_and_recovery() {
        let config = RetryConfig::constant(Duration::from_millis(100), Some(2));
        let mut backoff = config.backoff();
        let attempts = Cell::new(0);
        let notified = Cell::new(0);
        let recovered = Cell::new(0);

        let result = notify_recover(
            &Context::new(),
            || {
                attempts.set(attempts.get() + 1);
                let attempt = attempts.get();
                async move {
                    if attempt <= 2 {
                        Err(ExecutionError::action("flaky"))
                    } else {
                        Ok(attempt)
                    }
                }
            },
            backoff.as_mut(),
            |_, delay| {
                assert_eq!(delay, Duration::from_millis(100));
                notified.set(notified.get() + 1);
            },
            || recovered.set(recovered.get() + 1),
        )
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(notified.get(), 2);
        assert_eq!(recovered.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_when_retries_are_exhausted() {
        let mut backoff = RetryConfig::constant(Duration::from_millis(10), Some(2)).backoff();
        let attempts = Cell::new(0);
        let recovered = Cell::new(false);

        let result: Result<(), _> = notify_recover(
            &Context::new(),
            || {
                attempts.set(attempts.get() + 1);
                async { Err(ExecutionError::action("down")) }
            },
            backoff.as_mut(),
            |_, _| {},
            || recovered.set(true),
        )
        .await;

        assert_eq!(result, Err(ExecutionError::action("down")));
        assert_eq!(attempts.get(), 3);
        assert!(!recovered.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_aborts_immediately() {
        let mut backoff = RetryConfig::constant(Duration::from_millis(10), None).backoff();
        let attempts = Cell::new(0);

        let result: Result<(), _> = notify_recover(
            &Context::new(),
            || {
                attempts.set(attempts.get() + 1);
                async { Err(ExecutionError::permanent(ExecutionError::action("bad input"))) }
            },
            backoff.as_mut(),
            |_, _| panic!("permanent errors are not retried"),
            || {},
        )
        .await;

        assert!(result.unwrap_err().is_permanent());
        assert_eq!(attempts.get(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_interrupts_backoff_wait() {
        let ctx = Context::new();
        let mut backoff = RetryConfig::constant(Duration::from_secs(3600), None).backoff();
        let canceller = ctx.clone();
        let attempts = Cell::new(0);

        let result: Result<(), _> = notify_recover(
            &ctx,
            || {
                attempts.set(attempts.get() + 1);
                async { Err(ExecutionError::action("down")) }
            },
            backoff.as_mut(),
            |_, _| canceller.cancel(),
            || {},
        )
        .await;

        assert_eq!(result, Err(ExecutionError::action("down")));
        assert_eq!(attempts.get(), 1);
    }

    #[test]
    fn test_exponential_backoff_grows_and_caps() {
        let config = RetryConfig::Exponential {
            initial_interval: Some(Duration::from_millis(100)),
            randomization_factor: Some(0.0),
            multiplier: Some(2.0),
            max_interval: Some(Duration::from_millis(350)),
            max_elapsed_time: None,
            max_retries: Some(4),
        };
        let mut backoff = config.backoff();

        let delays: Vec<_> = std::iter::from_fn(|| backoff.next_backoff()).collect();
        assert_eq!(
            delays,
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(350),
                Duration::from_millis(350),
            ]
        );
    }

    #[test]
    fn test_exponential_jitter_stays_in_bounds() {
        let config = RetryConfig::Exponential {
            initial_interval: Some(Duration::from_millis(1000)),
            randomization_factor: Some(0.5),
            multiplier: Some(1.0),
            max_interval: None,
            max_elapsed_time: None,
            max_retries: None,
        };
        let mut backoff = config.backoff();
        for _ in 0..50 {
            let delay = backoff.next_backoff().unwrap();
            assert!(delay >= Duration::from_millis(500) && delay <= Duration::from_millis(1500));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exponential_gives_up_after_max_elapsed_time() {
        let config = RetryConfig::Exponential {
            initial_interval: Some(Duration::from_millis(100)),
            randomization_factor: Some(0.0),
            multiplier: Some(2.0),
            max_interval: Some(Duration::from_secs(60)),
            max_elapsed_time: Some(Duration::from_secs(1)),
            max_retries: None,
        };
        let mut backoff = config.backoff();
        let attempts = Cell::new(0);
        let delays = std::cell::RefCell::new(Vec::new());
        let started = Instant::now();

        let result: Result<(), _> = notify_recover(
            &Context::new(),
            || {
                attempts.set(attempts.get() + 1);
                async { Err(ExecutionError::action("down")) }
            },
            backoff.as_mut(),
            |_, delay| delays.borrow_mut().push(delay),
            || {},
        )
        .await;

        // 100ms + 200ms + 400ms fit in the budget; the next 800ms would not
        assert_eq!(result, Err(ExecutionError::action("down")));
        assert_eq!(attempts.get(), 4);
        assert_eq!(
            delays.into_inner(),
            vec![
                Duration::from_millis(100),
                Duration::from_millis(200),
                Duration::from_millis(400),
            ]
        );
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_retry_config_from_yaml() {
        let yaml = r#"
events:
  policy: constant
  duration: 100ms
  maxRetries: 3
database:
  policy: exponential
  initialInterval: 50ms
  maxInterval: 2s
  maxElapsedTime: 30s
"#;
        let configs: std::collections::HashMap<String, RetryConfig> =
            serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            configs["events"],
            RetryConfig::constant(Duration::from_millis(100), Some(3))
        );
        assert_eq!(
            configs["database"],
            RetryConfig::Exponential {
                initial_interval: Some(Duration::from_millis(50)),
                randomization_factor: None,
                multiplier: None,
                max_interval: Some(Duration::from_secs(2)),
                max_elapsed_time: Some(Duration::from_secs(30)),
                max_retries: None,
            }
        );
    }
}
