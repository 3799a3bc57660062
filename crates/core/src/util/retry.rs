//! Exponential backoff with jitter for coroutine-level retries.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;

/// Knobs for [`retry_with_backoff`].
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub base_backoff: Duration,
    pub jitter: Option<Duration>,
    pub max_backoff: Option<Duration>,
    /// `None` retries forever.
    pub max_tries: Option<u32>,
    pub log_level: log::Level,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_backoff: Duration::from_millis(100),
            jitter: Some(Duration::from_millis(10)),
            max_backoff: Some(Duration::from_secs(60)),
            max_tries: None,
            log_level: log::Level::Warn,
        }
    }
}

/// Delay before the next attempt after `try_num` failed tries:
/// `max(base, min(max_backoff, base * 2^try_num + uniform(-jitter, +jitter)))`.
fn backoff_delay(config: &RetryConfig, try_num: u32) -> Duration {
    let base = config.base_backoff.as_millis() as i64;
    let exp = base.saturating_mul(2i64.saturating_pow(try_num));
    let jitter = match config.jitter.map(|j| j.as_millis() as i64) {
        Some(j) if j > 0 => rand::rng().random_range(-j..=j),
        _ => 0,
    };
    let mut delay = exp.saturating_add(jitter);
    if let Some(max) = config.max_backoff {
        delay = delay.min(max.as_millis() as i64);
    }
    Duration::from_millis(delay.max(base) as u64)
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or exhausts
/// `max_tries`. After each retryable failure the optional `on_failure` hook
/// is awaited before sleeping; the hook is meant for user-visible
/// notifications only.
pub async fn retry_with_backoff<T, E, Op, Fut, Retryable, Hook, HookFut>(
    config: &RetryConfig,
    mut op: Op,
    is_retryable: Retryable,
    on_failure: Option<Hook>,
) -> Result<T, E>
where
    E: Display,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    Retryable: Fn(&E) -> bool,
    Hook: Fn(&E) -> HookFut,
    HookFut: Future<Output = ()>,
{
    let mut try_num: u32 = 0;
    loop {
        try_num += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if is_retryable(&err) => {
                if config.max_tries.is_some_and(|max| try_num >= max) {
                    return Err(err);
                }
                let delay = backoff_delay(config, try_num);
                log::log!(
                    config.log_level,
                    "attempt {try_num} failed ({err}), retrying in {delay:?}"
                );
                if let Some(hook) = &on_failure {
                    hook(&err).await;
                }
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}
