//! Retry with exponential backoff for the chat and embedding endpoints.
//!
//! Both HTTP engines report failures as strings of the form
//! `"<api> HTTP <status>: <body>"` or `"request failed: <reason>"`.
//! [`classify_error`] reads the status code (or the network failure) out of
//! that string, and [`retry_api_call`] re-runs only the transient ones.
//! The tool dispatcher never retries.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

/// Backoff settings for one HTTP engine.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt. `0` fails on the first error.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// Shorten each delay by a deterministic per-attempt factor so parallel
    /// embedding batches do not retry in lockstep.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn with_retries(retries: u32) -> Self {
        Self {
            max_retries: retries,
            ..Default::default()
        }
    }

    pub fn with_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.initial_delay = initial;
        self.max_delay = max;
        self
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        let capped = base.min(self.max_delay.as_secs_f64());
        if self.jitter {
            // Cycles through 0.6, 0.7, 0.8, 0.9.
            let factor = 0.6 + 0.1 * f64::from(attempt % 4);
            Duration::from_secs_f64(capped * factor)
        } else {
            Duration::from_secs_f64(capped)
        }
    }
}

/// How an engine failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate limiting, server errors, dropped connections. Worth retrying.
    Transient,
    /// Bad request, auth, missing model. Retrying cannot help.
    Permanent,
    /// Anything else (e.g. an unparseable response body). Not retried.
    Unknown,
}

const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];
const PERMANENT_STATUSES: [u16; 5] = [400, 401, 403, 404, 422];

/// Status code from an `"... HTTP <code> ..."` error string.
pub fn http_status(error: &str) -> Option<u16> {
    let (_, rest) = error.split_once("HTTP ")?;
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

pub fn classify_error(error: &str) -> ErrorClass {
    if let Some(status) = http_status(error) {
        if TRANSIENT_STATUSES.contains(&status) {
            return ErrorClass::Transient;
        }
        if PERMANENT_STATUSES.contains(&status) {
            return ErrorClass::Permanent;
        }
        return ErrorClass::Unknown;
    }

    let lower = error.to_lowercase();
    let network = [
        "request failed:",
        "connection reset",
        "connection refused",
        "timed out",
        "broken pipe",
    ];
    if network.iter().any(|p| lower.contains(p)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Unknown
    }
}

pub fn is_transient_error(error: &str) -> bool {
    classify_error(error) == ErrorClass::Transient
}

pub fn is_permanent_error(error: &str) -> bool {
    classify_error(error) == ErrorClass::Permanent
}

/// Run `call`, retrying transient failures up to `config.max_retries` times.
///
/// `api` names the endpoint in log lines (`"chat"`, `"embeddings"`). The
/// last error is returned unchanged.
pub async fn retry_api_call<T, F, Fut>(
    api: &str,
    config: &RetryConfig,
    mut call: F,
) -> Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, String>>,
{
    let mut attempt = 0;
    loop {
        let error = match call().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        let class = classify_error(&error);
        if class != ErrorClass::Transient || attempt >= config.max_retries {
            debug!("{api} call failed ({class:?}) after {} attempt(s)", attempt + 1);
            return Err(error);
        }
        let delay = config.delay_for_attempt(attempt);
        attempt += 1;
        warn!(
            "{api} call failed, retry {attempt}/{} in {delay:?}: {error}",
            config.max_retries
        );
        tokio::time::sleep(delay).await;
    }
}
