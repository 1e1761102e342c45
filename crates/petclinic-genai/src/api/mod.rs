//! HTTP client support shared by the chat-engine and embedding clients.
//!
//! - [`retry`]: transient error detection (429, 5xx, network timeouts) with
//!   configurable exponential backoff and jitter. Never retries 400/401 errors.

pub mod retry;

pub use retry::{RetryConfig, retry_api_call};
