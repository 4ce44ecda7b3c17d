//! Structured problem and test-case generation on top of a hosted
//! generative-language API.
//!
//! The only failure-recovery policy in the system lives in [`retry`]:
//! rate-limited calls back off exponentially up to a fixed attempt cap,
//! every other failure surfaces immediately.

pub mod gemini;
pub mod normalize;
pub mod prompts;
pub mod retry;

pub use gemini::{GeminiClient, GeminiConfig, GenerationError};
pub use retry::{Backoff, Retryable, retry_with_backoff};
