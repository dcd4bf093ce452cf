//! Text-generation client for OpenAI-compatible chat endpoints.
//!
//! The rest of the workspace talks to the model through the [`TextGenerator`]
//! trait, so tests can substitute scripted generators. The concrete
//! [`OpenAiGenerator`] throttles outbound calls through a shared
//! [`RateLimiter`] and retries exactly once on HTTP 429.

mod error;
mod limiter;
mod openai;
mod reply;
mod traits;

pub use error::GenerateError;
pub use limiter::RateLimiter;
pub use openai::OpenAiGenerator;
pub use reply::{normalize_reply, CriticReply};
pub use traits::{Generation, GenerationRequest, TextGenerator};
