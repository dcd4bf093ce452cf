//! The copydesk drafting engine: policy registry, reference-corpus
//! selection, prompt construction, output shaping, guardrail scoring, and
//! the generate-score-revise orchestrator.
//!
//! The engine talks to the outside world through three seams: the
//! [`ai_client::TextGenerator`] it drafts and critiques with, the
//! [`CorpusSource`] it loads voice references from, and an optional
//! [`LogSink`] that receives the human-readable run trace.

pub mod corpus;
pub mod guardrail;
pub mod normalize;
pub mod pipeline;
pub mod policy;
pub mod prompt;
pub mod shape;
pub mod strategy;
pub mod text;
pub mod traits;

pub use corpus::{CorpusPack, Example, HttpCorpusSource};
pub use pipeline::{Pipeline, RunLimits};
pub use traits::{CorpusSource, LogSink};
