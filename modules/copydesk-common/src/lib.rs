//! Shared types for the copydesk pipeline: content types, request
//! parameters, scoring results, run reports, and the error taxonomy.

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::PipelineError;
pub use types::{
    Attempt, AttemptKind, ContentType, PipelineReport, RequestParams, RunEvent, RunOutcome,
    ScoreBreakdown, TraitWeights, TrsResult, UnknownContentType, Verdict, CRITIC_MAX, LEXICON_MAX,
    RULES_MAX,
};
