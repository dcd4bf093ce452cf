use thiserror::Error;

/// Terminal failures for a pipeline run.
///
/// Everything else (corpus load failure, missing references, critic parse
/// trouble, low scores) degrades in place and shows up only in trace lines
/// or score detail strings.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// Required fields missing after normalization. No generation call is
    /// made.
    #[error("missing required fields: {}", .0.join(", "))]
    Validation(Vec<String>),

    /// The generation client failed while producing a candidate.
    #[error("generation failed at attempt #{attempt}: {reason}")]
    Transport { attempt: u32, reason: String },

    /// The critic call failed while scoring a candidate. Distinguished
    /// from `Transport` in messaging.
    #[error("critic scoring failed at attempt #{attempt}: {reason}")]
    Scoring { attempt: u32, reason: String },
}
