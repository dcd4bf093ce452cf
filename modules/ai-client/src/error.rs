use thiserror::Error;

/// Typed failure reasons for a generation call.
///
/// `NoEndpoint`/`NoModel` fire at call time rather than construction time, so
/// a partially configured client can exist but every call reports why it
/// cannot succeed.
#[derive(Error, Debug, Clone)]
pub enum GenerateError {
    #[error("no generation endpoint configured")]
    NoEndpoint,

    #[error("no model configured")]
    NoModel,

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("empty response from model")]
    EmptyResponse,
}
