use anyhow::Result;
use async_trait::async_trait;

/// Source of corpus documents (content-type corpora and the global
/// lexicon). HTTP in production; tests inject an in-memory map.
#[async_trait]
pub trait CorpusSource: Send + Sync {
    async fn fetch(&self, locator: &str) -> Result<serde_json::Value>;
}

/// Receiver for the run's human-readable trace lines.
///
/// Emission failures are swallowed by the pipeline: a broken sink must
/// never abort a run.
pub trait LogSink: Send + Sync {
    fn emit(&self, line: &str) -> Result<()>;
}
