//! One-shot pipeline runner: drafts a piece of copy for the given content
//! type and parameters, streaming the run trace to stderr and printing the
//! final text to stdout.
//!
//!     copydesk microcopy -p ui_context=button -p intent=pay
//!     copydesk internal_comms -p channel=Slack -p title="Office closed" \
//!         -p key_update="Building maintenance Friday"

use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ai_client::{OpenAiGenerator, RateLimiter};
use copydesk_common::{Config, ContentType, RequestParams, RunEvent};
use copydesk_engine::{HttpCorpusSource, LogSink, Pipeline, RunLimits};

#[derive(Parser)]
#[command(name = "copydesk", about = "Draft short-form brand copy with trust scoring")]
struct Args {
    /// Content type: microcopy, internal_comms, or press_release
    content_type: String,

    /// Request fields as KEY=VALUE (repeatable)
    #[arg(short = 'p', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Log full prompts and the selected references
    #[arg(long)]
    verbose: bool,
}

/// Streams trace lines to stderr so stdout stays clean for the result.
struct StderrSink;

impl LogSink for StderrSink {
    fn emit(&self, line: &str) -> Result<()> {
        eprintln!("{line}");
        Ok(())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("copydesk=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let content_type =
        ContentType::from_str(&args.content_type).map_err(|e| anyhow!(e.to_string()))?;

    let mut params = RequestParams::new();
    for pair in &args.params {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("--param expects KEY=VALUE, got: {pair}"))?;
        params.set(key.trim(), value.trim());
    }

    let config = Config::from_env();

    // One limiter for the whole process: generation and critic calls share
    // the same spacing floor.
    let limiter = Arc::new(RateLimiter::new(config.min_interval));
    let generator = Arc::new(OpenAiGenerator::new(
        config.endpoint.clone(),
        config.model.clone(),
        limiter,
    ));
    let corpus = Arc::new(HttpCorpusSource::new(
        config.corpus_base_url.clone().unwrap_or_default(),
    ));

    let pipeline = Pipeline::new(generator, corpus)
        .with_limits(RunLimits::from(&config))
        .with_verbose(args.verbose);

    let report = pipeline.run(content_type, params, Some(&StderrSink)).await;

    // Flattened record for the external event store to ingest verbatim.
    let event = RunEvent::from_report(&report);
    info!(event = %serde_json::to_string(&event)?, "run recorded");

    match report.error() {
        None => {
            if let Some(scoring) = report.scoring() {
                eprintln!(
                    "TRS {} — rules {}/40, lexicon {}/20, critic {}/40 ({})",
                    scoring.trs,
                    scoring.breakdown.rules,
                    scoring.breakdown.lexicon,
                    scoring.breakdown.critic,
                    scoring.verdict.tag()
                );
            }
            println!("{}", report.result_text().unwrap_or_default());
            Ok(())
        }
        Some(error) => Err(anyhow!(error.to_string())),
    }
}
