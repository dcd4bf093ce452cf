//! Scenario tests for the full pipeline: scripted generator, in-memory
//! corpus, no network. Covers validation short-circuits, verdict
//! boundaries, the revise loop's caps and best-candidate rule, and
//! degraded corpus mode.
//!
//! Run with: cargo test -p copydesk-engine --test pipeline_test

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use ai_client::{GenerateError, Generation, GenerationRequest, TextGenerator};
use copydesk_common::{ContentType, PipelineError, RequestParams, Verdict};
use copydesk_engine::{CorpusSource, LogSink, Pipeline, RunLimits};

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

/// Scripted generator. Critic calls are recognized by their system prompt;
/// each script repeats its last entry once exhausted.
struct ScriptedGenerator {
    gen_replies: Mutex<VecDeque<String>>,
    critic_replies: Mutex<VecDeque<String>>,
    gen_calls: AtomicU32,
    critic_calls: AtomicU32,
    fail_generation: bool,
    fail_critic: bool,
}

impl ScriptedGenerator {
    fn new(gen: &[&str], critic: &[&str]) -> Self {
        Self {
            gen_replies: Mutex::new(gen.iter().map(|s| s.to_string()).collect()),
            critic_replies: Mutex::new(critic.iter().map(|s| s.to_string()).collect()),
            gen_calls: AtomicU32::new(0),
            critic_calls: AtomicU32::new(0),
            fail_generation: false,
            fail_critic: false,
        }
    }

    fn failing_generation() -> Self {
        let mut stub = Self::new(&[], &[]);
        stub.fail_generation = true;
        stub
    }

    fn failing_critic(gen: &[&str]) -> Self {
        let mut stub = Self::new(gen, &[]);
        stub.fail_critic = true;
        stub
    }

    fn next(queue: &Mutex<VecDeque<String>>) -> String {
        let mut q = queue.lock().unwrap();
        if q.len() > 1 {
            q.pop_front().unwrap()
        } else {
            q.front().cloned().unwrap_or_default()
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, GenerateError> {
        let is_critic = request.system.contains("rigorous writing critic");

        if is_critic {
            self.critic_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_critic {
                return Err(GenerateError::Http {
                    status: 500,
                    body: "critic down".into(),
                });
            }
            return Ok(Generation {
                text: Self::next(&self.critic_replies),
                latency: std::time::Duration::from_millis(5),
            });
        }

        self.gen_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_generation {
            return Err(GenerateError::Network("connection refused".into()));
        }
        Ok(Generation {
            text: Self::next(&self.gen_replies),
            latency: std::time::Duration::from_millis(10),
        })
    }
}

/// In-memory corpus keyed by locator.
struct StaticCorpus {
    docs: HashMap<String, serde_json::Value>,
}

impl StaticCorpus {
    fn microcopy() -> Self {
        let mut docs = HashMap::new();
        docs.insert(
            "corpus/microcopy_corpus.json".to_string(),
            serde_json::json!({
                "content_type": "microcopy",
                "examples": [
                    {"id": "mc-001", "ui_context": "button", "intent": "pay", "text": "Pay now"},
                    {"id": "mc-002", "ui_context": "button", "intent": "close", "text": "Got it"},
                    {"id": "mc-003", "ui_context": "tooltip", "intent": "help", "text": "Your policy covers this."}
                ],
                "preferred_lexicon": ["pay now"]
            }),
        );
        docs.insert(
            "corpus/lexicon_global.json".to_string(),
            serde_json::json!({"preferred": ["heads up"], "banned": ["synergy"]}),
        );
        Self { docs }
    }

    fn empty() -> Self {
        Self {
            docs: HashMap::new(),
        }
    }
}

#[async_trait]
impl CorpusSource for StaticCorpus {
    async fn fetch(&self, locator: &str) -> Result<serde_json::Value> {
        self.docs
            .get(locator)
            .cloned()
            .ok_or_else(|| anyhow!("document not found: {locator}"))
    }
}

fn pipeline(generator: ScriptedGenerator) -> (Pipeline, Arc<ScriptedGenerator>) {
    let generator = Arc::new(generator);
    let pipeline = Pipeline::new(generator.clone(), Arc::new(StaticCorpus::microcopy()));
    (pipeline, generator)
}

fn button_params() -> RequestParams {
    RequestParams::from_pairs([("uiContext", "button"), ("intent", "pay")])
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_required_fields_stop_before_any_generation() {
    let (pipeline, generator) = pipeline(ScriptedGenerator::new(&["x"], &[r#"{"score": 30}"#]));
    let params = RequestParams::from_pairs([("channel", "Slack")]);

    let report = pipeline
        .run(ContentType::InternalComms, params, None)
        .await;

    assert!(!report.ok());
    match report.error() {
        Some(PipelineError::Validation(missing)) => {
            // Locale is defaulted during normalization, so exactly these two.
            assert_eq!(missing, &vec!["title".to_string(), "key_update".to_string()]);
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(generator.gen_calls.load(Ordering::SeqCst), 0);
    assert_eq!(generator.critic_calls.load(Ordering::SeqCst), 0);
    assert!(report.attempts.is_empty());
}

// ---------------------------------------------------------------------------
// Scoring and verdicts
// ---------------------------------------------------------------------------

/// "Pay now" earns full rules (40) and full lexicon (20) for a pay-intent
/// button, so the critic score alone positions the total against the
/// 80/72 thresholds.
#[tokio::test]
async fn verdict_boundaries_sit_exactly_on_thresholds() {
    // critic 20 -> trs 80 -> pass
    let (p, _) = pipeline(ScriptedGenerator::new(&["Pay now"], &[r#"{"score": 20}"#]));
    let report = p.run(ContentType::Microcopy, button_params(), None).await;
    let scoring = report.scoring().unwrap();
    assert_eq!(scoring.trs, 80);
    assert_eq!(scoring.verdict, Verdict::Pass);

    // critic 19 -> trs 79 -> borderline (cap the loop to keep it short)
    let (p, _) = pipeline(ScriptedGenerator::new(&["Pay now"], &[r#"{"score": 19}"#]));
    let p = p.with_limits(RunLimits {
        max_attempts: 2,
        ..RunLimits::default()
    });
    let report = p.run(ContentType::Microcopy, button_params(), None).await;
    let scoring = report.scoring().unwrap();
    assert_eq!(scoring.trs, 79);
    assert_eq!(scoring.verdict, Verdict::Borderline);

    // critic 11 -> trs 71 -> fail
    let (p, _) = pipeline(ScriptedGenerator::new(&["Pay now"], &[r#"{"score": 11}"#]));
    let p = p.with_limits(RunLimits {
        max_attempts: 2,
        ..RunLimits::default()
    });
    let report = p.run(ContentType::Microcopy, button_params(), None).await;
    let scoring = report.scoring().unwrap();
    assert_eq!(scoring.trs, 71);
    assert_eq!(scoring.verdict, Verdict::Fail);
}

#[tokio::test]
async fn breakdown_always_sums_to_the_reported_trs() {
    let (p, _) = pipeline(ScriptedGenerator::new(
        &["Pay Now Instantly Please"],
        &[r#"{"score": 23, "detail": "fine"}"#],
    ));
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    let scoring = report.scoring().unwrap();
    let b = &scoring.breakdown;
    assert_eq!(scoring.trs, (b.rules + b.lexicon + b.critic).min(100));
    assert!(b.rules <= 40 && b.lexicon <= 20 && b.critic <= 40);

    // Four words: under the button cap, shaped text unchanged.
    assert_eq!(report.result_text(), Some("Pay Now Instantly Please"));
}

#[tokio::test]
async fn first_attempt_pass_stops_immediately() {
    let (p, generator) = pipeline(ScriptedGenerator::new(&["Pay now"], &[r#"{"score": 35}"#]));
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    assert!(report.ok());
    assert_eq!(report.attempts.len(), 1);
    assert_eq!(generator.gen_calls.load(Ordering::SeqCst), 1);
    assert_eq!(generator.critic_calls.load(Ordering::SeqCst), 1);
}

// ---------------------------------------------------------------------------
// Revise loop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn borderline_keeps_revising_until_pass() {
    // Attempt 1 lands at 79 (borderline), attempt 2 at 80 (pass).
    let (p, _) = pipeline(ScriptedGenerator::new(
        &["Pay now"],
        &[r#"{"score": 19}"#, r#"{"score": 20}"#],
    ));
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    assert_eq!(report.attempts.len(), 2);
    let scoring = report.scoring().unwrap();
    assert_eq!(scoring.verdict, Verdict::Pass);
    assert_eq!(scoring.trs, 80);
}

#[tokio::test]
async fn unreachable_pass_terminates_at_the_attempt_cap_keeping_the_best() {
    // Attempt 2 produces the strongest candidate; later attempts are worse.
    // The critic never scores high enough to pass.
    let (p, generator) = pipeline(ScriptedGenerator::new(
        &[
            "Send money please",
            "Pay now",
            "Send money please",
            "Send money please",
            "Send money please",
            "Send money please",
        ],
        &[r#"{"score": 5}"#],
    ));
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    assert!(report.ok());
    assert_eq!(report.attempts.len(), 6);
    assert_eq!(generator.gen_calls.load(Ordering::SeqCst), 6);

    // The delivered candidate is the highest-TRS one, not the last.
    assert_eq!(report.result_text(), Some("Pay now"));
    let best_trs = report.scoring().unwrap().trs;
    assert!(report.attempts.iter().all(|a| a.trs <= best_trs));
    assert_eq!(report.scoring().unwrap().verdict, Verdict::Fail);
}

#[tokio::test]
async fn tied_revision_keeps_the_earlier_candidate() {
    let (p, _) = pipeline(ScriptedGenerator::new(
        &["Pay now", "Pay today"],
        &[r#"{"score": 19}"#],
    ));
    let p = p.with_limits(RunLimits {
        max_attempts: 2,
        ..RunLimits::default()
    });
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    // Both candidates score identically; the first one is kept.
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.result_text(), Some("Pay now"));
}

// ---------------------------------------------------------------------------
// Failures and degradation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_failure_is_terminal_with_attempt_index() {
    let (p, _) = pipeline(ScriptedGenerator::failing_generation());
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    assert!(!report.ok());
    match report.error() {
        Some(PipelineError::Transport { attempt, reason }) => {
            assert_eq!(*attempt, 1);
            assert!(reason.contains("connection refused"));
        }
        other => panic!("expected transport error, got {other:?}"),
    }
}

#[tokio::test]
async fn critic_failure_is_terminal_and_distinct_from_transport() {
    let (p, _) = pipeline(ScriptedGenerator::failing_critic(&["Pay now"]));
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    assert!(!report.ok());
    assert!(matches!(
        report.error(),
        Some(PipelineError::Scoring { attempt: 1, .. })
    ));
}

#[tokio::test]
async fn corpus_failure_degrades_instead_of_aborting() {
    let generator = Arc::new(ScriptedGenerator::new(&["Pay now"], &[r#"{"score": 30}"#]));
    let pipeline = Pipeline::new(generator, Arc::new(StaticCorpus::empty()));

    let report = pipeline
        .run(ContentType::Microcopy, button_params(), None)
        .await;

    assert!(report.ok());
    assert!(report.log.iter().any(|l| l.contains("Corpus degraded")));
}

#[tokio::test]
async fn unparseable_critic_reply_degrades_to_conservative_score() {
    let (p, _) = pipeline(ScriptedGenerator::new(
        &["Pay now"],
        &["I cannot rate this."],
    ));
    let p = p.with_limits(RunLimits {
        max_attempts: 1,
        ..RunLimits::default()
    });
    let report = p.run(ContentType::Microcopy, button_params(), None).await;

    assert!(report.ok());
    let scoring = report.scoring().unwrap();
    assert_eq!(scoring.breakdown.critic, 12);
    assert_eq!(scoring.breakdown.critic_detail, "critic_json_parse_error");
}

// ---------------------------------------------------------------------------
// Log sink
// ---------------------------------------------------------------------------

struct BrokenSink;

impl LogSink for BrokenSink {
    fn emit(&self, _line: &str) -> Result<()> {
        Err(anyhow!("sink is on fire"))
    }
}

#[tokio::test]
async fn broken_log_sink_never_aborts_the_run() {
    let (p, _) = pipeline(ScriptedGenerator::new(&["Pay now"], &[r#"{"score": 35}"#]));
    let report = p
        .run(ContentType::Microcopy, button_params(), Some(&BrokenSink))
        .await;

    assert!(report.ok());
    // The report log still has every line even though the sink failed.
    assert!(report.log.iter().any(|l| l.contains("Policy loaded")));
}
