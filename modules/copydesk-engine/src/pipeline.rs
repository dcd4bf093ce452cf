//! The pipeline orchestrator: normalize -> validate -> corpus -> generate
//! -> shape -> score, then revise until the verdict passes or the attempt
//! and wall-clock budgets run out, always keeping the best candidate seen.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use ai_client::{GenerationRequest, TextGenerator};
use copydesk_common::{
    Attempt, AttemptKind, Config, ContentType, PipelineError, PipelineReport, RequestParams,
    RunOutcome, TrsResult, Verdict, CRITIC_MAX, LEXICON_MAX, RULES_MAX,
};

use crate::corpus::{derive_lexicon_from_refs, load_corpus_with_lexicon, pick_refs};
use crate::guardrail;
use crate::normalize::normalize;
use crate::policy::{intent_vocab, policy_for, traits_for, validate_required, Policy};
use crate::prompt::{build_generate, build_revise, Prompt, PromptInputs};
use crate::shape::shape_output;
use crate::strategy::{strategy_for, ContentStrategy};
use crate::text::snippet;
use crate::traits::{CorpusSource, LogSink};

const DERIVED_LEXICON_MAX: usize = 12;
const PROMPT_SNIPPET_LEN: usize = 220;
const GENERATION_TEMPERATURE: f32 = 0.3;

/// Revision budget: total attempts (initial included) and wall clock,
/// whichever trips first. The clock is only checked at loop entry, so one
/// in-flight call is always allowed to finish.
#[derive(Debug, Clone, Copy)]
pub struct RunLimits {
    pub max_attempts: u32,
    pub wall_clock: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            wall_clock: Duration::from_secs(45),
        }
    }
}

impl From<&Config> for RunLimits {
    fn from(config: &Config) -> Self {
        Self {
            max_attempts: config.max_attempts,
            wall_clock: config.wall_clock_budget,
        }
    }
}

/// Best candidate so far, replaced only on strictly greater TRS so ties
/// keep the earlier (usually more deterministic) text.
struct BestCandidate {
    text: String,
    scoring: TrsResult,
}

impl BestCandidate {
    fn challenge(self, text: String, scoring: TrsResult) -> (Self, bool) {
        if scoring.trs > self.scoring.trs {
            (Self { text, scoring }, true)
        } else {
            (self, false)
        }
    }
}

/// Trace collector: every line lands in the report log and, best effort,
/// in the caller's sink. A failing sink never aborts the run.
struct Trace<'a> {
    lines: Vec<String>,
    sink: Option<&'a dyn LogSink>,
}

impl<'a> Trace<'a> {
    fn new(sink: Option<&'a dyn LogSink>) -> Self {
        Self {
            lines: Vec::new(),
            sink,
        }
    }

    fn push(&mut self, line: impl Into<String>) {
        let line = line.into();
        if let Some(sink) = self.sink {
            if let Err(e) = sink.emit(&line) {
                debug!(error = %e, "log sink emit failed");
            }
        }
        self.lines.push(line);
    }
}

pub struct Pipeline {
    generator: Arc<dyn TextGenerator>,
    corpus: Arc<dyn CorpusSource>,
    limits: RunLimits,
    verbose: bool,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, corpus: Arc<dyn CorpusSource>) -> Self {
        Self {
            generator,
            corpus,
            limits: RunLimits::default(),
            verbose: false,
        }
    }

    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Log full prompts and the selected references instead of snippets.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Run the whole pipeline for one request. Owns `params` exclusively;
    /// trace lines stream to `sink` as they happen.
    pub async fn run(
        &self,
        content_type: ContentType,
        mut params: RequestParams,
        sink: Option<&dyn LogSink>,
    ) -> PipelineReport {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let mut trace = Trace::new(sink);
        let mut attempts: Vec<Attempt> = Vec::new();

        info!(%run_id, content_type = %content_type, "pipeline run started");

        let outcome = self
            .drive(content_type, &mut params, &mut trace, &mut attempts, started)
            .await;

        let duration = started.elapsed();
        match &outcome {
            RunOutcome::Delivered { scoring, .. } => {
                trace.push(format!(
                    "Finished in {}ms ({}).",
                    duration.as_millis(),
                    scoring.verdict.tag()
                ));
            }
            RunOutcome::Failed(error) => {
                warn!(%run_id, %error, "pipeline run failed");
            }
        }

        PipelineReport {
            run_id,
            content_type,
            log: trace.lines,
            attempts,
            duration,
            outcome,
        }
    }

    async fn drive(
        &self,
        content_type: ContentType,
        params: &mut RequestParams,
        trace: &mut Trace<'_>,
        attempts: &mut Vec<Attempt>,
        started: Instant,
    ) -> RunOutcome {
        let strategy = strategy_for(content_type);

        // Normalize before the required-field check so aliases and defaults
        // can satisfy it.
        normalize(content_type, params, &mut |line| trace.push(line));

        let policy = policy_for(content_type);
        trace.push(format!(
            "Policy loaded for {} — required=[{}], thresholds pass>={} / border>={}",
            content_type.label(),
            policy.required.join(", "),
            policy.thresholds.pass,
            policy.thresholds.borderline
        ));

        if let Err(missing) = validate_required(&policy, params) {
            trace.push(format!("Missing required: {}", missing.join(", ")));
            return RunOutcome::Failed(PipelineError::Validation(missing));
        }
        trace.push("Required fields OK.");

        // Corpus, references, merged lexicon.
        let traits = traits_for(content_type, params);
        let pack = load_corpus_with_lexicon(&*self.corpus, &policy).await;
        if let Some(reason) = &pack.error {
            warn!(%reason, "corpus load degraded");
            trace.push(format!("Corpus degraded: {reason}"));
        }

        let refs = pick_refs(&pack, policy.corpus.match_on, params, policy.corpus.refs);
        let intent = params
            .get("intent_canonical")
            .or_else(|| params.get("intent"));
        let vocab = intent_vocab(&policy, intent);

        let mut preferred = merge_phrases(&pack.preferred_lexicon, vocab.preferred);
        let banned = merge_phrases(&pack.banned_lexicon, vocab.banned);
        if preferred.is_empty() {
            preferred = derive_lexicon_from_refs(&refs, DERIVED_LEXICON_MAX);
            if !preferred.is_empty() {
                trace.push(format!(
                    "Derived {} anchor phrases from references.",
                    preferred.len()
                ));
            }
        }

        trace.push(format!(
            "Picked {} on-voice refs (match on: {}).",
            refs.len(),
            if policy.corpus.match_on.is_empty() {
                "—".to_string()
            } else {
                policy.corpus.match_on.join(", ")
            }
        ));
        trace.push(format!(
            "Lexicon merged — preferred {}, banned {}.",
            preferred.len(),
            banned.len()
        ));
        trace.push(format!("Traits: {}", traits.compact()));
        if self.verbose && !refs.is_empty() {
            let listing: Vec<String> = refs
                .iter()
                .enumerate()
                .map(|(i, r)| format!("  • {} — {}", r.label(i), snippet(r.display_text(), 160)))
                .collect();
            trace.push(format!("Refs selected:\n{}", listing.join("\n")));
        }

        let inputs = PromptInputs {
            content_type,
            traits,
            params,
            refs: &refs,
            preferred: &preferred,
            banned: &banned,
        };

        // Attempt 1.
        let prompt = build_generate(&inputs);
        self.trace_prompt(trace, 1, &prompt);
        trace.push("Generating (attempt #1)...");

        let candidate = match self.attempt(strategy, &inputs, &policy, &prompt, 1, trace).await {
            Ok(c) => c,
            Err(e) => return RunOutcome::Failed(e),
        };
        attempts.push(Attempt {
            kind: AttemptKind::Initial,
            trs: candidate.scoring.trs,
            verdict: candidate.scoring.verdict,
            latency: candidate.latency,
        });

        let mut best = BestCandidate {
            text: candidate.text,
            scoring: candidate.scoring,
        };

        // Revise until pass, or until either cap trips. Borderline keeps
        // revising.
        while best.scoring.verdict != Verdict::Pass {
            if attempts.len() as u32 >= self.limits.max_attempts {
                trace.push(format!("Stopped after {} attempts (cap).", attempts.len()));
                break;
            }
            if started.elapsed() >= self.limits.wall_clock {
                trace.push("Stopped: wall-clock budget exhausted.");
                break;
            }

            let attempt_no = attempts.len() as u32 + 1;
            let fixes = make_fixes(strategy, params, &best.scoring, &preferred);
            let prompt = build_revise(&inputs, &best.text, &fixes);
            self.trace_prompt(trace, attempt_no, &prompt);
            trace.push(format!(
                "Revise attempt #{attempt_no} — fixes: {}",
                fixes.join(" | ")
            ));

            let candidate = match self
                .attempt(strategy, &inputs, &policy, &prompt, attempt_no, trace)
                .await
            {
                Ok(c) => c,
                Err(e) => return RunOutcome::Failed(e),
            };
            attempts.push(Attempt {
                kind: AttemptKind::Revise(attempt_no - 1),
                trs: candidate.scoring.trs,
                verdict: candidate.scoring.verdict,
                latency: candidate.latency,
            });

            let previous_trs = best.scoring.trs;
            let (next, replaced) = best.challenge(candidate.text, candidate.scoring);
            best = next;
            if replaced {
                trace.push(format!("New best: TRS {} (was {previous_trs}).", best.scoring.trs));
            } else {
                trace.push(format!("Kept best: TRS {previous_trs}."));
            }
        }

        RunOutcome::Delivered {
            text: best.text,
            scoring: best.scoring,
        }
    }

    /// One generate -> shape -> score round. Transport and critic failures
    /// are terminal and carry the attempt index.
    async fn attempt(
        &self,
        strategy: &dyn ContentStrategy,
        inputs: &PromptInputs<'_>,
        policy: &Policy,
        prompt: &Prompt,
        attempt_no: u32,
        trace: &mut Trace<'_>,
    ) -> Result<ScoredCandidate, PipelineError> {
        let request = GenerationRequest::new(&prompt.system, &prompt.user)
            .max_tokens(strategy.max_tokens())
            .temperature(GENERATION_TEMPERATURE);

        let generation = match self.generator.generate(&request).await {
            Ok(g) => g,
            Err(e) => {
                trace.push(format!("LLM error: {e}"));
                return Err(PipelineError::Transport {
                    attempt: attempt_no,
                    reason: e.to_string(),
                });
            }
        };
        trace.push(format!(
            "Model #{attempt_no} replied in ~{}ms.",
            generation.latency.as_millis()
        ));
        trace.push(format!(
            "Candidate #{attempt_no} (raw): \u{201c}{}\u{201d}",
            snippet(&generation.text, 140)
        ));

        let shaped = shape_output(inputs.content_type, &generation.text, inputs.params);
        if shaped != generation.text {
            trace.push("Enforced output shape.");
        }
        trace.push(format!(
            "Candidate #{attempt_no} (shaped): \u{201c}{}\u{201d}",
            snippet(&shaped, 140)
        ));

        let scoring = match guardrail::score(
            &*self.generator,
            inputs.content_type,
            &shaped,
            inputs.params,
            policy,
        )
        .await
        {
            Ok(s) => s,
            Err(e) => {
                trace.push(format!("TRS/critic error: {e}"));
                return Err(PipelineError::Scoring {
                    attempt: attempt_no,
                    reason: e.reason,
                });
            }
        };
        trace.push(scoring_line(attempt_no, &scoring));

        Ok(ScoredCandidate {
            text: shaped,
            scoring,
            latency: generation.latency,
        })
    }

    fn trace_prompt(&self, trace: &mut Trace<'_>, attempt_no: u32, prompt: &Prompt) {
        if self.verbose {
            trace.push(format!("Prompt #{attempt_no} — SYSTEM\n{}", prompt.system));
            trace.push(format!("Prompt #{attempt_no} — USER\n{}", prompt.user));
        } else {
            trace.push(format!(
                "Prompt #{attempt_no} — SYSTEM: {}",
                snippet(&prompt.system, PROMPT_SNIPPET_LEN)
            ));
            trace.push(format!(
                "Prompt #{attempt_no} — USER: {}",
                snippet(&prompt.user, PROMPT_SNIPPET_LEN)
            ));
        }
    }
}

struct ScoredCandidate {
    text: String,
    scoring: TrsResult,
    latency: Duration,
}

fn scoring_line(attempt_no: u32, scoring: &TrsResult) -> String {
    format!(
        "#{attempt_no} TRS = {} — rules {}/{RULES_MAX}, lexicon {}/{LEXICON_MAX}, critic {}/{CRITIC_MAX} → {}",
        scoring.trs,
        scoring.breakdown.rules,
        scoring.breakdown.lexicon,
        scoring.breakdown.critic,
        scoring.verdict.tag()
    )
}

/// Derive targeted fix instructions from the weakest parts of the best
/// breakdown: structure below 75% of the rules ceiling, vocabulary below
/// 75% of the lexicon ceiling, tone/clarity below 62.5% of the critic
/// ceiling (keyed off the critic's own detail).
fn make_fixes(
    strategy: &dyn ContentStrategy,
    params: &RequestParams,
    scoring: &TrsResult,
    preferred: &[String],
) -> Vec<String> {
    let breakdown = &scoring.breakdown;
    let mut fixes = Vec::new();

    if breakdown.rules < RULES_MAX * 3 / 4 {
        fixes.extend(strategy.structural_fixes(params));
    }

    if breakdown.lexicon < LEXICON_MAX * 3 / 4 {
        fixes.push("Swap banned or generic phrasing for on-voice vocabulary.".to_string());
        if !preferred.is_empty() {
            let sample: Vec<&str> = preferred.iter().take(6).map(String::as_str).collect();
            fixes.push(format!("Prefer wording like: {}.", sample.join(", ")));
        }
    }

    if breakdown.critic < CRITIC_MAX * 5 / 8 {
        fixes.push(critic_fix(&breakdown.critic_detail));
    }

    if fixes.is_empty() {
        fixes.push("Keep voice and constraints; remove any scaffolding or preface.".to_string());
    }
    fixes
}

fn critic_fix(detail: &str) -> String {
    let d = detail.to_lowercase();
    if ["verbose", "too long", "wordy", "length"].iter().any(|k| d.contains(k)) {
        "Tighten the wording; cut filler and qualifiers.".to_string()
    } else if ["unclear", "confusing", "vague"].iter().any(|k| d.contains(k)) {
        "State the main point plainly in the first words.".to_string()
    } else if ["tone", "unprofessional", "casual", "slang"].iter().any(|k| d.contains(k)) {
        "Keep the voice warm but professional; drop slang.".to_string()
    } else {
        "Improve clarity and tone; keep it short and direct.".to_string()
    }
}

fn merge_phrases(base: &[String], extra: &[&str]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for phrase in base.iter().map(String::as_str).chain(extra.iter().copied()) {
        let trimmed = phrase.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if !seen.contains(&key) {
            seen.push(key);
            out.push(trimmed.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_common::{ScoreBreakdown, Verdict};

    fn scoring(rules: u32, lexicon: u32, critic: u32, detail: &str) -> TrsResult {
        TrsResult {
            trs: (rules + lexicon + critic).min(100),
            verdict: Verdict::Fail,
            breakdown: ScoreBreakdown {
                rules,
                lexicon,
                critic,
                critic_detail: detail.to_string(),
            },
        }
    }

    #[test]
    fn best_candidate_requires_strictly_greater_trs() {
        let best = BestCandidate {
            text: "first".into(),
            scoring: scoring(30, 15, 30, ""),
        };
        let (best, replaced) = best.challenge("tie".into(), scoring(30, 15, 30, ""));
        assert!(!replaced);
        assert_eq!(best.text, "first");

        let (best, replaced) = best.challenge("better".into(), scoring(35, 15, 30, ""));
        assert!(replaced);
        assert_eq!(best.text, "better");
    }

    #[test]
    fn weak_rules_trigger_structural_fixes() {
        let strategy = strategy_for(ContentType::Microcopy);
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "pay")]);
        let fixes = make_fixes(strategy, &params, &scoring(20, 18, 30, ""), &[]);
        assert!(fixes.iter().any(|f| f.contains("5 words")));
    }

    #[test]
    fn weak_lexicon_triggers_vocabulary_fixes() {
        let strategy = strategy_for(ContentType::Microcopy);
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "pay")]);
        let preferred = vec!["pay now".to_string()];
        let fixes = make_fixes(strategy, &params, &scoring(38, 5, 30, ""), &preferred);
        assert!(fixes.iter().any(|f| f.contains("on-voice vocabulary")));
        assert!(fixes.iter().any(|f| f.contains("pay now")));
    }

    #[test]
    fn weak_critic_fixes_key_off_the_detail() {
        let strategy = strategy_for(ContentType::Microcopy);
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "pay")]);
        let fixes = make_fixes(strategy, &params, &scoring(38, 18, 10, "too verbose"), &[]);
        assert!(fixes.iter().any(|f| f.contains("Tighten the wording")));
    }

    #[test]
    fn healthy_breakdown_gets_the_default_fix() {
        let strategy = strategy_for(ContentType::Microcopy);
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "pay")]);
        let fixes = make_fixes(strategy, &params, &scoring(38, 18, 30, ""), &[]);
        assert_eq!(fixes.len(), 1);
        assert!(fixes[0].contains("Keep voice"));
    }

    #[test]
    fn merge_phrases_dedupes_case_insensitively() {
        let base = vec!["Pay Now".to_string(), "checkout".to_string()];
        let merged = merge_phrases(&base, &["pay now", "retry"]);
        assert_eq!(merged, vec!["Pay Now", "checkout", "retry"]);
    }
}
