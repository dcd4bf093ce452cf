//! Composite Trust Score: deterministic rules (<=40) + lexicon matching
//! (<=20) + a model critic (<=40). Each part clamps to its own ceiling
//! before the sum; the verdict is a pure function of the total against the
//! policy thresholds.

use thiserror::Error;
use tracing::debug;

use ai_client::{normalize_reply, CriticReply, GenerationRequest, TextGenerator};
use copydesk_common::{
    ContentType, RequestParams, ScoreBreakdown, TrsResult, Verdict, CRITIC_MAX, LEXICON_MAX,
    RULES_MAX,
};

use crate::policy::Policy;
use crate::strategy::{strategy_for, ContentStrategy};
use crate::text;

/// Fallback critic score when the reply carries no usable number.
const CONSERVATIVE_CRITIC_SCORE: u32 = 12;
const CRITIC_MAX_TOKENS: u32 = 80;

// Chat shorthand that never belongs in brand copy.
const SLANG_MARKERS: &[&str] = &["lol", "btw", "pls", "u", "thx", "emoji"];

const CRITIC_SYSTEM: &str = "You are a rigorous writing critic for a consumer brand.\n\
Return STRICT JSON only: {\"score\": <0..40>, \"detail\": \"<short>\"}.\n\
No prose, no preface, no fences.";

/// The critic call itself failed (network, HTTP, empty body). Terminal for
/// the run; parse trouble on a successful reply is absorbed instead.
#[derive(Error, Debug, Clone)]
#[error("{reason}")]
pub struct ScoringFailure {
    pub reason: String,
}

/// Score one candidate. The deterministic parts never fail; only a
/// client-level critic failure surfaces as an error.
pub async fn score(
    generator: &dyn TextGenerator,
    content_type: ContentType,
    text_in: &str,
    params: &RequestParams,
    policy: &Policy,
) -> Result<TrsResult, ScoringFailure> {
    let strategy = strategy_for(content_type);

    let rules = rules_score(strategy, text_in, params, policy);
    let lexicon = lexicon_score(strategy, text_in, params, policy);
    let (critic, critic_detail) = critic_score(generator, strategy, content_type, text_in, params)
        .await
        .map_err(|reason| ScoringFailure { reason })?;

    let trs = (rules + lexicon + critic).min(100);
    let verdict = if trs >= policy.thresholds.pass {
        Verdict::Pass
    } else if trs >= policy.thresholds.borderline {
        Verdict::Borderline
    } else {
        Verdict::Fail
    };

    Ok(TrsResult {
        trs,
        verdict,
        breakdown: ScoreBreakdown {
            rules,
            lexicon,
            critic,
            critic_detail,
        },
    })
}

/// Rules part: start at the ceiling, subtract the shared slang penalty and
/// the strategy's type-specific penalties.
fn rules_score(
    strategy: &dyn ContentStrategy,
    text_in: &str,
    params: &RequestParams,
    policy: &Policy,
) -> u32 {
    let mut s = RULES_MAX as i32;

    if text::contains_any_spaced(text_in, SLANG_MARKERS) {
        s -= 6;
    }

    s += strategy.rules_penalty(text_in, params, policy);
    s.clamp(0, RULES_MAX as i32) as u32
}

/// Lexicon part: banned-phrase penalties (exempting phrases the caller
/// used in their own input) plus the strategy's bonuses.
fn lexicon_score(
    strategy: &dyn ContentStrategy,
    text_in: &str,
    params: &RequestParams,
    policy: &Policy,
) -> u32 {
    let mut s = LEXICON_MAX as i32;
    let haystack = text::lower_spaced(text_in);
    let inputs_blob = params.values_blob();

    for banned in policy.banned_words {
        let token = format!(" {} ", banned.to_lowercase());
        if haystack.contains(&token) && !inputs_blob.contains(&token) {
            s -= 5;
        }
    }

    s += strategy.lexicon_bonus(text_in, params, policy);
    s.clamp(0, LEXICON_MAX as i32) as u32
}

/// Critic part: ask the generation client to judge writing quality only,
/// as strict structured data. Returns `Err(reason)` only for client-level
/// failures; every parse problem degrades to a conservative score with a
/// diagnostic detail.
async fn critic_score(
    generator: &dyn TextGenerator,
    strategy: &dyn ContentStrategy,
    content_type: ContentType,
    text_in: &str,
    params: &RequestParams,
) -> Result<(u32, String), String> {
    let user = format!(
        "TYPE: {content_type}\nTEXT:\n{text_in}\n\nRUBRIC: {rubric}\nOUTPUT: {{\"score\": <0..40>, \"detail\": \"…\"}}",
        rubric = strategy.critic_rubric(params),
    );

    let request = GenerationRequest::new(CRITIC_SYSTEM, user)
        .max_tokens(CRITIC_MAX_TOKENS)
        .temperature(0.0);

    let generation = generator
        .generate(&request)
        .await
        .map_err(|e| e.to_string())?;

    Ok(resolve_critic_reply(&generation.text))
}

fn resolve_critic_reply(raw: &str) -> (u32, String) {
    match normalize_reply(raw) {
        CriticReply::Structured { score, detail } => (clamp_critic(score), detail),
        CriticReply::PlainText(body) => match text::first_number(&body) {
            Some(n) => (clamp_critic(n), "critic_json_parse_fallback".to_string()),
            None => {
                debug!(reply = %text::snippet(&body, 80), "critic reply had no number");
                (CONSERVATIVE_CRITIC_SCORE, "critic_json_parse_error".to_string())
            }
        },
        CriticReply::Empty => (CONSERVATIVE_CRITIC_SCORE, "critic_empty_reply".to_string()),
    }
}

fn clamp_critic(score: f64) -> u32 {
    (score.round().clamp(0.0, CRITIC_MAX as f64)) as u32
}
