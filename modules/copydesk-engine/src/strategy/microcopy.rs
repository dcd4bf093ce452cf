//! Microcopy: single CTAs, error lines, and tooltips. The UI sub-context
//! (`ui_context`) drives word caps, tone, shaping, and the critic rubric.

use copydesk_common::RequestParams;
use regex::Regex;

use crate::policy::{intent_vocab, Policy};
use crate::prompt::{refs_block, PromptInputs};
use crate::shape;
use crate::text;

use super::ContentStrategy;

const MAX_BUTTON_WORDS: usize = 5;
const MAX_TOOLTIP_WORDS: usize = 15;
const MAX_TOOLTIP_CHARS: usize = 120;

// Filler CTAs that read fine but say nothing about the intent.
const GENERIC_PHRASES: &[&str] = &[
    "click here",
    "learn more",
    "get started",
    "find out",
    "discover",
    "explore",
    "see details",
    "view more",
    "read more",
];

// Verbs a CTA is allowed to open with regardless of intent.
const START_VERBS: &[&str] = &[
    "close", "confirm", "continue", "upload", "pay", "start", "retry", "cancel", "help", "done",
    "ok", "okay", "back",
];

const BUTTON_REQUIREMENTS: &str = "\nBUTTON REQUIREMENTS:\n\
- Short (<= 5 words), direct, simple, action-first\n\
- Prefer \"Next\" over \"Next step\", \"Continue\" over \"Continue to next page\"\n\
- No unnecessary words or qualifiers";

const ERROR_REQUIREMENTS: &str = "\nERROR MESSAGE REQUIREMENTS:\n\
- Short (1 sentence max), empathetic, helpful, suggestive\n\
- Be understanding and offer a solution or next step\n\
- Avoid technical jargon, keep it user-friendly";

const TOOLTIP_REQUIREMENTS: &str = "\nTOOLTIP REQUIREMENTS:\n\
- Concise (1 sentence max), helpful, contextual\n\
- Focus on the specific INTENT/question - answer it directly\n\
- Avoid marketing language or promotional content\n\
- Be informative but brief - tooltips should be quick to read";

const BUTTON_RUBRIC: &str = "Evaluate ONLY the writing style and presentation quality. Score based on: clarity, actionability, appropriate length, professional tone. Score 0-10 for poor writing style (unclear, too long, unprofessional). Score 30-40 for excellent writing style (clear, concise, professional). Do NOT judge content validity - only evaluate how well it's written.";

const ERROR_RUBRIC: &str = "Evaluate ONLY the writing style and presentation quality. Score based on: empathy, helpfulness, clarity, appropriate length. Score 0-10 for poor writing style (unclear, too long, not empathetic). Score 30-40 for excellent writing style (clear, empathetic, helpful). Do NOT judge content validity - only evaluate how well it's written.";

const TOOLTIP_RUBRIC: &str = "Evaluate ONLY the writing style and presentation quality. Score based on: helpfulness, clarity, conciseness, appropriate length. Score 0-10 for poor writing style (unclear, too long, not helpful). Score 30-40 for excellent writing style (clear, helpful, concise). Do NOT judge content validity - only evaluate how well it's written.";

pub(super) struct MicrocopyStrategy;

fn ui_context(params: &RequestParams) -> String {
    params.get_or("ui_context", "button").to_lowercase()
}

/// Canonical intent when normalization produced one, else the raw field.
fn intent_key<'a>(params: &'a RequestParams) -> Option<&'a str> {
    params
        .get("intent_canonical")
        .or_else(|| params.get("intent"))
        .filter(|v| !v.trim().is_empty())
}

impl ContentStrategy for MicrocopyStrategy {
    fn max_tokens(&self) -> u32 {
        120
    }

    fn generate_task(&self, inputs: &PromptInputs<'_>) -> String {
        let params = inputs.params;
        let ctx = ui_context(params);
        let requirements = match ctx.as_str() {
            "error" => ERROR_REQUIREMENTS,
            "tooltip" => TOOLTIP_REQUIREMENTS,
            _ => BUTTON_REQUIREMENTS,
        };

        format!(
            "TASK: Generate Microcopy\n\
             UI CONTEXT: {ctx}\n\
             SURFACE: {surface}\n\
             INTENT: {intent}\n\
             {refs}\n\
             REQUIREMENTS:{requirements}\n\
             - CRITICAL: The generated content MUST directly address and match the specific INTENT.\n\
             - Use only words essential to the INTENT; avoid adding adverbs or qualifiers unless present in INTENT.\n\
             - Do NOT generate generic content that could apply to any intent.\n\
             - The output should be immediately recognizable as addressing the requested INTENT.\n\
             - No quotes around the text.\n\
             OUTPUT: Only the final text.",
            surface = params.get_or("surface", &ctx),
            intent = intent_key(params).unwrap_or("generic"),
            refs = refs_block(inputs.refs),
        )
    }

    fn revise_rules(&self, params: &RequestParams) -> String {
        match ui_context(params).as_str() {
            "error" => "\nUI CONTEXT: Error message\nFORMAT RULES:\n\
                - Short (1 sentence max), empathetic, helpful, suggestive\n\
                - Be understanding and offer a solution or next step\n\
                - Avoid technical jargon, keep it user-friendly\n\
                - CRITICAL: Address the specific error context - do not provide generic error messages"
                .to_string(),
            "tooltip" => "\nUI CONTEXT: Tooltip\nFORMAT RULES:\n\
                - Concise (1 sentence max), helpful, contextual\n\
                - Focus on the specific INTENT/question - answer it directly\n\
                - Avoid marketing language or promotional content\n\
                - CRITICAL: Maintain focus on the specific INTENT - do not drift into generic advice"
                .to_string(),
            _ => "\nUI CONTEXT: Button\nFORMAT RULES:\n\
                - Short (<= 5 words), direct, simple, action-first\n\
                - No unnecessary words or qualifiers\n\
                - CRITICAL: The button text must clearly indicate the specific action for the INTENT"
                .to_string(),
        }
    }

    fn original_request(&self, params: &RequestParams) -> String {
        format!(
            "\nORIGINAL REQUEST:\nINTENT: {}\nUI CONTEXT: {}",
            intent_key(params).unwrap_or("generic"),
            ui_context(params)
        )
    }

    fn shape(&self, text: &str, params: &RequestParams) -> String {
        let mut t = text.to_string();

        // Prefer a quoted CTA, else the tail after the last colon.
        if let Some(quoted) = shape::first_quoted_span(&t) {
            t = quoted;
        } else if let Some(tail) = t.rsplit(':').next() {
            t = tail.trim().to_string();
        }

        t = shape::strip_scaffolding(&t);
        t = shape::unwrap_quotes(&t);

        match ui_context(params).as_str() {
            "error" => {
                t = text::first_sentence(&t).to_string();
                trim_trailing(&t, &[',', '…', ';'])
            }
            "tooltip" => {
                t = text::first_sentence(&t).to_string();
                t = trim_trailing(&t, &[',', '…', ';']);
                if t.chars().count() > MAX_TOOLTIP_CHARS {
                    t = take_words(&t, MAX_TOOLTIP_WORDS);
                    t = trim_trailing(&t, &[',', '…', ';']);
                }
                t
            }
            _ => {
                t = take_words(&t, MAX_BUTTON_WORDS);
                t = trim_trailing(&t, &['.', '!', '?', '…', ',', ':', ';']);
                t = Regex::new(r"(?i)\s+and\s*$")
                    .expect("valid regex")
                    .replace(&t, "")
                    .trim()
                    .to_string();
                if t.eq_ignore_ascii_case("okay") {
                    t = "OK".to_string();
                }
                t
            }
        }
    }

    fn rules_penalty(&self, text_in: &str, params: &RequestParams, policy: &Policy) -> i32 {
        let mut penalty = 0;
        let n = text::word_count(text_in);
        let ctx = ui_context(params);

        if n == 0 {
            penalty -= 30;
        }

        // Per-context word caps.
        match ctx.as_str() {
            "error" | "tooltip" => {
                if n > MAX_TOOLTIP_WORDS {
                    penalty -= 10;
                }
            }
            _ => {
                if n > MAX_BUTTON_WORDS {
                    penalty -= 15;
                }
            }
        }

        if Regex::new(r"(?i)\band\b")
            .expect("valid regex")
            .is_match(text_in)
        {
            penalty -= 4;
        }
        if text_in.contains([';', ',', '/']) {
            penalty -= 4;
        }

        let verbs = intent_vocab(policy, intent_key(params)).preferred;
        let has_intent_verb = !verbs.is_empty() && text::contains_any_spaced(text_in, verbs);
        if !verbs.is_empty() && !has_intent_verb {
            penalty -= 6;
        }

        let lower = text_in.to_lowercase();
        let generic = GENERIC_PHRASES.iter().any(|p| lower.contains(p));
        if generic && !has_intent_verb {
            penalty -= 8;
        }

        penalty
    }

    fn lexicon_bonus(&self, text_in: &str, params: &RequestParams, policy: &Policy) -> i32 {
        let mut bonus = 0;
        let verbs = intent_vocab(policy, intent_key(params)).preferred;

        let haystack = text::lower_spaced(text_in);
        let hits = verbs
            .iter()
            .filter(|v| haystack.contains(&format!(" {} ", v.to_lowercase())))
            .count();
        if hits >= 1 {
            bonus += 8;
        }
        if hits >= 2 {
            bonus += 2;
        }

        let first_word = text_in
            .split_whitespace()
            .next()
            .map(|w| w.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_lowercase())
            .unwrap_or_default();
        if START_VERBS.contains(&first_word.as_str()) {
            bonus += 5;
        }

        bonus
    }

    fn critic_rubric(&self, params: &RequestParams) -> &'static str {
        match ui_context(params).as_str() {
            "error" => ERROR_RUBRIC,
            "tooltip" => TOOLTIP_RUBRIC,
            _ => BUTTON_RUBRIC,
        }
    }

    fn structural_fixes(&self, params: &RequestParams) -> Vec<String> {
        match ui_context(params).as_str() {
            "error" => vec![
                "Keep it to one short, empathetic sentence.".to_string(),
                "Offer the next step plainly; no jargon.".to_string(),
            ],
            "tooltip" => vec![
                "Answer the specific question in one concise sentence.".to_string(),
                "Drop marketing language; keep it informative.".to_string(),
            ],
            _ => vec![
                "Keep the call to action at 5 words or fewer, action-first.".to_string(),
                "Drop connectors; no \"and\", commas, or slashes.".to_string(),
                "Lead with the intent verb.".to_string(),
            ],
        }
    }
}

fn take_words(s: &str, n: usize) -> String {
    s.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

fn trim_trailing(s: &str, chars: &[char]) -> String {
    s.trim_end_matches(|c: char| chars.contains(&c)).trim().to_string()
}
