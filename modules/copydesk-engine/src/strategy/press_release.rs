//! Press-release paragraphs: factual tone, headline/key-message keywords
//! up front, and no consumer call-to-action phrasing.

use copydesk_common::RequestParams;
use regex::Regex;

use crate::policy::Policy;
use crate::prompt::{refs_block, PromptInputs};
use crate::shape;
use crate::text;

use super::ContentStrategy;

const KEYWORD_CAP: usize = 8;

const RUBRIC: &str = "Evaluate ONLY the writing style and presentation quality. Score based on: professional tone, clear structure, appropriate formatting, brand voice consistency. Score 0-10 for poor writing style (unclear, unprofessional tone, bad formatting). Score 30-40 for excellent writing style (clear, professional, well-structured). Do NOT judge content validity or business appropriateness - only evaluate how well it's written and presented.";

pub(super) struct PressReleaseStrategy;

fn keywords(params: &RequestParams) -> Vec<String> {
    text::uniq_keywords(
        &format!(
            "{} {}",
            params.get_or("headline", ""),
            params.get_or("key_message", "")
        ),
        KEYWORD_CAP,
    )
}

fn consumer_cta() -> Regex {
    Regex::new(r"(?i)(sign up|join us|try now|buy now)").expect("valid regex")
}

impl ContentStrategy for PressReleaseStrategy {
    fn max_tokens(&self) -> u32 {
        700
    }

    fn generate_task(&self, inputs: &PromptInputs<'_>) -> String {
        let params = inputs.params;
        format!(
            "TASK: Press Release paragraph (lede/body).\n\
             AUDIENCE: {audience}\n\
             HEADLINE: {headline}\n\
             KEY MESSAGE: {key_message}\n\
             {refs}\n\
             REQUIREMENTS:\n\
             - Factual tone; avoid consumer CTA language.\n\
             - CRITICAL: You MUST include the specific content from HEADLINE and KEY MESSAGE in your response.\n\
             - The response should directly address and incorporate the headline and key message details.\n\
             - Do NOT generate generic filler - focus on the specific announcement.\n\
             - Include at least 2-3 keywords from HEADLINE/KEY MESSAGE in the first sentence.\n\
             OUTPUT: Only the final text.",
            audience = params.get_or("audience", "press"),
            headline = params.get_or("headline", ""),
            key_message = params.get_or("key_message", ""),
            refs = refs_block(inputs.refs),
        )
    }

    fn revise_rules(&self, _params: &RequestParams) -> String {
        "\nTYPE: Press Release\nFORMAT RULES:\n\
         - CRITICAL: Maintain the specific content from HEADLINE and KEY MESSAGE\n\
         - Do NOT drift away from the original announcement details\n\
         - Keep factual tone, avoid generic marketing language\n\
         - Ensure the response directly addresses the specific news being announced"
            .to_string()
    }

    fn original_request(&self, params: &RequestParams) -> String {
        format!(
            "\nORIGINAL REQUEST:\nHEADLINE: {}\nKEY MESSAGE: {}\nAUDIENCE: {}",
            params.get_or("headline", ""),
            params.get_or("key_message", ""),
            params.get_or("audience", "press")
        )
    }

    fn shape(&self, text_in: &str, _params: &RequestParams) -> String {
        let t = shape::strip_leading_label(text_in);
        shape::unwrap_quotes(&t)
    }

    fn rules_penalty(&self, text_in: &str, params: &RequestParams, policy: &Policy) -> i32 {
        let mut penalty = 0;
        let kws = keywords(params);
        let hits = text::keyword_hits(text_in, &kws, policy.synonyms);

        // Tiered: thin coverage hurts, none hurts badly.
        if hits < 2 {
            penalty -= 15;
        }
        if hits < 1 {
            penalty -= 25;
        }

        if consumer_cta().is_match(text_in) {
            penalty -= 6;
        }

        penalty
    }

    fn lexicon_bonus(&self, text_in: &str, params: &RequestParams, _policy: &Policy) -> i32 {
        let hits = text::direct_hits(text_in, &keywords(params)) as i32;
        (hits * 2).min(10)
    }

    fn critic_rubric(&self, _params: &RequestParams) -> &'static str {
        RUBRIC
    }

    fn structural_fixes(&self, _params: &RequestParams) -> Vec<String> {
        vec![
            "Work the headline and key-message keywords into the first sentence.".to_string(),
            "Keep a factual tone; no consumer call-to-action phrasing.".to_string(),
        ]
    }
}
