//! Internal communications: short chat posts and titled emails. The opening
//! sentence must carry the title and key-update keywords, and chat copy
//! must not echo the title as a header.

use copydesk_common::RequestParams;
use regex::Regex;

use crate::policy::Policy;
use crate::prompt::{keyword_list, refs_block, PromptInputs};
use crate::shape;
use crate::text;

use super::ContentStrategy;

const KEYWORD_CAP: usize = 8;

// Boilerplate that signals the model drifted into generic corporate voice.
const GENERIC_PHRASES: &[&str] = &[
    "company",
    "organization",
    "team",
    "we are committed",
    "our mission",
    "we strive",
    "we believe",
    "we value",
    "we are dedicated",
];

const RUBRIC: &str = "Evaluate ONLY the writing style and presentation quality. Score based on: professional tone, clear structure, appropriate formatting, brand voice consistency. Score 0-10 for poor writing style (unclear, unprofessional tone, bad formatting). Score 30-40 for excellent writing style (clear, professional, well-structured). Do NOT judge content validity or business appropriateness - only evaluate how well it's written and presented.";

pub(super) struct InternalCommsStrategy;

fn keywords(params: &RequestParams) -> Vec<String> {
    text::uniq_keywords(
        &format!(
            "{} {}",
            params.get_or("title", ""),
            params.get_or("key_update", "")
        ),
        KEYWORD_CAP,
    )
}

fn is_chat_channel(params: &RequestParams) -> bool {
    params.get_or("channel", "Slack").eq_ignore_ascii_case("slack")
}

impl ContentStrategy for InternalCommsStrategy {
    fn max_tokens(&self) -> u32 {
        700
    }

    fn generate_task(&self, inputs: &PromptInputs<'_>) -> String {
        let params = inputs.params;
        format!(
            "TASK: Internal Comms announcement.\n\
             CHANNEL: {channel}\n\
             LOCALE: {locale}\n\
             TITLE: {title}\n\
             KEY UPDATE: {key_update}\n\
             {refs}\n\
             REQUIREMENTS:\n\
             - If CHANNEL is Slack: Keep it to 1-2 short lines; crisp; no emoji or slang. DO NOT include the title as a header - start directly with the message content.\n\
             - If CHANNEL is Email: Start with the TITLE on its own line, then a blank line, then the body; professional, friendly.\n\
             - CRITICAL: Focus on the specific update details, not general company information.\n\
             - The message should directly address and incorporate the title and key update content.\n\
             - Include at least 2 of: {keywords} in the first sentence/paragraph.\n\
             - Do NOT generate generic corporate messaging or company boilerplate.\n\
             - CRITICAL: Generate EXACTLY ONE message for the specified CHANNEL only.\n\
             - Do NOT include channel prefixes or labels like \"Slack:\" or \"Email:\".\n\
             - Do NOT mention the channel name in the output.\n\
             - Do NOT generate multiple formats or multiple messages.\n\
             OUTPUT: Only the final text for the specified channel.",
            channel = params.get_or("channel", "Slack"),
            locale = params.get_or("locale", "en-US"),
            title = params.get_or("title", ""),
            key_update = params.get_or("key_update", ""),
            refs = refs_block(inputs.refs),
            keywords = keyword_list(
                params.get_or("title", ""),
                params.get_or("key_update", "")
            ),
        )
    }

    fn revise_rules(&self, params: &RequestParams) -> String {
        format!(
            "\nCHANNEL: {}\nFORMAT RULES:\n\
             - If CHANNEL is Slack: Keep to 1-2 short lines; crisp; no emoji or slang. DO NOT include the title as a header - start directly with the message content.\n\
             - If CHANNEL is Email: Start with the TITLE on its own line, then a blank line, then the body.\n\
             - CRITICAL: Maintain focus on the specific update details from title and key update\n\
             - Do NOT drift into generic corporate messaging or company boilerplate\n\
             - Produce only ONE message for that CHANNEL.\n\
             - Do NOT include channel prefixes like \"Slack:\" or \"Email:\".\n\
             - Do NOT mention the channel name in the output.",
            params.get_or("channel", "Slack")
        )
    }

    fn original_request(&self, params: &RequestParams) -> String {
        format!(
            "\nORIGINAL REQUEST:\nTITLE: {}\nKEY UPDATE: {}\nCHANNEL: {}",
            params.get_or("title", ""),
            params.get_or("key_update", ""),
            params.get_or("channel", "Slack")
        )
    }

    fn shape(&self, text_in: &str, params: &RequestParams) -> String {
        let mut t = shape::strip_leading_label(text_in);
        t = shape::unwrap_quotes(&t);

        if is_chat_channel(params) {
            let title = params.get_or("title", "");
            if !title.is_empty() {
                // Drop an echoed title header line.
                let title_line = Regex::new(&format!(
                    r"(?i)^\s*{}\s*\n\s*",
                    regex::escape(title)
                ))
                .expect("valid regex");
                t = title_line.replace(&t, "").into_owned();

                // Drop "Subject: …" style headers the model sometimes adds.
                t = Regex::new(r"(?i)^(?:subject|title|topic|re):\s*[^\n]*\n\s*")
                    .expect("valid regex")
                    .replace(&t, "")
                    .into_owned();

                // Drop any remaining standalone title lines.
                let lowered = title.to_lowercase();
                t = t
                    .lines()
                    .filter(|line| {
                        let clean = line.trim().trim_end_matches([':', '.']).to_lowercase();
                        clean != lowered
                    })
                    .collect::<Vec<_>>()
                    .join("\n")
                    .trim()
                    .to_string();
            }
        }
        // Email keeps the title-then-body layout as generated.

        t
    }

    fn rules_penalty(&self, text_in: &str, params: &RequestParams, policy: &Policy) -> i32 {
        let mut penalty = 0;
        let kws = keywords(params);

        let first = text::first_sentence(text_in);
        let hits = text::keyword_hits(first, &kws, policy.synonyms);
        if hits < 2 {
            penalty -= 10;
        }

        let lower = text_in.to_lowercase();
        let generic = GENERIC_PHRASES.iter().any(|p| lower.contains(p));
        if generic && hits < 3 {
            penalty -= 8;
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

    fn structural_fixes(&self, params: &RequestParams) -> Vec<String> {
        let mut fixes = vec![
            "Open with the title and key-update keywords in the first sentence.".to_string(),
            "Cut corporate boilerplate; state the specific change.".to_string(),
        ];
        if is_chat_channel(params) {
            fixes.push("Keep it to 1-2 crisp lines with no title header.".to_string());
        } else {
            fixes.push("Start with the title line, a blank line, then the body.".to_string());
        }
        fixes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::policy_for;
    use copydesk_common::ContentType;

    fn slack_params() -> RequestParams {
        RequestParams::from_pairs([
            ("channel", "Slack"),
            ("title", "No dogs in the office"),
            ("key_update", "Dogs are no longer allowed on the 3rd floor"),
            ("locale", "en-US"),
        ])
    }

    #[test]
    fn opening_sentence_with_keywords_takes_no_penalty() {
        let policy = policy_for(ContentType::InternalComms);
        let strategy = InternalCommsStrategy;
        let penalty = strategy.rules_penalty(
            "Heads up: dogs are no longer allowed on the 3rd floor office.",
            &slack_params(),
            &policy,
        );
        assert_eq!(penalty, 0);
    }

    #[test]
    fn off_topic_opening_is_penalized() {
        let policy = policy_for(ContentType::InternalComms);
        let strategy = InternalCommsStrategy;
        let penalty = strategy.rules_penalty(
            "Please review the attached update. Dogs are affected.",
            &slack_params(),
            &policy,
        );
        assert_eq!(penalty, -10);
    }

    #[test]
    fn semantic_near_matches_count_as_hits() {
        let policy = policy_for(ContentType::InternalComms);
        let strategy = InternalCommsStrategy;
        // "dog-free" matches "dogs" via the synonym table, "office" directly.
        let penalty = strategy.rules_penalty(
            "The office is now dog-free on every floor.",
            &slack_params(),
            &policy,
        );
        assert_eq!(penalty, 0);
    }

    #[test]
    fn corporate_boilerplate_with_thin_keywords_is_penalized() {
        let policy = policy_for(ContentType::InternalComms);
        let strategy = InternalCommsStrategy;
        let penalty = strategy.rules_penalty(
            "Our mission is to keep everyone comfortable and aligned.",
            &slack_params(),
            &policy,
        );
        assert_eq!(penalty, -18);
    }

    #[test]
    fn keyword_hits_earn_up_to_ten_lexicon_points() {
        let policy = policy_for(ContentType::InternalComms);
        let strategy = InternalCommsStrategy;
        let bonus = strategy.lexicon_bonus(
            "Dogs are no longer allowed in the office on the 3rd floor",
            &slack_params(),
            &policy,
        );
        assert_eq!(bonus, 10);
    }
}
