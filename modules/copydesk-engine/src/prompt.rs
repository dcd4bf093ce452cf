//! Prompt construction for the generate and revise calls. The system half
//! carries the brand-voice framing, the merged lexicon, and the
//! no-scaffolding guard; the user half is content-type-specific and comes
//! from the selected strategy.

use copydesk_common::{ContentType, RequestParams, TraitWeights};

use crate::corpus::Example;
use crate::strategy::strategy_for;
use crate::text;

/// A rendered (system, user) instruction pair.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Everything the builders need for one run, assembled once by the
/// orchestrator.
pub struct PromptInputs<'a> {
    pub content_type: ContentType,
    pub traits: TraitWeights,
    pub params: &'a RequestParams,
    pub refs: &'a [Example],
    pub preferred: &'a [String],
    pub banned: &'a [String],
}

const NO_PREFACE_GUARDS: &str = "GUARDS: \
- Return ONLY the final text. No prefaces like \"Here is...\", \"Here's...\", \"Below is...\", \
\"Internal comms announcement:\", \"Press release:\". \
- No labels (Task:, Output:, Draft:). \
- No code fences or markdown headings.";

fn system_common(traits: &TraitWeights) -> String {
    format!(
        "You are the brand's staff copywriter. Voice: friendly, clear, compassionate; airy, concise.\n\
         Prefer contractions. Avoid emoji and filler. Avoid heavy industry jargon; keep facts accurate.\n\
         TRAITS: witty({}), empathetic({}), clear({}).",
        traits.witty, traits.empathetic, traits.clear
    )
}

fn lexicon_lines(preferred: &[String], banned: &[String]) -> String {
    let mut lines = Vec::new();
    if !preferred.is_empty() {
        lines.push(format!("LEXICON PREFER: {}", preferred.join(", ")));
    }
    if !banned.is_empty() {
        lines.push(format!("LEXICON AVOID: {}", banned.join(", ")));
    }
    lines.join("\n")
}

/// Voice reference block: at most three examples, style-only framing.
pub(crate) fn refs_block(refs: &[Example]) -> String {
    if refs.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = refs
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, r)| {
            format!(
                "• {} — {}",
                r.label(i),
                text::snippet(r.display_text(), 300)
            )
        })
        .collect();
    format!("VOICE & EXAMPLES (for style, not content):\n{}", lines.join("\n"))
}

/// Comma-joined keyword list (length >= 3, capped at 8) used by the
/// internal-comms opening-sentence requirement.
pub(crate) fn keyword_list(a: &str, b: &str) -> String {
    let raw = format!("{a} {b}").to_lowercase();
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let mut uniq: Vec<&str> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.len() >= 3 && !uniq.contains(&word) {
            uniq.push(word);
        }
        if uniq.len() == 8 {
            break;
        }
    }
    uniq.join(", ")
}

fn system_for(inputs: &PromptInputs<'_>) -> String {
    [
        system_common(&inputs.traits),
        lexicon_lines(inputs.preferred, inputs.banned),
        NO_PREFACE_GUARDS.to_string(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join("\n")
}

/// Render the initial-generation prompt pair.
pub fn build_generate(inputs: &PromptInputs<'_>) -> Prompt {
    Prompt {
        system: system_for(inputs),
        user: strategy_for(inputs.content_type).generate_task(inputs),
    }
}

/// Render a revise prompt: prior candidate, numbered fixes, and the
/// original structured request so revisions cannot drift off topic.
pub fn build_revise(inputs: &PromptInputs<'_>, base: &str, fixes: &[String]) -> Prompt {
    let strategy = strategy_for(inputs.content_type);
    let params = inputs.params;

    let fix_lines = if fixes.is_empty() {
        "  - Keep voice and constraints; remove any scaffolding or preface.".to_string()
    } else {
        fixes
            .iter()
            .enumerate()
            .map(|(i, f)| format!("  {}. {}", i + 1, f))
            .collect::<Vec<_>>()
            .join("\n")
    };

    let locale_line = if inputs.content_type == ContentType::Microcopy {
        String::new()
    } else {
        format!("\nLOCALE: {}", params.get_or("locale", "en-US"))
    };

    let user = format!(
        "TASK: Revise the text to improve its trust score while maintaining relevance to the original request.\n\
         TYPE: {}{}{}{}\n\n\
         CURRENT TEXT TO IMPROVE:\n\
         \"\"\"\n{}\n\"\"\"\n\n\
         FIXES TO APPLY:\n{}\n\n\
         CRITICAL INSTRUCTIONS:\n\
         - IMPROVE the existing text based on the scoring feedback\n\
         - Do NOT change the topic or subject matter\n\
         - Maintain relevance to the original request (see above)\n\
         - Keep the same core message but fix the specific issues identified\n\
         - Do NOT generate completely new content\n\
         - Do NOT generate content for multiple channels\n\n\
         {}\n\
         OUTPUT: Only the final text (no preface, no labels, no fences).",
        inputs.content_type,
        strategy.revise_rules(params),
        strategy.original_request(params),
        locale_line,
        base,
        fix_lines,
        refs_block(inputs.refs),
    );

    Prompt {
        system: system_for(inputs),
        user,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use copydesk_common::ContentType;

    fn inputs<'a>(params: &'a RequestParams, preferred: &'a [String]) -> PromptInputs<'a> {
        PromptInputs {
            content_type: ContentType::Microcopy,
            traits: TraitWeights {
                witty: 0.2,
                empathetic: 0.3,
                clear: 1.0,
            },
            params,
            refs: &[],
            preferred,
            banned: &[],
        }
    }

    #[test]
    fn generate_prompt_carries_guards_and_lexicon() {
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "pay")]);
        let preferred = vec!["pay now".to_string()];
        let prompt = build_generate(&inputs(&params, &preferred));

        assert!(prompt.system.contains("Return ONLY the final text"));
        assert!(prompt.system.contains("LEXICON PREFER: pay now"));
        assert!(prompt.user.contains("TASK: Generate Microcopy"));
        assert!(prompt.user.contains("INTENT: pay"));
    }

    #[test]
    fn revise_prompt_embeds_base_and_numbered_fixes() {
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "pay")]);
        let prompt = build_revise(
            &inputs(&params, &[]),
            "Pay your bill",
            &["Lead with the intent verb.".to_string(), "Drop connectors.".to_string()],
        );

        assert!(prompt.user.contains("Pay your bill"));
        assert!(prompt.user.contains("1. Lead with the intent verb."));
        assert!(prompt.user.contains("2. Drop connectors."));
        assert!(prompt.user.contains("ORIGINAL REQUEST"));
    }

    #[test]
    fn keyword_list_caps_and_dedupes() {
        let list = keyword_list("Office Dogs Policy", "no dogs in the office");
        assert_eq!(list, "office, dogs, policy, the");
    }
}
