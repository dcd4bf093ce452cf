//! Per-content-type policy: required fields, TRS thresholds, vocabulary,
//! trait weights, and corpus selection keys. Pure lookup, no side effects;
//! the tables are seed data a brand can retune.

use copydesk_common::{ContentType, RequestParams, TraitWeights};

/// TRS verdict boundaries: `pass >= pass`, `borderline >= borderline`.
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub pass: u32,
    pub borderline: u32,
}

/// Where the content-type corpus lives and how references are matched.
#[derive(Debug, Clone, Copy)]
pub struct CorpusSpec {
    pub locator: &'static str,
    pub match_on: &'static [&'static str],
    pub refs: usize,
}

/// Intent-specific vocabulary for microcopy.
#[derive(Debug, Clone, Copy)]
pub struct IntentVocab {
    pub intent: &'static str,
    pub preferred: &'static [&'static str],
    pub banned: &'static [&'static str],
}

#[derive(Debug, Clone, Copy)]
pub struct Policy {
    pub content_type: ContentType,
    pub required: &'static [&'static str],
    pub thresholds: Thresholds,
    pub locale_default: &'static str,
    pub corpus: CorpusSpec,
    pub traits: TraitWeights,
    /// Type-level preferred phrases (lexicon bonus / prompt prefer line).
    pub preferred: &'static [&'static str],
    /// Phrases penalized unless the caller asked for them.
    pub banned_words: &'static [&'static str],
    pub intent_lexicon: &'static [IntentVocab],
    /// Semantic near-matches used by keyword scoring, e.g. "no" ~ "not".
    /// Seed data for one brand's vocabulary; swap per deployment.
    pub synonyms: &'static [(&'static str, &'static [&'static str])],
}

const THRESHOLDS: Thresholds = Thresholds {
    pass: 80,
    borderline: 72,
};

// Marketing bleed that must stay out of CTAs, plus chat shorthand.
const MICROCOPY_BANNED: &[&str] = &[
    "ai-native",
    "automation",
    "oncall",
    "giveback",
    "community",
    "lol",
    "btw",
    "pls",
    "u",
    "thx",
    "emoji",
];

const INTERNAL_BANNED: &[&str] = &[
    "ai-native",
    "automation",
    "oncall",
    "giveback",
    "community",
    "emoji",
    "lol",
    "btw",
    "pls",
    "u",
    "thx",
];

// Consumer CTAs have no place in press copy.
const PRESS_BANNED: &[&str] = &[
    "sign up",
    "join us",
    "try now",
    "buy now",
    "emoji",
    "lol",
    "btw",
    "pls",
    "u",
    "thx",
];

const MICROCOPY_INTENTS: &[IntentVocab] = &[
    IntentVocab {
        intent: "close",
        preferred: &["close", "dismiss", "cancel", "back", "done", "ok", "okay", "got it"],
        banned: &[],
    },
    IntentVocab {
        intent: "confirm_action",
        preferred: &["confirm", "agree", "accept", "approve", "yes"],
        banned: &[],
    },
    IntentVocab {
        intent: "continue_flow",
        preferred: &["continue", "next", "proceed", "keep going"],
        banned: &[],
    },
    IntentVocab {
        intent: "contact_support",
        preferred: &["contact support", "get help", "chat", "message us"],
        banned: &[],
    },
    IntentVocab {
        intent: "upload_docs",
        preferred: &["upload", "add files", "attach", "submit docs"],
        banned: &[],
    },
    IntentVocab {
        intent: "pay",
        preferred: &["pay", "checkout", "complete payment", "pay now"],
        banned: &[],
    },
    IntentVocab {
        intent: "try_again",
        preferred: &["try again", "retry"],
        banned: &[],
    },
    IntentVocab {
        intent: "start",
        preferred: &["start", "get started", "begin"],
        banned: &[],
    },
    IntentVocab {
        intent: "start_claim",
        preferred: &["start claim", "file claim"],
        banned: &[],
    },
    IntentVocab {
        intent: "update_profile",
        preferred: &["update profile", "edit profile"],
        banned: &[],
    },
    IntentVocab {
        intent: "cancel_action",
        preferred: &["cancel", "nevermind"],
        banned: &[],
    },
    IntentVocab {
        intent: "help",
        preferred: &["help", "learn more"],
        banned: &[],
    },
];

const SEMANTIC_SYNONYMS: &[(&str, &[&str])] = &[
    ("dogs", &["dog-free"]),
    ("scare", &["comfortable", "fear", "anxiety"]),
    ("no", &["not", "free", "ban"]),
];

pub fn policy_for(content_type: ContentType) -> Policy {
    match content_type {
        ContentType::Microcopy => Policy {
            content_type,
            required: &["ui_context", "intent"],
            thresholds: THRESHOLDS,
            locale_default: "en-US",
            corpus: CorpusSpec {
                locator: "corpus/microcopy_corpus.json",
                match_on: &["ui_context", "intent"],
                refs: 3,
            },
            traits: TraitWeights {
                witty: 0.5,
                empathetic: 0.5,
                clear: 1.0,
            },
            preferred: &[],
            banned_words: MICROCOPY_BANNED,
            intent_lexicon: MICROCOPY_INTENTS,
            synonyms: &[],
        },
        ContentType::InternalComms => Policy {
            content_type,
            required: &["channel", "title", "key_update", "locale"],
            thresholds: THRESHOLDS,
            locale_default: "en-US",
            corpus: CorpusSpec {
                locator: "corpus/internal_comms_corpus.json",
                match_on: &["locale", "title"],
                refs: 3,
            },
            traits: TraitWeights {
                witty: 0.3,
                empathetic: 0.7,
                clear: 1.0,
            },
            preferred: &[
                "heads up",
                "join us",
                "please note",
                "details below",
                "see you there",
                "today",
                "tomorrow",
            ],
            banned_words: INTERNAL_BANNED,
            intent_lexicon: &[],
            synonyms: SEMANTIC_SYNONYMS,
        },
        ContentType::PressRelease => Policy {
            content_type,
            required: &["headline", "key_message", "audience", "locale"],
            thresholds: THRESHOLDS,
            locale_default: "en-US",
            corpus: CorpusSpec {
                locator: "corpus/press_release_corpus.json",
                match_on: &["audience", "locale"],
                refs: 3,
            },
            traits: TraitWeights {
                witty: 0.2,
                empathetic: 0.5,
                clear: 1.0,
            },
            preferred: &["transparent pricing", "customers", "community"],
            banned_words: PRESS_BANNED,
            intent_lexicon: &[],
            synonyms: SEMANTIC_SYNONYMS,
        },
    }
}

/// Required-field check; `Err` carries the missing names in policy order.
pub fn validate_required(policy: &Policy, params: &RequestParams) -> Result<(), Vec<String>> {
    let missing: Vec<String> = policy
        .required
        .iter()
        .filter(|field| !params.has(field))
        .map(|field| field.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(missing)
    }
}

/// Trait weights, adjusted by sub-context: microcopy varies with the UI
/// surface, press copy with the audience.
pub fn traits_for(content_type: ContentType, params: &RequestParams) -> TraitWeights {
    let policy = policy_for(content_type);

    if content_type == ContentType::Microcopy {
        return match params.get_or("ui_context", "").to_lowercase().as_str() {
            // Empathetic, helpful, short.
            "error" => TraitWeights {
                witty: 0.1,
                empathetic: 0.9,
                clear: 1.0,
            },
            // Direct, simple, short.
            "button" => TraitWeights {
                witty: 0.2,
                empathetic: 0.3,
                clear: 1.0,
            },
            // Helpful, contextual, longer.
            "tooltip" => TraitWeights {
                witty: 0.3,
                empathetic: 0.6,
                clear: 1.0,
            },
            _ => policy.traits,
        };
    }

    if content_type == ContentType::PressRelease {
        return match params.get_or("audience", "").to_lowercase().as_str() {
            "press" => TraitWeights {
                witty: 0.2,
                empathetic: 0.5,
                clear: 1.0,
            },
            "customer" | "customers" => TraitWeights {
                witty: 0.3,
                empathetic: 0.6,
                clear: 1.0,
            },
            "investor" | "investors" => TraitWeights {
                witty: 0.1,
                empathetic: 0.3,
                clear: 1.0,
            },
            _ => policy.traits,
        };
    }

    policy.traits
}

/// Intent vocabulary lookup; unknown intents get empty-but-well-typed lists.
pub fn intent_vocab(policy: &Policy, intent: Option<&str>) -> IntentVocab {
    let empty = IntentVocab {
        intent: "",
        preferred: &[],
        banned: &[],
    };
    let Some(intent) = intent else {
        return empty;
    };
    policy
        .intent_lexicon
        .iter()
        .copied()
        .find(|v| v.intent == intent)
        .unwrap_or(empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_reported_in_policy_order() {
        let policy = policy_for(ContentType::InternalComms);
        let params = RequestParams::from_pairs([("channel", "Slack")]);
        let missing = validate_required(&policy, &params).unwrap_err();
        assert_eq!(missing, vec!["title", "key_update", "locale"]);
    }

    #[test]
    fn blank_values_count_as_missing() {
        let policy = policy_for(ContentType::Microcopy);
        let params = RequestParams::from_pairs([("ui_context", "button"), ("intent", "  ")]);
        let missing = validate_required(&policy, &params).unwrap_err();
        assert_eq!(missing, vec!["intent"]);
    }

    #[test]
    fn error_context_boosts_empathy() {
        let params = RequestParams::from_pairs([("ui_context", "error")]);
        let traits = traits_for(ContentType::Microcopy, &params);
        assert!(traits.empathetic > 0.8);
        assert!(traits.witty < 0.2);
    }

    #[test]
    fn investor_audience_drops_wit() {
        let params = RequestParams::from_pairs([("audience", "investors")]);
        let traits = traits_for(ContentType::PressRelease, &params);
        assert!(traits.witty <= 0.1);
    }

    #[test]
    fn unknown_intent_gets_empty_vocab() {
        let policy = policy_for(ContentType::Microcopy);
        let vocab = intent_vocab(&policy, Some("teleport"));
        assert!(vocab.preferred.is_empty());
        assert!(vocab.banned.is_empty());
    }

    #[test]
    fn pay_intent_lists_payment_verbs() {
        let policy = policy_for(ContentType::Microcopy);
        let vocab = intent_vocab(&policy, Some("pay"));
        assert!(vocab.preferred.contains(&"pay now"));
    }
}
