//! Request-parameter normalization, run before required-field validation:
//! content-type defaults, field-name synonym aliasing, and microcopy
//! intent canonicalization. Mutates the params in place and reports every
//! mapping through the trace callback.

use copydesk_common::{ContentType, RequestParams};

/// Ordered multi-word phrase table checked before the keyword heuristics.
const INTENT_PHRASES: &[(&str, &str)] = &[
    ("pay now", "pay"),
    ("complete payment", "pay"),
    ("make a payment", "pay"),
    ("start claim", "start_claim"),
    ("file claim", "start_claim"),
    ("file a claim", "start_claim"),
    ("contact support", "contact_support"),
    ("get help", "contact_support"),
    ("message us", "contact_support"),
    ("try again", "try_again"),
    ("update profile", "update_profile"),
    ("edit profile", "update_profile"),
    ("upload docs", "upload_docs"),
    ("upload documents", "upload_docs"),
    ("add files", "upload_docs"),
    ("get started", "start"),
    ("keep going", "continue_flow"),
    ("confirm action", "confirm_action"),
    ("got it", "close"),
];

/// Single-keyword fallback, first hit wins.
const INTENT_KEYWORDS: &[(&str, &str)] = &[
    ("pay", "pay"),
    ("checkout", "pay"),
    ("claim", "start_claim"),
    ("upload", "upload_docs"),
    ("attach", "upload_docs"),
    ("support", "contact_support"),
    ("contact", "contact_support"),
    ("retry", "try_again"),
    ("again", "try_again"),
    ("confirm", "confirm_action"),
    ("approve", "confirm_action"),
    ("accept", "confirm_action"),
    ("continue", "continue_flow"),
    ("next", "continue_flow"),
    ("proceed", "continue_flow"),
    ("profile", "update_profile"),
    ("cancel", "cancel_action"),
    ("close", "close"),
    ("dismiss", "close"),
    ("done", "close"),
    ("start", "start"),
    ("begin", "start"),
    ("help", "help"),
];

/// Normalize `params` for `content_type`. Every injected default and field
/// mapping is reported through `trace`.
pub fn normalize(
    content_type: ContentType,
    params: &mut RequestParams,
    trace: &mut dyn FnMut(String),
) {
    if content_type != ContentType::Microcopy && !params.has("locale") {
        params.set("locale", "en-US");
    }

    match content_type {
        ContentType::PressRelease => normalize_press_release(params, trace),
        ContentType::InternalComms => normalize_internal_comms(params, trace),
        ContentType::Microcopy => normalize_microcopy(params, trace),
    }
}

fn alias_into(
    params: &mut RequestParams,
    canonical: &str,
    aliases: &[&str],
    label: &str,
    trace: &mut dyn FnMut(String),
) {
    if params.has(canonical) {
        return;
    }
    for alias in aliases {
        if params.has(alias) {
            let value = params.get(alias).unwrap_or_default().to_string();
            params.set(canonical, value);
            if *alias != canonical {
                trace(format!("Mapped {label} field {alias} -> {canonical}"));
            }
            return;
        }
    }
}

fn normalize_press_release(params: &mut RequestParams, trace: &mut dyn FnMut(String)) {
    alias_into(
        params,
        "headline",
        &["headline", "title", "head", "subject"],
        "PR",
        trace,
    );
    alias_into(
        params,
        "key_message",
        &[
            "key_message",
            "keyMessage",
            "key_update",
            "keyUpdate",
            "key",
            "message",
            "summary",
            "lede",
        ],
        "PR",
        trace,
    );
    alias_into(
        params,
        "region",
        &["region", "geo", "market", "country"],
        "PR",
        trace,
    );

    if !params.has("audience") {
        params.set("audience", "press");
        trace("Defaulted PR audience -> press".to_string());
    }
    if !params.has("section") {
        params.set("section", "body");
    }
    if !params.has("topic") {
        if let Some(headline) = params.get("headline").map(str::to_string) {
            params.set("topic", headline);
        }
    }
}

fn normalize_internal_comms(params: &mut RequestParams, trace: &mut dyn FnMut(String)) {
    alias_into(
        params,
        "title",
        &["title", "subject", "headline"],
        "Internal",
        trace,
    );
    alias_into(
        params,
        "key_update",
        &["key_update", "keyUpdate", "update", "summary", "message"],
        "Internal",
        trace,
    );
    alias_into(
        params,
        "channel",
        &["channel", "medium", "platform"],
        "Internal",
        trace,
    );
}

fn normalize_microcopy(params: &mut RequestParams, trace: &mut dyn FnMut(String)) {
    alias_into(
        params,
        "ui_context",
        &["ui_context", "uiContext", "context", "surface"],
        "Microcopy",
        trace,
    );

    if let Some(raw) = params.get("intent").map(str::to_string) {
        if let Some(canonical) = canonical_intent(&raw) {
            if raw.trim() != canonical {
                trace(format!("Canonicalized intent \"{}\" -> {canonical}", raw.trim()));
            }
            params.set("intent_canonical", canonical);
        }
    }
}

/// Map a free-text intent onto a canonical intent key: the ordered phrase
/// table first, then single-keyword heuristics on the remaining words.
pub fn canonical_intent(raw: &str) -> Option<&'static str> {
    let cleaned = raw.trim().to_lowercase().replace(['_', '-'], " ");
    if cleaned.is_empty() {
        return None;
    }

    for (phrase, intent) in INTENT_PHRASES {
        if cleaned.contains(phrase) {
            return Some(intent);
        }
    }

    for word in cleaned.split_whitespace() {
        if let Some((_, intent)) = INTENT_KEYWORDS.iter().find(|(k, _)| *k == word) {
            return Some(intent);
        }
    }

    None
}
