//! Reference-corpus loading and selection: fetch the content-type corpus
//! and the global lexicon concurrently, merge vocabulary, pick the
//! best-matching voice references, and derive anchor phrases when no
//! explicit lexicon is configured.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use copydesk_common::RequestParams;

use crate::policy::Policy;
use crate::traits::CorpusSource;

const GLOBAL_LEXICON_LOCATOR: &str = "corpus/lexicon_global.json";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One reference record. Fields are free-form; matching looks them up by
/// key and style anchoring reads `text`/`body`/`headline`.
#[derive(Debug, Clone, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub ref_id: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl Example {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// Identifier for trace lines: `id`, then `ref_id`, then a positional tag.
    pub fn label(&self, index: usize) -> String {
        self.id
            .clone()
            .or_else(|| self.ref_id.clone())
            .unwrap_or_else(|| format!("ref#{}", index + 1))
    }

    /// The style-anchoring text of this reference.
    pub fn display_text(&self) -> &str {
        for key in ["text", "body", "headline"] {
            if let Some(value) = self.field(key) {
                if !value.trim().is_empty() {
                    return value;
                }
            }
        }
        ""
    }
}

/// Merged corpus + lexicon for one run. Fail-closed: on any fetch or parse
/// problem the pack is empty and carries the reason, and the run continues
/// in degraded mode.
#[derive(Debug, Clone, Default)]
pub struct CorpusPack {
    pub content_type: String,
    pub examples: Vec<Example>,
    pub preferred_lexicon: Vec<String>,
    pub banned_lexicon: Vec<String>,
    pub error: Option<String>,
}

impl CorpusPack {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            error: Some(reason.into()),
            ..Self::default()
        }
    }
}

#[derive(Deserialize)]
struct CorpusDoc {
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    examples: Vec<Example>,
    #[serde(default)]
    preferred_lexicon: Vec<String>,
    #[serde(default, alias = "banned_phrases")]
    banned_lexicon: Vec<String>,
}

#[derive(Deserialize)]
struct GlobalLexicon {
    #[serde(default)]
    preferred: Vec<String>,
    #[serde(default)]
    banned: Vec<String>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Fetch the content-type corpus and the global lexicon concurrently and
/// merge their vocabularies (case/whitespace-insensitive de-dup).
pub async fn load_corpus_with_lexicon(source: &dyn CorpusSource, policy: &Policy) -> CorpusPack {
    let (corpus_res, global_res) = tokio::join!(
        source.fetch(policy.corpus.locator),
        source.fetch(GLOBAL_LEXICON_LOCATOR)
    );

    let corpus_value = match corpus_res {
        Ok(v) => v,
        Err(e) => return CorpusPack::degraded(format!("corpus fetch: {e}")),
    };
    let global_value = match global_res {
        Ok(v) => v,
        Err(e) => return CorpusPack::degraded(format!("global lexicon fetch: {e}")),
    };

    let corpus: CorpusDoc = match serde_json::from_value(corpus_value) {
        Ok(doc) => doc,
        Err(e) => return CorpusPack::degraded(format!("corpus parse: {e}")),
    };
    let global: GlobalLexicon = match serde_json::from_value(global_value) {
        Ok(doc) => doc,
        Err(e) => return CorpusPack::degraded(format!("global lexicon parse: {e}")),
    };

    let preferred_lexicon = dedupe(
        corpus
            .preferred_lexicon
            .iter()
            .chain(global.preferred.iter()),
    );
    let banned_lexicon = dedupe(corpus.banned_lexicon.iter().chain(global.banned.iter()));

    debug!(
        examples = corpus.examples.len(),
        preferred = preferred_lexicon.len(),
        banned = banned_lexicon.len(),
        "corpus loaded"
    );

    CorpusPack {
        content_type: corpus.content_type.unwrap_or_else(|| "unknown".into()),
        examples: corpus.examples,
        preferred_lexicon,
        banned_lexicon,
        error: None,
    }
}

fn dedupe<'a>(phrases: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();
    for phrase in phrases {
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

// ---------------------------------------------------------------------------
// Reference selection
// ---------------------------------------------------------------------------

/// Pick up to `n` references in three tiers: exact match on every match
/// key, substring-overlap partial match, then the unordered remainder.
/// Stable within a tier; never more than `n`, never duplicates.
pub fn pick_refs(
    pack: &CorpusPack,
    match_on: &[&str],
    params: &RequestParams,
    n: usize,
) -> Vec<Example> {
    if pack.examples.is_empty() || n == 0 {
        return Vec::new();
    }

    let mut exact: Vec<&Example> = Vec::new();
    let mut partial: Vec<&Example> = Vec::new();
    let mut rest: Vec<&Example> = Vec::new();

    for example in &pack.examples {
        let mut exact_score = 0usize;
        let mut partial_score = 0usize;

        for key in match_on {
            let want = norm(params.get(key).unwrap_or(""));
            let got = norm(example.field(key).unwrap_or(""));
            if want.is_empty() || got.is_empty() {
                continue;
            }
            if want == got {
                exact_score += 1;
            } else if got.contains(&want) || want.contains(&got) {
                partial_score += 1;
            }
        }

        if !match_on.is_empty() && exact_score == match_on.len() {
            exact.push(example);
        } else if exact_score > 0 || partial_score > 0 {
            partial.push(example);
        } else {
            rest.push(example);
        }
    }

    let mut out: Vec<Example> = Vec::new();
    for tier in [exact, partial, rest] {
        for example in tier {
            if out.len() == n {
                return out;
            }
            out.push(example.clone());
        }
    }
    out
}

fn norm(v: &str) -> String {
    v.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Lexicon derivation
// ---------------------------------------------------------------------------

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "of", "in", "on", "for", "to", "from", "by", "at", "as", "and", "or",
    "but", "so", "if", "then", "than", "that", "which", "who", "whom", "with", "without",
    "within", "about", "into", "over", "under", "it", "its", "this", "these", "those", "be",
    "is", "are", "was", "were", "am", "we", "our", "ours", "you", "your", "yours", "they",
    "them", "their", "theirs", "i", "me", "my", "mine", "he", "she", "his", "her", "hers", "us",
];

// Actionable words that make good anchors even when rare.
const ACTION_HINTS: &[&str] = &[
    "join", "rsvp", "today", "now", "update", "details", "below", "thanks", "heads", "up",
    "bring", "see", "there", "team", "everyone", "all", "hands", "event", "meet", "meeting",
    "call", "agenda", "next", "steps", "reminder",
];

/// Derive anchor phrases from the selected references: unigram + bigram
/// frequencies with bigrams weighted 1.5x, phrases kept inside a [2, 28]
/// character window, top `max_phrases` by weight.
pub fn derive_lexicon_from_refs(refs: &[Example], max_phrases: usize) -> Vec<String> {
    let text: String = refs
        .iter()
        .map(|r| r.display_text())
        .collect::<Vec<_>>()
        .join(" ");
    if text.trim().is_empty() {
        return Vec::new();
    }

    let tokens = tokenize(&text);

    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    for token in tokens.iter().filter(|t| is_anchor_word(t)) {
        *weights.entry(token.clone()).or_insert(0.0) += 1.0;
    }
    for bigram in bigrams(&tokens).into_iter().filter(|b| is_anchor_phrase(b)) {
        *weights.entry(bigram).or_insert(0.0) += 1.5;
    }

    let mut ranked: Vec<(String, f64)> = weights.into_iter().collect();
    // Weight descending; BTreeMap order makes ties alphabetical and stable.
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .into_iter()
        .map(|(phrase, _)| phrase)
        .filter(|p| (2..=28).contains(&p.len()))
        .take(max_phrases)
        .collect()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .chars()
        .map(|c| match c {
            '`' | '*' | '_' | '(' | ')' | '[' | ']' | '{' | '}' | '<' | '>' | '#' | '|' | '~'
            | '^' | '$' | '\\' | '/' => ' ',
            '“' | '”' | '"' | '‘' | '’' | '\'' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_ascii_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

fn is_anchor_word(token: &str) -> bool {
    if token.len() < 2 || STOP_WORDS.contains(&token) {
        return false;
    }
    ACTION_HINTS.contains(&token)
        || (token.chars().next().is_some_and(|c| c.is_ascii_lowercase())
            && token.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn is_anchor_phrase(bigram: &str) -> bool {
    let mut parts = bigram.split(' ');
    let (Some(a), Some(b)) = (parts.next(), parts.next()) else {
        return false;
    };
    !STOP_WORDS.contains(&a) && !STOP_WORDS.contains(&b)
}

fn bigrams(tokens: &[String]) -> Vec<String> {
    tokens
        .windows(2)
        .map(|pair| format!("{} {}", pair[0], pair[1]))
        .collect()
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Fetches corpus documents relative to a base URL, fresh each run.
pub struct HttpCorpusSource {
    http: reqwest::Client,
    base_url: String,
}

impl HttpCorpusSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CorpusSource for HttpCorpusSource {
    async fn fetch(&self, locator: &str) -> Result<serde_json::Value> {
        if self.base_url.is_empty() {
            return Err(anyhow!("no corpus base URL configured"));
        }
        let url = format!("{}/{}", self.base_url, locator.trim_start_matches('/'));
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("corpus HTTP {status} for {url}"));
        }
        Ok(response.json().await?)
    }
}
