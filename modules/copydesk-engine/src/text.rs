//! Small text helpers shared by the scorer, the shaper, and the corpus
//! selector. All matching is lowercase and space-padded so that phrase
//! checks hit whole words, not substrings.

use regex::Regex;

/// Lowercase and pad with spaces so ` phrase ` checks match whole words.
pub fn lower_spaced(s: &str) -> String {
    format!(" {} ", s.to_lowercase())
}

pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Whether any of `phrases` occurs as a whole word/phrase in `text`.
pub fn contains_any_spaced<S: AsRef<str>>(text: &str, phrases: &[S]) -> bool {
    let haystack = lower_spaced(text);
    phrases
        .iter()
        .any(|p| haystack.contains(&format!(" {} ", p.as_ref().to_lowercase())))
}

/// Up to `cap` unique lowercase keywords (length >= 2) from free text, in
/// first-seen order. Punctuation other than `:` and `-` is dropped.
pub fn uniq_keywords(raw: &str, cap: usize) -> Vec<String> {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c.is_whitespace() || c == ':' || c == '-' {
                c
            } else {
                ' '
            }
        })
        .collect();

    let mut out: Vec<String> = Vec::new();
    for word in cleaned.split_whitespace() {
        if word.len() >= 2 && !out.iter().any(|w| w == word) {
            out.push(word.to_string());
        }
        if out.len() == cap {
            break;
        }
    }
    out
}

/// The first sentence of `s`, terminator excluded.
pub fn first_sentence(s: &str) -> &str {
    match s.find(['.', '!', '?']) {
        Some(idx) => s[..idx].trim(),
        None => s.trim(),
    }
}

/// Count keyword hits in `text`: direct whole-word matches, a light
/// plural-to-singular stem, and the policy's semantic near-match table
/// (e.g. "no" ~ "not"/"free"/"ban").
pub fn keyword_hits(
    text: &str,
    keywords: &[String],
    synonyms: &[(&str, &[&str])],
) -> usize {
    let haystack = lower_spaced(text);
    let mut hits = 0;

    for keyword in keywords {
        let k = keyword.to_lowercase();

        if haystack.contains(&format!(" {k} ")) {
            hits += 1;
            continue;
        }

        if let Some(stem) = k.strip_suffix('s') {
            if !stem.is_empty() && haystack.contains(&format!(" {stem} ")) {
                hits += 1;
                continue;
            }
        }

        if let Some((_, alts)) = synonyms.iter().find(|(from, _)| *from == k) {
            if alts.iter().any(|alt| haystack.contains(&format!(" {alt} "))) {
                hits += 1;
            }
        }
    }

    hits
}

/// Count plain whole-word hits, no stemming or synonyms.
pub fn direct_hits(text: &str, keywords: &[String]) -> usize {
    let haystack = lower_spaced(text);
    keywords
        .iter()
        .filter(|k| haystack.contains(&format!(" {} ", k.to_lowercase())))
        .count()
}

/// Collapse whitespace and ellipsize to `max` characters for trace lines.
pub fn snippet(s: &str, max: usize) -> String {
    let collapsed: Vec<&str> = s.split_whitespace().collect();
    let joined = collapsed.join(" ");
    if joined.chars().count() <= max {
        return joined;
    }
    let cut: String = joined.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

/// First numeric token in `s`, if any.
pub fn first_number(s: &str) -> Option<f64> {
    let re = Regex::new(r"-?\d+(\.\d+)?").expect("valid regex");
    re.find(s)?.as_str().parse().ok()
}
