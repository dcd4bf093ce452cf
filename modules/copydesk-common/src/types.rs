use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::error::PipelineError;

/// Sub-score ceilings for the composite Trust Score.
pub const RULES_MAX: u32 = 40;
pub const LEXICON_MAX: u32 = 20;
pub const CRITIC_MAX: u32 = 40;

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

/// The copy surfaces the pipeline knows how to draft. Selects policy, prompt
/// shape, and scoring rules; immutable for the life of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Microcopy,
    InternalComms,
    PressRelease,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Microcopy => "microcopy",
            ContentType::InternalComms => "internal_comms",
            ContentType::PressRelease => "press_release",
        }
    }

    /// Human-facing label used in trace lines.
    pub fn label(&self) -> &'static str {
        match self {
            ContentType::Microcopy => "Microcopy",
            ContentType::InternalComms => "Internal Comms",
            ContentType::PressRelease => "PR / External",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone)]
#[error("unknown content type: {0}")]
pub struct UnknownContentType(pub String);

impl FromStr for ContentType {
    type Err = UnknownContentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "microcopy" => Ok(ContentType::Microcopy),
            "internal_comms" => Ok(ContentType::InternalComms),
            // Historical aliases for the external surface.
            "press_release" | "pr" | "external" => Ok(ContentType::PressRelease),
            other => Err(UnknownContentType(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Request parameters
// ---------------------------------------------------------------------------

/// Caller-supplied field map, mutated in place during normalization
/// (default injection, synonym aliasing, intent canonicalization). Owned by
/// exactly one run; never shared across concurrent runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestParams(BTreeMap<String, String>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).filter(|v| !v.trim().is_empty()).unwrap_or(default)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Present with a non-blank value.
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// All values lowercased into one space-padded blob, for checking
    /// whether a phrase literally came from the caller's own input.
    pub fn values_blob(&self) -> String {
        let mut blob = String::from(" ");
        for value in self.0.values() {
            blob.push_str(&value.to_lowercase());
            blob.push(' ');
        }
        blob
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Borderline,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Borderline => "borderline",
            Verdict::Fail => "fail",
        }
    }

    /// Uppercase tag for trace lines.
    pub fn tag(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Borderline => "BORDERLINE",
            Verdict::Fail => "FAIL",
        }
    }
}

/// Tone weights applied to the brand-voice framing, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TraitWeights {
    pub witty: f32,
    pub empathetic: f32,
    pub clear: f32,
}

impl TraitWeights {
    /// One-line rendering for trace output, e.g. `witty=0.5, empathetic=0.5, clear=1`.
    pub fn compact(&self) -> String {
        format!(
            "witty={}, empathetic={}, clear={}",
            round1(self.witty),
            round1(self.empathetic),
            round1(self.clear)
        )
    }
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}

/// Per-part scores. `rules` and `critic` cap at 40, `lexicon` at 20; each is
/// clamped to its own ceiling before the composite is summed.
#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub rules: u32,
    pub lexicon: u32,
    pub critic: u32,
    pub critic_detail: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrsResult {
    /// Clamped sum of the three sub-scores, 0..=100.
    pub trs: u32,
    pub verdict: Verdict,
    pub breakdown: ScoreBreakdown,
}

// ---------------------------------------------------------------------------
// Attempts and reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptKind {
    Initial,
    Revise(u32),
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptKind::Initial => f.write_str("initial"),
            AttemptKind::Revise(n) => write!(f, "revise#{n}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Attempt {
    pub kind: AttemptKind,
    pub trs: u32,
    pub verdict: Verdict,
    pub latency: Duration,
}

/// How a run ended: a delivered candidate (possibly still `fail`-graded,
/// when the budget ran out) or a terminal error.
#[derive(Debug)]
pub enum RunOutcome {
    Delivered { text: String, scoring: TrsResult },
    Failed(PipelineError),
}

/// Terminal output of one pipeline run. Produced exactly once; ownership
/// transfers to the caller.
#[derive(Debug)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub content_type: ContentType,
    pub log: Vec<String>,
    pub attempts: Vec<Attempt>,
    pub duration: Duration,
    pub outcome: RunOutcome,
}

impl PipelineReport {
    pub fn ok(&self) -> bool {
        matches!(self.outcome, RunOutcome::Delivered { .. })
    }

    pub fn result_text(&self) -> Option<&str> {
        match &self.outcome {
            RunOutcome::Delivered { text, .. } => Some(text),
            RunOutcome::Failed(_) => None,
        }
    }

    pub fn scoring(&self) -> Option<&TrsResult> {
        match &self.outcome {
            RunOutcome::Delivered { scoring, .. } => Some(scoring),
            RunOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match &self.outcome {
            RunOutcome::Failed(e) => Some(e),
            RunOutcome::Delivered { .. } => None,
        }
    }
}

/// Flattened run record for the external event/feedback store. The store
/// itself is a collaborator outside this workspace; this type only
/// guarantees the fields it needs are all in one place.
#[derive(Debug, Clone, Serialize)]
pub struct RunEvent {
    pub run_id: Uuid,
    pub content_type: ContentType,
    pub attempt_count: usize,
    pub verdict_final: Option<Verdict>,
    pub trs_final: Option<u32>,
    pub trs_initial: Option<u32>,
    pub duration_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl RunEvent {
    pub fn from_report(report: &PipelineReport) -> Self {
        Self {
            run_id: report.run_id,
            content_type: report.content_type,
            attempt_count: report.attempts.len(),
            verdict_final: report.scoring().map(|s| s.verdict),
            trs_final: report.scoring().map(|s| s.trs),
            trs_initial: report.attempts.first().map(|a| a.trs),
            duration_ms: report.duration.as_millis() as u64,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_accepts_aliases() {
        assert_eq!("pr".parse::<ContentType>().unwrap(), ContentType::PressRelease);
        assert_eq!(
            "external".parse::<ContentType>().unwrap(),
            ContentType::PressRelease
        );
        assert_eq!(
            "internal_comms".parse::<ContentType>().unwrap(),
            ContentType::InternalComms
        );
        assert!("blogpost".parse::<ContentType>().is_err());
    }

    #[test]
    fn params_blank_values_do_not_count_as_present() {
        let mut params = RequestParams::new();
        params.set("title", "   ");
        assert!(!params.has("title"));
        params.set("title", "Office closed");
        assert!(params.has("title"));
    }

    #[test]
    fn values_blob_is_space_padded_and_lowercased() {
        let params = RequestParams::from_pairs([("headline", "Community Giveback")]);
        assert!(params.values_blob().contains(" community giveback "));
    }

    #[test]
    fn attempt_kind_renders_like_log_lines() {
        assert_eq!(AttemptKind::Initial.to_string(), "initial");
        assert_eq!(AttemptKind::Revise(2).to_string(), "revise#2");
    }

    #[test]
    fn run_event_flattens_report() {
        let report = PipelineReport {
            run_id: Uuid::new_v4(),
            content_type: ContentType::Microcopy,
            log: vec![],
            attempts: vec![Attempt {
                kind: AttemptKind::Initial,
                trs: 70,
                verdict: Verdict::Fail,
                latency: Duration::from_millis(300),
            }],
            duration: Duration::from_millis(1234),
            outcome: RunOutcome::Delivered {
                text: "Pay now".into(),
                scoring: TrsResult {
                    trs: 82,
                    verdict: Verdict::Pass,
                    breakdown: ScoreBreakdown {
                        rules: 38,
                        lexicon: 14,
                        critic: 30,
                        critic_detail: String::new(),
                    },
                },
            },
        };

        let event = RunEvent::from_report(&report);
        assert_eq!(event.attempt_count, 1);
        assert_eq!(event.trs_initial, Some(70));
        assert_eq!(event.trs_final, Some(82));
        assert_eq!(event.verdict_final, Some(Verdict::Pass));
        assert_eq!(event.duration_ms, 1234);
    }
}
