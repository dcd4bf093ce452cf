use serde::Deserialize;

/// The shapes a critic reply has been observed to arrive in.
///
/// All field-probing happens here, at the client boundary; scoring code
/// matches on the variant instead of re-parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum CriticReply {
    /// Strict JSON `{"score": <n>, "detail": "…"}`.
    Structured { score: f64, detail: String },
    /// Anything else non-empty the model said.
    PlainText(String),
    /// Nothing usable after stripping fences and whitespace.
    Empty,
}

#[derive(Deserialize)]
struct ReplyWire {
    score: serde_json::Value,
    #[serde(default)]
    detail: Option<String>,
}

/// Normalize a raw model reply into one [`CriticReply`] variant.
///
/// Strips markdown code fences, then attempts a strict JSON parse. A JSON
/// object whose `score` does not coerce to a finite number is demoted to
/// `PlainText` so the caller's numeric-token fallback can still run.
pub fn normalize_reply(raw: &str) -> CriticReply {
    let text = strip_code_fences(raw);
    if text.is_empty() {
        return CriticReply::Empty;
    }

    if let Ok(wire) = serde_json::from_str::<ReplyWire>(text) {
        if let Some(score) = coerce_number(&wire.score) {
            return CriticReply::Structured {
                score,
                detail: wire.detail.unwrap_or_default(),
            };
        }
    }

    CriticReply::PlainText(text.to_string())
}

fn coerce_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();
    for opener in ["```json", "```JSON", "```"] {
        if let Some(rest) = text.strip_prefix(opener) {
            text = rest;
            break;
        }
    }
    text.trim_end_matches("```").trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strict_json_parses() {
        let reply = normalize_reply(r#"{"score": 34, "detail": "clear and short"}"#);
        assert_eq!(
            reply,
            CriticReply::Structured {
                score: 34.0,
                detail: "clear and short".into()
            }
        );
    }

    #[test]
    fn fenced_json_parses() {
        let reply = normalize_reply("```json\n{\"score\": 28, \"detail\": \"ok\"}\n```");
        assert!(matches!(reply, CriticReply::Structured { score, .. } if score == 28.0));
    }

    #[test]
    fn string_score_coerces() {
        let reply = normalize_reply(r#"{"score": "31", "detail": ""}"#);
        assert!(matches!(reply, CriticReply::Structured { score, .. } if score == 31.0));
    }

    #[test]
    fn missing_detail_defaults_empty() {
        let reply = normalize_reply(r#"{"score": 20}"#);
        assert_eq!(
            reply,
            CriticReply::Structured {
                score: 20.0,
                detail: String::new()
            }
        );
    }

    #[test]
    fn prose_falls_back_to_plain_text() {
        let reply = normalize_reply("I'd give this a 25 out of 40.");
        assert_eq!(reply, CriticReply::PlainText("I'd give this a 25 out of 40.".into()));
    }

    #[test]
    fn non_numeric_score_demotes_to_plain_text() {
        let reply = normalize_reply(r#"{"score": "great", "detail": "nice"}"#);
        assert!(matches!(reply, CriticReply::PlainText(_)));
    }

    #[test]
    fn blank_reply_is_empty() {
        assert_eq!(normalize_reply("   "), CriticReply::Empty);
        assert_eq!(normalize_reply("```\n```"), CriticReply::Empty);
    }
}
