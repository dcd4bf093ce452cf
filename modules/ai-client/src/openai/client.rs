use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::types::{ChatRequest, ChatResponse};
use crate::error::GenerateError;

const MAX_ERROR_BODY_BYTES: usize = 240;
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);

/// Wire-level client: one POST, one retry on 429, latency measured around
/// the whole exchange.
pub(crate) struct OpenAiHttp {
    http: reqwest::Client,
    url: String,
}

impl OpenAiHttp {
    pub fn new(url: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
        }
    }

    pub async fn chat(
        &self,
        request: &ChatRequest,
    ) -> Result<(ChatResponse, Duration), GenerateError> {
        let started = Instant::now();

        debug!(model = %request.model, url = %self.url, "generation request");

        let mut response = self.post(request).await?;

        if response.status().as_u16() == 429 {
            let backoff = retry_after(&response).unwrap_or(RATE_LIMIT_BACKOFF);
            warn!(backoff_ms = backoff.as_millis() as u64, "rate limited, retrying once");
            sleep(backoff).await;
            response = self.post(request).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerateError::Http {
                status: status.as_u16(),
                body: truncate(&body, MAX_ERROR_BODY_BYTES).to_string(),
            });
        }

        let parsed = response
            .json::<ChatResponse>()
            .await
            .map_err(|e| GenerateError::MalformedBody(e.to_string()))?;

        Ok((parsed, started.elapsed()))
    }

    async fn post(&self, request: &ChatRequest) -> Result<reqwest::Response, GenerateError> {
        self.http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| GenerateError::Network(e.to_string()))
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    let seconds: u64 = response
        .headers()
        .get("retry-after")?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()?;
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

/// Truncate to at most `max_bytes` at a character boundary.
fn truncate(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while !s.is_char_boundary(end) && end > 0 {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "error 世界 body";
        let cut = truncate(text, 8);
        assert!(cut.len() <= 8);
        assert!(text.starts_with(cut));
    }

    #[test]
    fn truncate_passes_short_strings_through() {
        assert_eq!(truncate("short", 240), "short");
    }
}
