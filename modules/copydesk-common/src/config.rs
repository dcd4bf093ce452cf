use std::env;
use std::time::Duration;

/// Default floor spacing between outbound generation calls.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 900;
/// Default total attempt cap (initial generation plus revisions).
pub const DEFAULT_MAX_ATTEMPTS: u32 = 6;
/// Default wall-clock budget for one run.
pub const DEFAULT_WALL_CLOCK_MS: u64 = 45_000;

/// Runtime configuration loaded from `COPYDESK_*` environment variables.
///
/// Endpoint and model stay optional here: the generation client reports
/// `NoEndpoint`/`NoModel` as typed call failures instead of the process
/// refusing to boot.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub corpus_base_url: Option<String>,
    pub min_interval: Duration,
    pub max_attempts: u32,
    pub wall_clock_budget: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            endpoint: optional_env("COPYDESK_ENDPOINT"),
            model: optional_env("COPYDESK_MODEL"),
            corpus_base_url: optional_env("COPYDESK_CORPUS_BASE_URL"),
            min_interval: Duration::from_millis(env_u64(
                "COPYDESK_MIN_INTERVAL_MS",
                DEFAULT_MIN_INTERVAL_MS,
            )),
            max_attempts: env_u64("COPYDESK_MAX_ATTEMPTS", u64::from(DEFAULT_MAX_ATTEMPTS)) as u32,
            wall_clock_budget: Duration::from_millis(env_u64(
                "COPYDESK_WALL_CLOCK_MS",
                DEFAULT_WALL_CLOCK_MS,
            )),
        }
    }
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
