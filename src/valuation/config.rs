use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_FINDING_URL: &str =
    "https://svcs.ebay.com/services/search/FindingService/v1";
pub const DEFAULT_SOLD_SEARCH_URL: &str = "https://www.ebay.com/sch/i.html";
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(7000);
pub const DEFAULT_MAX_CANDIDATES: usize = 5;

#[derive(Debug, Clone)]
pub struct FindingConfig {
    pub app_id: String,
    pub endpoint: String,
}

impl FindingConfig {
    pub fn from_env() -> Self {
        Self {
            app_id: env::var("EBAY_APP_ID").unwrap_or_default(),
            endpoint: env::var("EBAY_FINDING_URL")
                .unwrap_or_else(|_| DEFAULT_FINDING_URL.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search_url: String,
    pub wait_timeout: Duration,
    pub max_candidates: usize,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SOLD_SEARCH_URL.to_string(),
            wait_timeout: DEFAULT_WAIT_TIMEOUT,
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }
}

impl ScrapeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            search_url: env::var("EBAY_SOLD_SEARCH_URL").unwrap_or(defaults.search_url),
            wait_timeout: env::var("VALUE_WAIT_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|v| *v > 0)
                .map(Duration::from_millis)
                .unwrap_or(defaults.wait_timeout),
            max_candidates: max_candidates(env::var("VALUE_MAX_CANDIDATES").ok().as_deref()),
        }
    }
}

/// The override can only narrow the candidate window, never widen it past the default.
fn max_candidates(raw: Option<&str>) -> usize {
    raw.and_then(|v| v.trim().parse::<usize>().ok())
        .map(|v| v.clamp(1, DEFAULT_MAX_CANDIDATES))
        .unwrap_or(DEFAULT_MAX_CANDIDATES)
}

#[derive(Debug, Clone, Default)]
pub struct BrowserSettings {
    pub executable: Option<PathBuf>,
    pub no_sandbox: bool,
}

impl BrowserSettings {
    pub fn from_env() -> Self {
        Self {
            executable: env::var("CHROME_EXECUTABLE")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            no_sandbox: env::var("CHROME_NO_SANDBOX")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_override_stays_within_five() {
        assert_eq!(max_candidates(None), 5);
        assert_eq!(max_candidates(Some("3")), 3);
        assert_eq!(max_candidates(Some("50")), 5);
        assert_eq!(max_candidates(Some("0")), 1);
        assert_eq!(max_candidates(Some("many")), 5);
    }
}
