use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_BASE_URL: &str = "http://localhost:41101";

/// Connection and retry settings for the remote face-comparison service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service root; the match endpoint lives at `{base_url}/api/match`.
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Added to the request timeout once per previous attempt.
    pub timeout_step_secs: u64,
    pub max_attempts: u32,
    /// Unit of the exponential backoff for network-class failures.
    pub backoff_base_secs: f64,
    /// Fixed wait after an empty or unparsable payload.
    pub overload_wait_secs: f64,
    pub detect_all: bool,
    /// Image-source code sent with the document image.
    pub document_image_type: i32,
    /// Image-source code sent with the live image.
    pub live_image_type: i32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            timeout_step_secs: 10,
            max_attempts: 3,
            backoff_base_secs: 1.0,
            overload_wait_secs: 30.0,
            detect_all: true,
            document_image_type: 1,
            live_image_type: 1,
        }
    }
}

impl ClientConfig {
    pub fn match_url(&self) -> String {
        format!("{}/api/match", self.base_url.trim_end_matches('/'))
    }

    /// Per-attempt timeout: grows linearly so a loaded service gets more room.
    pub fn attempt_timeout(&self, attempt: u32) -> Duration {
        let step = self.timeout_step_secs.saturating_mul(u64::from(attempt));
        Duration::from_secs(self.request_timeout_secs.saturating_add(step))
    }

    /// Longest a single call can block when every attempt times out.
    pub fn worst_case_duration(&self) -> Duration {
        (0..self.max_attempts)
            .map(|a| self.attempt_timeout(a))
            .fold(Duration::ZERO, Duration::saturating_add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_url_tolerates_trailing_slash() {
        let cfg = ClientConfig {
            base_url: "http://face:41101/".into(),
            ..Default::default()
        };
        assert_eq!(cfg.match_url(), "http://face:41101/api/match");
    }

    #[test]
    fn attempt_timeout_grows_linearly() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.attempt_timeout(0), Duration::from_secs(30));
        assert_eq!(cfg.attempt_timeout(1), Duration::from_secs(40));
        assert_eq!(cfg.attempt_timeout(2), Duration::from_secs(50));
        assert_eq!(cfg.worst_case_duration(), Duration::from_secs(120));
    }

    #[test]
    fn huge_timeouts_saturate() {
        let cfg = ClientConfig {
            request_timeout_secs: u64::MAX,
            timeout_step_secs: u64::MAX,
            max_attempts: 4,
            ..Default::default()
        };
        assert_eq!(cfg.attempt_timeout(3), Duration::from_secs(u64::MAX));
        assert_eq!(cfg.worst_case_duration(), Duration::MAX);
    }

    #[test]
    fn partial_toml_style_input_keeps_defaults() {
        let cfg: ClientConfig =
            serde_json::from_str(r#"{"base_url":"http://x","max_attempts":5}"#).unwrap();
        assert_eq!(cfg.max_attempts, 5);
        assert_eq!(cfg.request_timeout_secs, 30);
        assert!(cfg.detect_all);
    }
}
