use std::time::Duration;

use log::{debug, info, warn};
use rand::Rng;
use serde_json::{json, Value};

use crate::aggregate::{aggregate, FaceComparison, ScorePolicy};
use crate::backoff::{Backoff, FailureClass};
use crate::config::ClientConfig;
use crate::deadline::{Deadline, Interrupt};
use crate::error::MatchError;
use crate::result::{MatchResult, Threshold};
use crate::transport::{HttpTransport, Transport};
use crate::wire::{parse_payload, MatchRequest, Payload};

/// HTTP statuses that signal a busy or flaky service rather than a bad request.
pub const RETRYABLE_STATUS: [u16; 4] = [429, 502, 503, 504];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const API_METHOD: &str = "direct_rest";
const DETECTION_MODE: &str = "all_faces_in_both_images";

/// Compare the faces of a document image against a live image.
///
/// Service and network failures come back as a terminal [`MatchResult`];
/// only cancellation, deadlines and local setup problems are errors.
pub trait FaceMatcher: Send + Sync {
    fn match_faces(
        &self,
        document: &[u8],
        live: &[u8],
        threshold: Threshold,
        deadline: &Deadline,
    ) -> Result<MatchResult, MatchError>;
}

/// Outcome of one request.
enum Attempt {
    Scored { comparisons: Vec<FaceComparison>, raw: Value },
    Retry { class: FailureClass, tag: String, detail: String },
    Fatal { status: u16, body: String },
}

/// REST client for the `/api/match` endpoint.
pub struct RestMatchClient<T = HttpTransport> {
    transport: T,
    config: ClientConfig,
    backoff: Backoff,
    policy: ScorePolicy,
}

impl RestMatchClient<HttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self, MatchError> {
        let transport = HttpTransport::new(CONNECT_TIMEOUT)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport> RestMatchClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            backoff: Backoff::from_config(&config),
            transport,
            config,
            policy: ScorePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: ScorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    fn attempt(&self, url: &str, body: &[u8], attempt: u32, deadline: &Deadline) -> Attempt {
        let timeout = deadline.clamp(self.config.attempt_timeout(attempt));
        debug!(
            "POST {} (attempt {}, timeout {:?}, {} bytes)",
            url,
            attempt + 1,
            timeout,
            body.len()
        );

        let reply = match self.transport.post_json(url, body, timeout) {
            Ok(reply) => reply,
            Err(e) => {
                return Attempt::Retry {
                    class: FailureClass::Network,
                    tag: e.reason_tag().to_string(),
                    detail: e.to_string(),
                }
            }
        };

        if reply.status == 200 {
            return match parse_payload(&reply.body) {
                Ok(Payload::Comparisons { comparisons, raw }) => {
                    Attempt::Scored { comparisons, raw }
                }
                Ok(Payload::Empty { .. }) => Attempt::Retry {
                    class: FailureClass::Overload,
                    tag: "empty_response".to_string(),
                    detail: "response carried no result list".to_string(),
                },
                Err(e) => Attempt::Retry {
                    class: FailureClass::Overload,
                    tag: "invalid_json_response".to_string(),
                    detail: e.to_string(),
                },
            };
        }

        if RETRYABLE_STATUS.contains(&reply.status) {
            Attempt::Retry {
                class: FailureClass::Network,
                tag: format!("http_{}", reply.status),
                detail: reply.body_text(),
            }
        } else {
            Attempt::Fatal {
                status: reply.status,
                body: reply.body_text(),
            }
        }
    }
}

fn interrupted(interrupt: Interrupt, attempts: u32) -> MatchError {
    match interrupt {
        Interrupt::Cancelled => MatchError::Cancelled,
        Interrupt::Expired => MatchError::DeadlineExceeded { attempts },
    }
}

impl<T: Transport> FaceMatcher for RestMatchClient<T> {
    fn match_faces(
        &self,
        document: &[u8],
        live: &[u8],
        threshold: Threshold,
        deadline: &Deadline,
    ) -> Result<MatchResult, MatchError> {
        let url = self.config.match_url();
        let request = MatchRequest::new(document, live, &self.config);
        let body = serde_json::to_vec(&request).map_err(|e| MatchError::Encode(e.to_string()))?;
        let max_attempts = self.config.max_attempts.max(1);
        let mut last_failure: Option<(String, String)> = None;

        for attempt in 0..max_attempts {
            deadline.check().map_err(|i| interrupted(i, attempt))?;

            match self.attempt(&url, &body, attempt, deadline) {
                Attempt::Scored { comparisons, raw } => {
                    let result = aggregate(Some(&comparisons), threshold, self.policy);
                    info!(
                        "match scored {:.3} over {} comparison(s): {}",
                        result.similarity(),
                        result.comparison_count(),
                        result.reason()
                    );
                    let meta = json!({
                        "api_method": API_METHOD,
                        "detection_mode": DETECTION_MODE,
                        "attempts": attempt + 1,
                        "average_similarity": result.average_similarity(),
                        "raw_response": raw,
                    });
                    return Ok(result.with_meta(meta));
                }
                Attempt::Fatal { status, body } => {
                    warn!("match service rejected request with HTTP {}: {}", status, body);
                    let meta = json!({
                        "api_method": API_METHOD,
                        "attempts": attempt + 1,
                        "status": status,
                        "error": body,
                    });
                    return Ok(MatchResult::failure(format!("http_{status}"), threshold)
                        .with_meta(meta));
                }
                Attempt::Retry { class, tag, detail } => {
                    warn!(
                        "attempt {}/{} failed ({}): {}",
                        attempt + 1,
                        max_attempts,
                        tag,
                        detail
                    );
                    deadline.check().map_err(|i| interrupted(i, attempt + 1))?;
                    if attempt + 1 < max_attempts {
                        let jitter: f64 = rand::thread_rng().gen();
                        let wait = self.backoff.wait(class, attempt, jitter);
                        debug!("retrying in {:?}", wait);
                        deadline.sleep(wait).map_err(|i| interrupted(i, attempt + 1))?;
                    }
                    last_failure = Some((tag, detail));
                }
            }
        }

        let (tag, detail) =
            last_failure.unwrap_or_else(|| ("service_call_failed".into(), String::new()));
        let reason = format!("{tag}_exceeded");
        warn!("giving up after {} attempt(s): {}", max_attempts, reason);
        let meta = json!({
            "api_method": API_METHOD,
            "attempts": max_attempts,
            "error": detail,
        });
        Ok(MatchResult::failure(reason, threshold).with_meta(meta))
    }
}
