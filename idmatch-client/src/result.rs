use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::aggregate::ScorePolicy;
use crate::error::MatchError;

/// Similarity threshold, guaranteed to lie in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f32", into = "f32")]
pub struct Threshold(f32);

impl Threshold {
    pub fn new(value: f32) -> Result<Self, MatchError> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(MatchError::InvalidThreshold(value))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    pub fn accepts(self, similarity: f32) -> bool {
        similarity >= self.0
    }
}

impl TryFrom<f32> for Threshold {
    type Error = MatchError;

    fn try_from(value: f32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Threshold> for f32 {
    fn from(t: Threshold) -> f32 {
        t.0
    }
}

impl std::fmt::Display for Threshold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Outcome of one document/live comparison.
///
/// Built only by the aggregator or as a terminal failure, so every field is
/// populated together and `decision == similarity >= threshold` holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    similarity: f32,
    best_similarity: f32,
    average_similarity: Option<f32>,
    threshold: f32,
    decision: bool,
    reason: String,
    comparison_count: usize,
    all_similarities: Vec<f32>,
    policy: ScorePolicy,
    failed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<Value>,
}

impl MatchResult {
    pub(crate) fn scored(
        similarity: f32,
        all_similarities: Vec<f32>,
        threshold: Threshold,
        policy: ScorePolicy,
        reason: String,
    ) -> Self {
        let best_similarity = all_similarities.iter().copied().fold(0.0f32, f32::max);
        let average_similarity = if all_similarities.is_empty() {
            None
        } else {
            Some(all_similarities.iter().sum::<f32>() / all_similarities.len() as f32)
        };
        Self {
            similarity,
            best_similarity,
            average_similarity,
            threshold: threshold.value(),
            decision: threshold.accepts(similarity),
            reason,
            comparison_count: all_similarities.len(),
            all_similarities,
            policy,
            failed: false,
            meta: None,
        }
    }

    /// Terminal result for a call that never produced comparable scores.
    pub fn failure(reason: impl Into<String>, threshold: Threshold) -> Self {
        Self {
            similarity: 0.0,
            best_similarity: 0.0,
            average_similarity: None,
            threshold: threshold.value(),
            decision: false,
            reason: reason.into(),
            comparison_count: 0,
            all_similarities: Vec::new(),
            policy: ScorePolicy::default(),
            failed: true,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Score the decision was taken on (the best score under the default policy).
    pub fn similarity(&self) -> f32 {
        self.similarity
    }

    pub fn best_similarity(&self) -> f32 {
        self.best_similarity
    }

    pub fn average_similarity(&self) -> Option<f32> {
        self.average_similarity
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn decision(&self) -> bool {
        self.decision
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn comparison_count(&self) -> usize {
        self.comparison_count
    }

    pub fn all_similarities(&self) -> &[f32] {
        &self.all_similarities
    }

    pub fn policy(&self) -> ScorePolicy {
        self.policy
    }

    /// True when the service call itself failed (retries exhausted or a
    /// permanent HTTP error), as opposed to a scored comparison.
    pub fn is_failure(&self) -> bool {
        self.failed
    }

    pub fn meta(&self) -> Option<&Value> {
        self.meta.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_rejects_out_of_range() {
        assert!(Threshold::new(-0.01).is_err());
        assert!(Threshold::new(1.01).is_err());
        assert!(Threshold::new(f32::NAN).is_err());
        assert!(Threshold::new(0.0).is_ok());
        assert!(Threshold::new(1.0).is_ok());
    }

    #[test]
    fn decision_matches_threshold_comparison() {
        let grid = [0.0f32, 0.25, 0.5, 0.85, 1.0];
        for &t in &grid {
            for &s in &grid {
                let threshold = Threshold::new(t).unwrap();
                let r = MatchResult::scored(s, vec![s], threshold, ScorePolicy::Best, "x".into());
                assert_eq!(r.decision(), s >= t, "s={s} t={t}");
            }
        }
    }

    #[test]
    fn boundary_equality_is_a_match() {
        let threshold = Threshold::new(0.85).unwrap();
        let r = MatchResult::scored(0.85, vec![0.85], threshold, ScorePolicy::Best, "ok".into());
        assert!(r.decision());
    }

    #[test]
    fn failure_is_fully_populated() {
        let r = MatchResult::failure("http_503_exceeded", Threshold::new(0.8).unwrap());
        assert!(r.is_failure());
        assert!(!r.decision());
        assert_eq!(r.similarity(), 0.0);
        assert_eq!(r.comparison_count(), 0);
        assert_eq!(r.reason(), "http_503_exceeded");
    }

    #[test]
    fn threshold_deserializes_with_validation() {
        let ok: Threshold = serde_json::from_str("0.8").unwrap();
        assert_eq!(ok.value(), 0.8);
        assert!(serde_json::from_str::<Threshold>("1.5").is_err());
    }
}
