use serde::{Deserialize, Serialize};

use crate::result::{MatchResult, Threshold};

/// Reason recorded when the service answered but found no comparable pairing.
pub const NO_VALID_SIMILARITIES: &str = "no_valid_similarities_found";
/// Reason recorded when there was no service answer to aggregate at all.
pub const SERVICE_CALL_FAILED: &str = "service_call_failed";

/// One document-face / live-face pairing reported by the service.
/// The similarity always lies in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FaceComparison {
    similarity: f32,
    document_face: Option<u32>,
    live_face: Option<u32>,
}

impl FaceComparison {
    /// Out-of-range scores are clamped; NaN counts as no similarity.
    pub fn new(similarity: f32) -> Self {
        let similarity = if similarity.is_nan() {
            0.0
        } else {
            similarity.clamp(0.0, 1.0)
        };
        Self {
            similarity,
            document_face: None,
            live_face: None,
        }
    }

    /// Face indices within the document and live image, when reported.
    pub fn with_faces(mut self, document_face: Option<u32>, live_face: Option<u32>) -> Self {
        self.document_face = document_face;
        self.live_face = live_face;
        self
    }

    pub fn similarity(&self) -> f32 {
        self.similarity
    }

    pub fn document_face(&self) -> Option<u32> {
        self.document_face
    }

    pub fn live_face(&self) -> Option<u32> {
        self.live_face
    }
}

/// Which statistic over all pairings feeds the decision.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScorePolicy {
    /// Highest similarity over every pairing, ghost portraits included.
    #[default]
    Best,
    /// Mean over every pairing. More conservative, never the default.
    Average,
}

impl ScorePolicy {
    fn label(self) -> &'static str {
        match self {
            ScorePolicy::Best => "best",
            ScorePolicy::Average => "average",
        }
    }
}

/// Collapse all pairwise scores of one response into a single result.
///
/// `None` means there was no service answer; `Some(&[])` means the service
/// answered and found nothing comparable. The two produce different reasons.
pub fn aggregate(
    comparisons: Option<&[FaceComparison]>,
    threshold: Threshold,
    policy: ScorePolicy,
) -> MatchResult {
    let comparisons = match comparisons {
        Some(c) => c,
        None => return MatchResult::failure(SERVICE_CALL_FAILED, threshold),
    };

    if comparisons.is_empty() {
        return MatchResult::scored(
            0.0,
            Vec::new(),
            threshold,
            policy,
            NO_VALID_SIMILARITIES.to_string(),
        );
    }

    let all: Vec<f32> = comparisons.iter().map(FaceComparison::similarity).collect();
    let score = match policy {
        ScorePolicy::Best => all.iter().copied().fold(0.0f32, f32::max),
        ScorePolicy::Average => all.iter().sum::<f32>() / all.len() as f32,
    };

    let mut reason = if threshold.accepts(score) {
        "ok".to_string()
    } else {
        format!("below threshold {threshold}")
    };
    if all.len() > 1 {
        reason.push_str(&format!(
            " ({} of {} face comparisons)",
            policy.label(),
            all.len()
        ));
    }

    MatchResult::scored(score, all, threshold, policy, reason)
}
