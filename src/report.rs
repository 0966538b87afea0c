use crate::assessment::{self, Assessment};
use crate::pairing::ImagePair;
use anyhow::{Context, Result};
use idmatch_client::MatchResult;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;

/// Processing status of one subject: `ok`, `skipped:<cause>` or `error:<detail>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Skipped(String),
    Error(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Ok => f.write_str("ok"),
            Status::Skipped(cause) => write!(f, "skipped:{cause}"),
            Status::Error(detail) => write!(f, "error:{detail}"),
        }
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One output row per subject directory.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectRecord {
    pub subject_id: String,
    pub document_path: Option<String>,
    pub live_path: Option<String>,
    pub document_id: Option<String>,
    pub live_id: Option<String>,
    pub should_match: bool,
    pub similarity: f32,
    pub decision: bool,
    pub reason: String,
    pub assessment: Option<Assessment>,
    pub comparison_count: usize,
    pub status: Status,
}

impl SubjectRecord {
    fn base(subject_id: &str, pair: Option<&ImagePair>, status: Status) -> Self {
        let path_str = |p: &std::path::Path| p.display().to_string();
        Self {
            subject_id: subject_id.to_string(),
            document_path: pair.map(|p| path_str(&p.document.path)),
            live_path: pair.map(|p| path_str(&p.live.path)),
            document_id: pair.map(|p| assessment::subject_key(&p.document.path)),
            live_id: pair.map(|p| assessment::subject_key(&p.live.path)),
            should_match: false,
            similarity: 0.0,
            decision: false,
            reason: String::new(),
            assessment: None,
            comparison_count: 0,
            status,
        }
    }

    /// Subject dropped before any request was made.
    pub fn skipped(subject_id: &str, cause: &str) -> Self {
        Self::base(subject_id, None, Status::Skipped(cause.to_string()))
    }

    /// Subject that could not be compared.
    pub fn failed(subject_id: &str, pair: Option<&ImagePair>, detail: &str) -> Self {
        let mut record = Self::base(subject_id, pair, Status::Error(detail.to_string()));
        record.reason = format!("error:{detail}");
        record.assessment = Some(Assessment::Error);
        record
    }

    /// Record for a completed service call. Failed calls keep their reason and
    /// are labelled as errors instead of being scored against ground truth.
    pub fn from_result(subject_id: &str, pair: &ImagePair, result: &MatchResult) -> Self {
        let should_match = assessment::should_match(&pair.document.path, &pair.live.path);
        let (status, verdict) = if result.is_failure() {
            (Status::Error(result.reason().to_string()), Assessment::Error)
        } else {
            (
                Status::Ok,
                assessment::classify(should_match, result.decision()),
            )
        };

        let mut record = Self::base(subject_id, Some(pair), status);
        record.should_match = should_match;
        record.similarity = result.similarity();
        record.decision = result.decision();
        record.reason = result.reason().to_string();
        record.assessment = Some(verdict);
        record.comparison_count = result.comparison_count();
        record
    }
}

/// Write one JSON object per line.
pub fn write_jsonl<W: Write>(records: &[SubjectRecord], mut out: W) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut out, record).context("serializing result record")?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

/// Tally over a finished batch.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub ok: usize,
    pub skipped: usize,
    pub errors: usize,
    pub assessments: BTreeMap<Assessment, usize>,
}

impl Summary {
    pub fn from_records(records: &[SubjectRecord]) -> Self {
        let mut summary = Summary {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            match record.status {
                Status::Ok => summary.ok += 1,
                Status::Skipped(_) => summary.skipped += 1,
                Status::Error(_) => summary.errors += 1,
            }
            if let Some(a) = record.assessment {
                *summary.assessments.entry(a).or_default() += 1;
            }
        }
        summary
    }

    pub fn count(&self, assessment: Assessment) -> usize {
        self.assessments.get(&assessment).copied().unwrap_or(0)
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} subject(s): {} ok, {} skipped, {} error(s)",
            self.total, self.ok, self.skipped, self.errors
        )?;
        for (assessment, n) in &self.assessments {
            write!(f, ", {assessment}={n}")?;
        }
        Ok(())
    }
}
