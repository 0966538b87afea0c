use crate::images::{list_image_files, list_subject_dirs};
use crate::pairing::select_pair;
use crate::report::SubjectRecord;
use anyhow::{Context, Result};
use idmatch_client::{CancelFlag, Deadline, FaceMatcher, Threshold};
use log::{debug, info, warn};
use rayon::prelude::*;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub threshold: Threshold,
    /// Worker threads, and so the number of requests in flight.
    pub concurrency: usize,
    pub subject_timeout: Option<Duration>,
    pub cancel: Option<CancelFlag>,
}

impl BatchOptions {
    pub fn new(threshold: Threshold) -> Self {
        Self {
            threshold,
            concurrency: 1,
            subject_timeout: None,
            cancel: None,
        }
    }

    fn deadline(&self) -> Deadline {
        let deadline = match self.subject_timeout {
            Some(timeout) => Deadline::within(timeout),
            None => Deadline::none(),
        };
        match &self.cancel {
            Some(flag) => deadline.with_cancel(flag.clone()),
            None => deadline,
        }
    }
}

fn subject_id(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.display().to_string())
}

/// Pair, match and assess one subject directory. Never fails: every problem
/// ends up in the record's status.
pub fn process_subject<M>(dir: &Path, matcher: &M, opts: &BatchOptions) -> SubjectRecord
where
    M: FaceMatcher + ?Sized,
{
    let id = subject_id(dir);

    let images = match list_image_files(dir) {
        Ok(images) => images,
        Err(e) => {
            warn!("{}: {:#}", id, e);
            return SubjectRecord::failed(&id, None, &format!("{e:#}"));
        }
    };

    let pair = match select_pair(&images) {
        Ok(pair) => pair,
        Err(e) => {
            info!("{}: skipped ({})", id, e);
            return SubjectRecord::skipped(&id, e.cause());
        }
    };
    debug!(
        "{}: document={} live={}",
        id,
        pair.document.path.display(),
        pair.live.path.display()
    );

    let loaded = pair
        .document
        .read()
        .and_then(|doc| pair.live.read().map(|live| (doc, live)));
    let (document, live) = match loaded {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("{}: {:#}", id, e);
            return SubjectRecord::failed(&id, Some(&pair), &format!("{e:#}"));
        }
    };

    match matcher.match_faces(&document, &live, opts.threshold, &opts.deadline()) {
        Ok(result) => {
            let record = SubjectRecord::from_result(&id, &pair, &result);
            info!(
                "{}: similarity {:.3} decision {} ({})",
                id, record.similarity, record.decision, record.status
            );
            record
        }
        Err(e) => {
            warn!("{}: {}", id, e);
            SubjectRecord::failed(&id, Some(&pair), &e.to_string())
        }
    }
}

/// Process every subject directory under `root` on a bounded worker pool.
/// Records come back in subject-name order.
pub fn run_batch<M>(root: &Path, matcher: &M, opts: &BatchOptions) -> Result<Vec<SubjectRecord>>
where
    M: FaceMatcher + ?Sized,
{
    let dirs = list_subject_dirs(root)?;
    info!(
        "Processing {} subject(s) from {} with {} worker(s)",
        dirs.len(),
        root.display(),
        opts.concurrency
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.concurrency.max(1))
        .thread_name(|i| format!("idmatch-worker-{i}"))
        .build()
        .context("building worker pool")?;

    Ok(pool.install(|| {
        dirs.par_iter()
            .map(|dir| process_subject(dir, matcher, opts))
            .collect()
    }))
}
