use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Shared flag a caller raises to abandon in-flight matches.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Why a call stopped before producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    Cancelled,
    Expired,
}

/// Caller-supplied bound on one match call.
#[derive(Debug, Clone, Default)]
pub struct Deadline {
    at: Option<Instant>,
    cancel: Option<CancelFlag>,
}

impl Deadline {
    /// No time limit and no cancellation.
    pub fn none() -> Self {
        Self::default()
    }

    /// A timeout too large to represent means no deadline at all.
    pub fn within(timeout: Duration) -> Self {
        Self {
            at: Instant::now().checked_add(timeout),
            cancel: None,
        }
    }

    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at
            .map(|at| at.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> Result<(), Interrupt> {
        if self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
            return Err(Interrupt::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(Interrupt::Expired),
            _ => Ok(()),
        }
    }

    /// Shrink `timeout` so a request never outlives the deadline.
    pub fn clamp(&self, timeout: Duration) -> Duration {
        match self.remaining() {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }

    /// Sleep for `wait`, waking early if cancelled or out of time.
    pub fn sleep(&self, wait: Duration) -> Result<(), Interrupt> {
        // an unrepresentable wake-up time sleeps until interrupted
        let until = Instant::now().checked_add(wait);
        loop {
            self.check()?;
            let now = Instant::now();
            let mut slice = match until {
                Some(until) if now >= until => return Ok(()),
                Some(until) => (until - now).min(SLEEP_SLICE),
                None => SLEEP_SLICE,
            };
            if let Some(left) = self.remaining() {
                slice = slice.min(left);
            }
            std::thread::sleep(slice);
        }
    }
}
