use std::time::Duration;

use crate::config::ClientConfig;

/// Retryable failures fall into two classes with different wait curves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Rate limiting, gateway errors, timeouts and connection failures.
    Network,
    /// Service answered but the payload was empty or garbled: it is still busy.
    Overload,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base: f64,
    overload_wait: f64,
}

impl Backoff {
    pub fn new(base_secs: f64, overload_wait_secs: f64) -> Self {
        Self {
            base: base_secs.max(0.0),
            overload_wait: overload_wait_secs.max(0.0),
        }
    }

    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self::new(cfg.backoff_base_secs, cfg.overload_wait_secs)
    }

    /// Wait before retrying after a failed `attempt` (0-based).
    ///
    /// `jitter` is expected in `[0, 1)`; network waits are
    /// `base * (2^attempt + jitter)`, overload waits are fixed.
    pub fn wait(&self, class: FailureClass, attempt: u32, jitter: f64) -> Duration {
        let secs = match class {
            FailureClass::Network => {
                let exp = 2f64.powi(attempt.min(16) as i32);
                let jitter = if jitter.is_finite() { jitter.clamp(0.0, 1.0) } else { 0.0 };
                self.base * (exp + jitter)
            }
            FailureClass::Overload => self.overload_wait,
        };
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::from_config(&ClientConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_wait_grows_with_attempt() {
        let b = Backoff::default();
        // worst case jitter on the early attempt, none on the later one
        let early = b.wait(FailureClass::Network, 0, 0.999);
        let later = b.wait(FailureClass::Network, 2, 0.0);
        assert!(later > early);
        assert_eq!(later, Duration::from_secs(4));
    }

    #[test]
    fn unrepresentable_waits_saturate() {
        let b = Backoff::new(f64::MAX, f64::INFINITY);
        assert_eq!(b.wait(FailureClass::Network, 16, 0.5), Duration::MAX);
        assert_eq!(b.wait(FailureClass::Overload, 0, 0.0), Duration::MAX);
    }

    #[test]
    fn network_wait_stays_within_jitter_band() {
        let b = Backoff::new(1.0, 30.0);
        for attempt in 0..4 {
            for jitter in [0.0, 0.3, 0.999] {
                let w = b.wait(FailureClass::Network, attempt, jitter).as_secs_f64();
                let floor = 2f64.powi(attempt as i32);
                assert!(w >= floor && w < floor + 1.0, "attempt {attempt} wait {w}");
            }
        }
    }

    #[test]
    fn overload_wait_is_fixed() {
        let b = Backoff::new(1.0, 30.0);
        assert_eq!(b.wait(FailureClass::Overload, 0, 0.5), Duration::from_secs(30));
        assert_eq!(b.wait(FailureClass::Overload, 5, 0.1), Duration::from_secs(30));
    }

    #[test]
    fn zero_base_disables_waiting() {
        let b = Backoff::new(0.0, 0.0);
        assert_eq!(b.wait(FailureClass::Network, 3, 0.7), Duration::ZERO);
        assert_eq!(b.wait(FailureClass::Overload, 3, 0.7), Duration::ZERO);
    }
}
