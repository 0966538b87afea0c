use anyhow::{Context, Result};
use idmatch_client::{ClientConfig, ScorePolicy, Threshold};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound for any configured timeout, in seconds.
pub const MAX_TIMEOUT_SECS: u64 = 24 * 60 * 60;

pub static CONFIG_PATH: Lazy<&'static Path> = Lazy::new(|| {
    Path::new(option_env!("IDMATCH_CONFIG_PATH").unwrap_or("/usr/local/etc/idmatch/config.toml"))
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one sub-directory per subject.
    pub data_root: PathBuf,
    /// JSON Lines destination; stdout when unset.
    pub output: Option<PathBuf>,
    pub threshold: f32,
    /// Subjects processed at once, which also bounds in-flight requests.
    pub concurrency: usize,
    pub subject_timeout_secs: Option<u64>,
    pub policy: ScorePolicy,
    pub client: ClientConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            output: None,
            threshold: 0.80,
            concurrency: 4,
            subject_timeout_secs: None,
            policy: ScorePolicy::Best,
            client: ClientConfig::default(),
        }
    }
}

impl Config {
    pub fn threshold(&self) -> Result<Threshold> {
        Threshold::new(self.threshold).context("invalid threshold")
    }

    pub fn subject_timeout(&self) -> Option<Duration> {
        self.subject_timeout_secs.map(Duration::from_secs)
    }

    /// Apply overrides from `lookup`, which is `std::env::var` outside tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FACE_API_URL") {
            self.client.base_url = url;
        }
        if let Some(raw) = lookup("FACE_MATCH_THRESHOLD") {
            self.threshold = raw
                .trim()
                .parse()
                .with_context(|| format!("parsing FACE_MATCH_THRESHOLD={raw:?}"))?;
        }
        if let Some(root) = lookup("DATA_ROOT") {
            self.data_root = PathBuf::from(root);
        }
        if let Some(out) = lookup("RESULTS_PATH") {
            self.output = Some(PathBuf::from(out));
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.threshold()?;
        if self.client.max_attempts == 0 {
            anyhow::bail!("client.max_attempts must be at least 1");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        let timeouts = [
            ("client.request_timeout_secs", Some(self.client.request_timeout_secs)),
            ("client.timeout_step_secs", Some(self.client.timeout_step_secs)),
            ("subject_timeout_secs", self.subject_timeout_secs),
        ];
        for (name, secs) in timeouts {
            if secs.is_some_and(|s| s > MAX_TIMEOUT_SECS) {
                anyhow::bail!("{name} must be at most {MAX_TIMEOUT_SECS}");
            }
        }
        if self.client.backoff_base_secs > MAX_TIMEOUT_SECS as f64
            || self.client.overload_wait_secs > MAX_TIMEOUT_SECS as f64
        {
            anyhow::bail!("backoff waits must be at most {MAX_TIMEOUT_SECS} seconds");
        }
        if !(self.client.backoff_base_secs.is_finite() && self.client.backoff_base_secs >= 0.0) {
            anyhow::bail!("client.backoff_base_secs must be a non-negative number");
        }
        if !(self.client.overload_wait_secs.is_finite() && self.client.overload_wait_secs >= 0.0) {
            anyhow::bail!("client.overload_wait_secs must be a non-negative number");
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let mut cfg = if path.exists() {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config at {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))?
    } else {
        Config::default()
    };
    cfg.apply_env(|key| std::env::var(key).ok())?;
    cfg.validate()?;
    Ok(cfg)
}

pub fn save_config(cfg: &Config, path: Option<&Path>) -> Result<()> {
    let path = path.unwrap_or(&CONFIG_PATH);
    let data = toml::to_string_pretty(cfg)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_partial_toml() {
        let cfg: Config = toml::from_str(
            r#"
            threshold = 0.85
            policy = "average"

            [client]
            base_url = "http://face:41101"
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(cfg.threshold, 0.85);
        assert_eq!(cfg.policy, ScorePolicy::Average);
        assert_eq!(cfg.client.max_attempts, 5);
        assert_eq!(cfg.client.request_timeout_secs, 30);
        assert_eq!(cfg.concurrency, 4);
    }

    #[test]
    fn env_overrides_win() {
        let vars: HashMap<&str, &str> = [
            ("FACE_API_URL", "http://remote:9000"),
            ("FACE_MATCH_THRESHOLD", "0.9"),
            ("DATA_ROOT", "/srv/subjects"),
            ("RESULTS_PATH", "/tmp/out.jsonl"),
        ]
        .into_iter()
        .collect();
        let mut cfg = Config::default();
        cfg.apply_env(|k| vars.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(cfg.client.base_url, "http://remote:9000");
        assert_eq!(cfg.threshold, 0.9);
        assert_eq!(cfg.data_root, PathBuf::from("/srv/subjects"));
        assert_eq!(cfg.output, Some(PathBuf::from("/tmp/out.jsonl")));
    }

    #[test]
    fn bad_threshold_env_is_an_error() {
        let mut cfg = Config::default();
        assert!(cfg
            .apply_env(|k| (k == "FACE_MATCH_THRESHOLD").then(|| "high".to_string()))
            .is_err());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut cfg = Config {
            threshold: 1.5,
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        cfg.threshold = 0.8;
        cfg.concurrency = 0;
        assert!(cfg.validate().is_err());

        cfg.concurrency = 2;
        cfg.client.max_attempts = 0;
        assert!(cfg.validate().is_err());

        cfg.client.max_attempts = 3;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validation_bounds_timeouts() {
        let mut cfg = Config {
            subject_timeout_secs: Some(u64::MAX),
            ..Default::default()
        };
        assert!(cfg.validate().is_err());

        cfg.subject_timeout_secs = Some(MAX_TIMEOUT_SECS);
        assert!(cfg.validate().is_ok());

        cfg.client.request_timeout_secs = u64::MAX;
        assert!(cfg.validate().is_err());

        cfg.client.request_timeout_secs = 30;
        cfg.client.timeout_step_secs = MAX_TIMEOUT_SECS + 1;
        assert!(cfg.validate().is_err());

        cfg.client.timeout_step_secs = 10;
        cfg.client.overload_wait_secs = f64::MAX;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/config.toml");
        let cfg = Config {
            threshold: 0.7,
            subject_timeout_secs: Some(90),
            ..Default::default()
        };
        save_config(&cfg, Some(&path)).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let loaded: Config = toml::from_str(&raw).unwrap();
        assert_eq!(loaded, cfg);
    }
}
