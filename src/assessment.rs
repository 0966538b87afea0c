use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Ends the subject identifier at the start of a file name.
pub const ID_SEPARATOR: char = '_';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Assessment {
    TruePositive,
    TrueNegative,
    FalseNegative,
    FalsePositive,
    Error,
}

impl Assessment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Assessment::TruePositive => "true_positive",
            Assessment::TrueNegative => "true_negative",
            Assessment::FalseNegative => "false_negative",
            Assessment::FalsePositive => "false_positive",
            Assessment::Error => "error",
        }
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(should_match: bool, decision: bool) -> Assessment {
    match (should_match, decision) {
        (true, true) => Assessment::TruePositive,
        (false, false) => Assessment::TrueNegative,
        (true, false) => Assessment::FalseNegative,
        (false, true) => Assessment::FalsePositive,
    }
}

/// Identifier encoded at the front of a file name: `042_passport.jpg` -> `042`.
pub fn subject_key(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    stem.split(ID_SEPARATOR).next().unwrap_or_default().to_string()
}

/// Ground truth: both files carry the same non-empty identifier.
pub fn should_match(document: &Path, live: &Path) -> bool {
    let a = subject_key(document);
    let b = subject_key(live);
    !a.is_empty() && a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truth_table() {
        assert_eq!(classify(true, true).as_str(), "true_positive");
        assert_eq!(classify(false, false).as_str(), "true_negative");
        assert_eq!(classify(true, false).as_str(), "false_negative");
        assert_eq!(classify(false, true).as_str(), "false_positive");
    }

    #[test]
    fn serializes_in_snake_case() {
        let json = serde_json::to_string(&Assessment::FalsePositive).unwrap();
        assert_eq!(json, "\"false_positive\"");
        assert_eq!(Assessment::Error.to_string(), "error");
    }

    #[test]
    fn subject_key_takes_prefix() {
        assert_eq!(subject_key(Path::new("/d/042_passport.jpg")), "042");
        assert_eq!(subject_key(Path::new("042-selfie.png")), "042-selfie");
        assert_eq!(subject_key(Path::new("AB-123_passport.jpg")), "AB-123");
        assert_eq!(subject_key(Path::new("0420.jpg")), "0420");
        assert_eq!(subject_key(Path::new("_selfie.jpg")), "");
    }

    #[test]
    fn should_match_requires_equal_non_empty_ids() {
        assert!(should_match(
            Path::new("042_passport.jpg"),
            Path::new("042_selfie.jpg")
        ));
        assert!(!should_match(
            Path::new("042_passport.jpg"),
            Path::new("043_selfie.jpg")
        ));
        assert!(!should_match(
            Path::new("AB-123_passport.jpg"),
            Path::new("AB-124_selfie.jpg")
        ));
        assert!(!should_match(
            Path::new("_passport.jpg"),
            Path::new("_selfie.jpg")
        ));
    }
}
