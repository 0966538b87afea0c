pub mod assessment;
pub mod batch;
pub mod config;
pub mod images;
pub mod pairing;
pub mod report;

// Re-export client types for convenience
pub use idmatch_client::{
    ClientConfig, Deadline, FaceMatcher, MatchError, MatchResult, RestMatchClient, ScorePolicy,
    Threshold,
};
