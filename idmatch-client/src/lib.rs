pub mod aggregate;
pub mod backoff;
pub mod client;
pub mod config;
pub mod deadline;
pub mod error;
pub mod result;
pub mod transport;
pub mod wire;

// Re-export commonly used types
pub use aggregate::{aggregate, FaceComparison, ScorePolicy};
pub use client::{FaceMatcher, RestMatchClient};
pub use config::ClientConfig;
pub use deadline::{CancelFlag, Deadline};
pub use error::{MatchError, TransportError};
pub use result::{MatchResult, Threshold};
pub use transport::{HttpReply, HttpTransport, Transport};
