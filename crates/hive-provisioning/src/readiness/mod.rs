//! Environment readiness discovery.
//!
//! The [`ReadinessPoller`] keeps one probing task per watched assignment and
//! publishes a [`ReadinessStatus`] for each. Probing is transport-level: any
//! answer from the environment's address counts as reachable.

mod poller;
mod probe;

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests;

use serde::{Deserialize, Serialize};

pub use poller::{PollerConfig, ReadinessPoller, StatusUpdate};
pub use probe::{HttpProbe, ReadinessProbe};

/// Reachability of one assignment's environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessStatus {
    Pending,
    Available,
}

impl ReadinessStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Available => "available",
        }
    }
}

impl std::fmt::Display for ReadinessStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
