//! Error taxonomy for the provisioning workflow.

use std::fmt;

use thiserror::Error;

use crate::provisioner::ProvisionError;
use crate::storage::DatabaseError;

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the orchestrator. Nothing here is retried
/// internally; each variant names the step and the record involved.
#[derive(Debug, Error)]
pub enum Error {
    #[error("course not found: {0}")]
    CourseNotFound(String),

    #[error("assignment not found: {0}")]
    AssignmentNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provisioner call failed; the assignment was rolled back.
    #[error("provisioning failed for assignment {assignment:?} in course {course}: {source}")]
    ProvisioningFailed {
        assignment: String,
        course: String,
        #[source]
        source: ProvisionError,
    },

    /// Remote teardown failed; the assignment and environment records were kept.
    #[error("deprovisioning failed for assignment {assignment_id}: {source}")]
    DeprovisioningFailed {
        assignment_id: String,
        #[source]
        source: ProvisionError,
    },

    /// A rollback action failed after `cause`. Both are reported.
    #[error("{cause}; compensation also failed: {}", CompensationFailures(.failures))]
    CompensationFailed {
        cause: Box<Error>,
        failures: Vec<CompensationFailure>,
    },

    #[error("storage error during {step}: {source}")]
    Repository {
        step: &'static str,
        #[source]
        source: DatabaseError,
    },
}

impl Error {
    /// Stable snake-case name for API consumers.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::CourseNotFound(_) => "course_not_found",
            Self::AssignmentNotFound(_) => "assignment_not_found",
            Self::InvalidRequest(_) => "invalid_request",
            Self::ProvisioningFailed { .. } => "provisioning_failed",
            Self::DeprovisioningFailed { .. } => "deprovisioning_failed",
            Self::CompensationFailed { .. } => "compensation_failed",
            Self::Repository { .. } => "repository_error",
        }
    }

    pub(crate) const fn repository(step: &'static str, source: DatabaseError) -> Self {
        Self::Repository { step, source }
    }

    /// The failure that started a rollback, looking through `CompensationFailed`.
    pub fn root_cause(&self) -> &Self {
        match self {
            Self::CompensationFailed { cause, .. } => cause.root_cause(),
            other => other,
        }
    }
}

/// One rollback action that could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompensationFailure {
    /// What was being undone, e.g. `delete assignment 3f2c...`.
    pub action: String,
    pub error: String,
}

impl fmt::Display for CompensationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.action, self.error)
    }
}

struct CompensationFailures<'a>(&'a [CompensationFailure]);

impl fmt::Display for CompensationFailures<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, failure) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{failure}")?;
        }
        Ok(())
    }
}
