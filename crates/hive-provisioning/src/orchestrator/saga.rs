//! Compensation bookkeeping for multi-step workflows.
//!
//! Each step that leaves a durable effect registers the action that undoes
//! it. On failure the registered actions run newest-first; a failing action
//! does not stop the remaining ones, and every failure is reported next to
//! the error that triggered the rollback.

use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::error::{CompensationFailure, Error};
use crate::provisioner::{DeprovisionRequest, EnvironmentProvisioner};
use crate::storage::CourseRepository;

/// Undo action for one completed step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Compensation {
    /// Remove the assignment row written by the first step.
    DeleteAssignment { assignment_id: String },
    /// Tear down a remote environment, one request per participant.
    Deprovision { requests: Vec<DeprovisionRequest> },
}

impl Compensation {
    fn describe(&self) -> String {
        match self {
            Self::DeleteAssignment { assignment_id } => format!("delete assignment {assignment_id}"),
            Self::Deprovision { requests } => requests.first().map_or_else(
                || "deprovision environment".to_string(),
                |r| format!("deprovision {}/{}", r.course_name, r.assignment_name),
            ),
        }
    }
}

/// An in-flight workflow and the compensations its completed steps declared.
#[derive(Debug)]
pub struct Saga {
    name: &'static str,
    compensations: Vec<Compensation>,
}

impl Saga {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            compensations: Vec::new(),
        }
    }

    /// Record the undo action for a step that just succeeded.
    pub fn register(&mut self, compensation: Compensation) {
        debug!(saga = self.name, action = %compensation.describe(), "Compensation registered");
        self.compensations.push(compensation);
    }

    /// All steps succeeded; drop the compensations.
    pub fn complete(self) {
        debug!(saga = self.name, steps = self.compensations.len(), "Saga completed");
    }

    /// Roll back every completed step and produce the error to return.
    ///
    /// Yields `cause` unchanged when every compensation succeeded, and
    /// `Error::CompensationFailed` wrapping `cause` otherwise.
    pub async fn abort<R, P>(
        self,
        cause: Error,
        repo: &R,
        provisioner: &P,
        timeout: Duration,
    ) -> Error
    where
        R: CourseRepository,
        P: EnvironmentProvisioner,
    {
        warn!(saga = self.name, error = %cause, steps = self.compensations.len(), "Rolling back");

        let mut failures = Vec::new();
        for compensation in self.compensations.into_iter().rev() {
            let action = compensation.describe();
            match compensation {
                Compensation::DeleteAssignment { assignment_id } => {
                    match repo.delete_assignment(&assignment_id).await {
                        Ok(_) => info!(%assignment_id, "Assignment rolled back"),
                        // Already gone: the compensation's goal holds.
                        Err(e) if e.is_not_found() => {
                            debug!(%assignment_id, "Assignment already removed");
                        }
                        Err(e) => failures.push(CompensationFailure {
                            action,
                            error: e.to_string(),
                        }),
                    }
                }
                Compensation::Deprovision { requests } => {
                    for req in requests {
                        if let Err(e) = provisioner.deprovision(&req, timeout).await {
                            failures.push(CompensationFailure {
                                action: format!("{action} for {}", req.net_id),
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        if failures.is_empty() {
            cause
        } else {
            for failure in &failures {
                error!(saga = self.name, %failure, "Compensation failed");
            }
            Error::CompensationFailed {
                cause: Box::new(cause),
                failures,
            }
        }
    }
}
