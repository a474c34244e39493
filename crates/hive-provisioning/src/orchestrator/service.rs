//! The orchestrator itself: create, delete and list assignments.

use std::time::Duration;

use serde::Deserialize;
use tracing::{info, instrument, warn};

use super::saga::{Compensation, Saga};
use crate::error::{Error, Result};
use crate::provisioner::{DeprovisionRequest, EnvironmentProvisioner, ProvisionRequest};
use crate::storage::{
    Assignment, AssignmentWithEnvironment, Course, CourseRepository, DatabaseError,
    ProvisionedAssignment, environment_name,
};

/// Parameters of a create-assignment request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateAssignment {
    pub course_code: String,
    pub title: String,
    /// Container image reference the environment is built from.
    pub image: String,
    pub participant_ids: Vec<String>,
    pub description: Option<String>,
}

impl CreateAssignment {
    fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::InvalidRequest("title must not be empty".into()));
        }
        if self.image.trim().is_empty() {
            return Err(Error::InvalidRequest("image must not be empty".into()));
        }
        Ok(())
    }
}

/// Drives the provisioning workflow against a repository and a provisioner.
///
/// Holds no mutable state, so one instance serves concurrent requests. No
/// lock is held across the provisioner call: the assignment is visible to
/// readers, without an environment, while provisioning is in flight.
#[derive(Debug, Clone)]
pub struct Orchestrator<R, P> {
    repo: R,
    provisioner: P,
    provision_timeout: Duration,
}

impl<R, P> Orchestrator<R, P>
where
    R: CourseRepository,
    P: EnvironmentProvisioner,
{
    pub const fn new(repo: R, provisioner: P, provision_timeout: Duration) -> Self {
        Self {
            repo,
            provisioner,
            provision_timeout,
        }
    }

    pub const fn repository(&self) -> &R {
        &self.repo
    }

    pub const fn provisioner(&self) -> &P {
        &self.provisioner
    }

    /// Create an assignment and provision its environment.
    ///
    /// A single provisioning attempt is made. On failure the assignment
    /// written in step two is deleted before the error is returned.
    #[instrument(skip(self, req), fields(course = %req.course_code, title = %req.title))]
    pub async fn create_assignment(&self, req: CreateAssignment) -> Result<ProvisionedAssignment> {
        req.validate()?;

        let course = self.resolve_course(&req.course_code).await?;

        let mut saga = Saga::new("create_assignment");

        let assignment = self
            .repo
            .create_assignment(&course.id, &req.title, req.description.as_deref())
            .await
            .map_err(|e| Error::repository("create assignment", e))?;
        saga.register(Compensation::DeleteAssignment {
            assignment_id: assignment.id.clone(),
        });
        info!(assignment_id = %assignment.id, "Assignment created, provisioning environment");

        let provision = ProvisionRequest {
            assignment_name: req.title.clone(),
            course_name: course.name.clone(),
            net_ids: req.participant_ids.clone(),
            image: req.image.clone(),
        };
        let result = match self
            .provisioner
            .provision(&provision, self.provision_timeout)
            .await
        {
            Ok(result) => result,
            Err(source) => {
                let cause = Error::ProvisioningFailed {
                    assignment: req.title,
                    course: course.course_code,
                    source,
                };
                return Err(self.rollback(saga, cause).await);
            }
        };
        saga.register(Compensation::Deprovision {
            requests: deprovision_requests(&course, &assignment.title, &req.participant_ids),
        });

        let environment = match self
            .repo
            .create_environment(
                &assignment.id,
                &environment_name(&course.name, &assignment.title),
                &result.base_url,
                &req.participant_ids,
            )
            .await
        {
            Ok(environment) => environment,
            Err(e) => {
                let cause = Error::repository("create environment", e);
                return Err(self.rollback(saga, cause).await);
            }
        };
        saga.complete();

        info!(
            assignment_id = %assignment.id,
            base_url = %environment.base_url,
            "Environment provisioned"
        );
        Ok(ProvisionedAssignment {
            assignment,
            environment,
        })
    }

    /// Delete an assignment, tearing down its remote environment first.
    ///
    /// If teardown fails nothing is deleted, so the environment stays
    /// tracked and the delete can be retried.
    #[instrument(skip(self))]
    pub async fn delete_assignment(&self, assignment_id: &str) -> Result<Assignment> {
        let assignment = self
            .repo
            .get_assignment(assignment_id)
            .await
            .map_err(|e| {
                not_found_or(e, "get assignment", || {
                    Error::AssignmentNotFound(assignment_id.into())
                })
            })?;

        let environment = self
            .repo
            .get_environment_for_assignment(assignment_id)
            .await
            .map_err(|e| Error::repository("get environment", e))?;

        if let Some(environment) = environment {
            let course = self
                .repo
                .get_course(&assignment.course_id)
                .await
                .map_err(|e| Error::repository("get course", e))?;
            let mut remaining = environment.participants;
            while let Some(net_id) = remaining.first() {
                let req = DeprovisionRequest {
                    assignment_name: assignment.title.clone(),
                    course_name: course.name.clone(),
                    net_id: net_id.clone(),
                };
                self.provisioner
                    .deprovision(&req, self.provision_timeout)
                    .await
                    .map_err(|source| Error::DeprovisioningFailed {
                        assignment_id: assignment_id.into(),
                        source,
                    })?;
                // A retried delete resumes with the participants still live.
                remaining.remove(0);
                self.repo
                    .set_environment_participants(assignment_id, &remaining)
                    .await
                    .map_err(|e| Error::repository("record teardown", e))?;
            }
            info!(%assignment_id, "Environment torn down");
        }

        let deleted = self
            .repo
            .delete_assignment(assignment_id)
            .await
            .map_err(|e| {
                not_found_or(e, "delete assignment", || {
                    Error::AssignmentNotFound(assignment_id.into())
                })
            })?;
        info!(%assignment_id, "Assignment deleted");
        Ok(deleted)
    }

    /// Assignments of a course with their environments, oldest first.
    pub async fn list_assignments_for_course(
        &self,
        course_code: &str,
    ) -> Result<Vec<AssignmentWithEnvironment>> {
        let course = self.resolve_course(course_code).await?;
        self.repo
            .list_assignments_by_course(&course.id)
            .await
            .map_err(|e| Error::repository("list assignments", e))
    }

    async fn resolve_course(&self, course_code: &str) -> Result<Course> {
        self.repo
            .find_course_by_code(course_code)
            .await
            .map_err(|e| not_found_or(e, "find course", || Error::CourseNotFound(course_code.into())))
    }

    async fn rollback(&self, saga: Saga, cause: Error) -> Error {
        let err = saga
            .abort(cause, &self.repo, &self.provisioner, self.provision_timeout)
            .await;
        if matches!(err, Error::CompensationFailed { .. }) {
            warn!(error = %err, "Rollback incomplete");
        }
        err
    }
}

fn deprovision_requests(
    course: &Course,
    assignment_title: &str,
    participants: &[String],
) -> Vec<DeprovisionRequest> {
    participants
        .iter()
        .map(|net_id| DeprovisionRequest {
            assignment_name: assignment_title.to_string(),
            course_name: course.name.clone(),
            net_id: net_id.clone(),
        })
        .collect()
}

fn not_found_or(
    e: DatabaseError,
    step: &'static str,
    not_found: impl FnOnce() -> Error,
) -> Error {
    if e.is_not_found() {
        not_found()
    } else {
        Error::repository(step, e)
    }
}
