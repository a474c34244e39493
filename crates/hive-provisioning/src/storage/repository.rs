//! Repository abstraction consumed by the orchestrator.

use std::future::Future;

use super::db::{Database, DatabaseError};
use super::models::{Assignment, AssignmentWithEnvironment, Course, Environment};

/// Durable store of courses, assignments and environments.
///
/// Implementations are expected to serialize conflicting writes to the same
/// row; the orchestrator holds no locks of its own.
pub trait CourseRepository: Send + Sync {
    fn find_course_by_code(
        &self,
        course_code: &str,
    ) -> impl Future<Output = Result<Course, DatabaseError>> + Send;

    fn get_course(&self, id: &str) -> impl Future<Output = Result<Course, DatabaseError>> + Send;

    fn create_assignment(
        &self,
        course_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> impl Future<Output = Result<Assignment, DatabaseError>> + Send;

    fn get_assignment(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Assignment, DatabaseError>> + Send;

    fn delete_assignment(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Assignment, DatabaseError>> + Send;

    fn create_environment(
        &self,
        assignment_id: &str,
        name: &str,
        base_url: &str,
        participants: &[String],
    ) -> impl Future<Output = Result<Environment, DatabaseError>> + Send;

    fn get_environment_for_assignment(
        &self,
        assignment_id: &str,
    ) -> impl Future<Output = Result<Option<Environment>, DatabaseError>> + Send;

    fn set_environment_participants(
        &self,
        assignment_id: &str,
        participants: &[String],
    ) -> impl Future<Output = Result<(), DatabaseError>> + Send;

    fn list_assignments_by_course(
        &self,
        course_id: &str,
    ) -> impl Future<Output = Result<Vec<AssignmentWithEnvironment>, DatabaseError>> + Send;
}

impl CourseRepository for Database {
    async fn find_course_by_code(&self, course_code: &str) -> Result<Course, DatabaseError> {
        Self::find_course_by_code(self, course_code).await
    }

    async fn get_course(&self, id: &str) -> Result<Course, DatabaseError> {
        Self::get_course(self, id).await
    }

    async fn create_assignment(
        &self,
        course_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Assignment, DatabaseError> {
        Self::create_assignment(self, course_id, title, description).await
    }

    async fn get_assignment(&self, id: &str) -> Result<Assignment, DatabaseError> {
        Self::get_assignment(self, id).await
    }

    async fn delete_assignment(&self, id: &str) -> Result<Assignment, DatabaseError> {
        Self::delete_assignment(self, id).await
    }

    async fn create_environment(
        &self,
        assignment_id: &str,
        name: &str,
        base_url: &str,
        participants: &[String],
    ) -> Result<Environment, DatabaseError> {
        Self::create_environment(self, assignment_id, name, base_url, participants).await
    }

    async fn get_environment_for_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Option<Environment>, DatabaseError> {
        Self::get_environment_for_assignment(self, assignment_id).await
    }

    async fn set_environment_participants(
        &self,
        assignment_id: &str,
        participants: &[String],
    ) -> Result<(), DatabaseError> {
        Self::set_environment_participants(self, assignment_id, participants).await
    }

    async fn list_assignments_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<AssignmentWithEnvironment>, DatabaseError> {
        Self::list_assignments_by_course(self, course_id).await
    }
}
