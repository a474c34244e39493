//! Database queries for the course store.

use std::collections::HashMap;

use hive_core::db::unix_timestamp;
use sqlx::types::Json;

use super::db::{Database, DatabaseError};
use super::models::{Assignment, AssignmentWithEnvironment, Course, Environment};

impl Database {
    // =========================================================================
    // Course queries
    // =========================================================================

    /// Create a course. A duplicate code is a `Conflict`.
    pub async fn create_course(
        &self,
        course_code: &str,
        name: &str,
        description: &str,
    ) -> Result<Course, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO courses (id, course_code, name, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(course_code)
        .bind(name)
        .bind(description)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_course(&id).await
    }

    pub async fn get_course(&self, id: &str) -> Result<Course, DatabaseError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Course {id}")))
    }

    pub async fn find_course_by_code(&self, course_code: &str) -> Result<Course, DatabaseError> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE course_code = ?")
            .bind(course_code)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Course {course_code}")))
    }

    // =========================================================================
    // Assignment queries
    // =========================================================================

    /// Insert an assignment under `course_id` with a fresh id.
    pub async fn create_assignment(
        &self,
        course_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Assignment, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO assignments (id, course_id, title, description, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(course_id)
        .bind(title)
        .bind(description)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_assignment(&id).await
    }

    pub async fn get_assignment(&self, id: &str) -> Result<Assignment, DatabaseError> {
        sqlx::query_as::<_, Assignment>("SELECT * FROM assignments WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Assignment {id}")))
    }

    /// Delete an assignment, returning the removed row.
    ///
    /// The environment row, if any, goes with it (`ON DELETE CASCADE`).
    pub async fn delete_assignment(&self, id: &str) -> Result<Assignment, DatabaseError> {
        sqlx::query_as::<_, Assignment>("DELETE FROM assignments WHERE id = ? RETURNING *")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Assignment {id}")))
    }

    /// All assignments of a course, oldest first, each with its environment.
    pub async fn list_assignments_by_course(
        &self,
        course_id: &str,
    ) -> Result<Vec<AssignmentWithEnvironment>, DatabaseError> {
        let assignments = sqlx::query_as::<_, Assignment>(
            "SELECT * FROM assignments WHERE course_id = ? ORDER BY created_at ASC, id ASC",
        )
        .bind(course_id)
        .fetch_all(self.pool())
        .await?;

        let mut environments: HashMap<String, Environment> = sqlx::query_as::<_, Environment>(
            r"
            SELECT e.* FROM environments e
            JOIN assignments a ON a.id = e.assignment_id
            WHERE a.course_id = ?
            ",
        )
        .bind(course_id)
        .fetch_all(self.pool())
        .await?
        .into_iter()
        .map(|env| (env.assignment_id.clone(), env))
        .collect();

        Ok(assignments
            .into_iter()
            .map(|assignment| AssignmentWithEnvironment {
                environment: environments.remove(&assignment.id),
                assignment,
            })
            .collect())
    }

    // =========================================================================
    // Environment queries
    // =========================================================================

    /// Record the environment provisioned for an assignment.
    ///
    /// Fails with a foreign-key error if the assignment no longer exists and
    /// with `Conflict` if it already has one.
    pub async fn create_environment(
        &self,
        assignment_id: &str,
        name: &str,
        base_url: &str,
        participants: &[String],
    ) -> Result<Environment, DatabaseError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            r"
            INSERT INTO environments (id, assignment_id, name, base_url, participants, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&id)
        .bind(assignment_id)
        .bind(name)
        .bind(base_url)
        .bind(Json(participants))
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        sqlx::query_as::<_, Environment>("SELECT * FROM environments WHERE id = ?")
            .bind(&id)
            .fetch_one(self.pool())
            .await
            .map_err(Into::into)
    }

    /// Replace the participants still provisioned for an assignment's environment.
    pub async fn set_environment_participants(
        &self,
        assignment_id: &str,
        participants: &[String],
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE environments SET participants = ? WHERE assignment_id = ?")
            .bind(Json(participants))
            .bind(assignment_id)
            .execute(self.pool())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!(
                "environment for assignment {assignment_id}"
            )));
        }
        Ok(())
    }

    pub async fn get_environment_for_assignment(
        &self,
        assignment_id: &str,
    ) -> Result<Option<Environment>, DatabaseError> {
        let env = sqlx::query_as::<_, Environment>(
            "SELECT * FROM environments WHERE assignment_id = ?",
        )
        .bind(assignment_id)
        .fetch_optional(self.pool())
        .await?;

        Ok(env)
    }
}
