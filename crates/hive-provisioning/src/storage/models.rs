//! Database models for courses, assignments and environments.

use serde::{Deserialize, Serialize};

/// Course record. `course_code` is the stable human-facing identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub course_code: String,
    pub name: String,
    pub description: String,
    pub created_at: i64,
}

/// Assignment record, scoped to exactly one course.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub description: Option<String>,
    pub created_at: i64,
}

/// Provisioned environment backing one assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub assignment_id: String,
    pub name: String,
    pub base_url: String,
    /// Net IDs the remote environment was provisioned for.
    #[sqlx(json)]
    pub participants: Vec<String>,
    pub created_at: i64,
}

/// Assignment as listed for a course, with its environment when provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentWithEnvironment {
    #[serde(flatten)]
    pub assignment: Assignment,
    pub environment: Option<Environment>,
}

impl AssignmentWithEnvironment {
    /// Address to probe for readiness, if an environment exists.
    pub fn environment_url(&self) -> Option<&str> {
        self.environment.as_ref().map(|env| env.base_url.as_str())
    }
}

/// Result of a successful create: both records, referencing each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedAssignment {
    pub assignment: Assignment,
    pub environment: Environment,
}

/// Display name recorded for an assignment's environment.
pub fn environment_name(course_name: &str, assignment_title: &str) -> String {
    format!("{course_name}-{assignment_title} Environment")
}
