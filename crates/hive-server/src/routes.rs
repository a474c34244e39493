use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use hive_provisioning::storage::{
    Assignment, AssignmentWithEnvironment, Course, ProvisionedAssignment,
};
use hive_provisioning::{CreateAssignment, Database, Orchestrator, ProvisionerClient};
use serde::Deserialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::AppError;

/// Orchestrator wired to the production store and provisioner.
pub type AssignmentService = Orchestrator<Database, ProvisionerClient>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AssignmentService>,
}

impl AppState {
    pub fn new(service: AssignmentService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseBody {
    pub course_code: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateAssignmentBody {
    pub title: String,
    #[serde(rename = "imageURL")]
    pub image_url: String,
    #[serde(rename = "netIDs", default)]
    pub net_ids: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/course", post(create_course))
        .route(
            "/api/course/{course_code}/assignments",
            get(list_assignments).post(create_assignment),
        )
        .route("/api/assignment/{assignment_id}", delete(delete_assignment))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// `GET /health`
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// `POST /api/course`
async fn create_course(
    State(state): State<AppState>,
    body: Result<Json<CreateCourseBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Course>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    if body.course_code.trim().is_empty() {
        return Err(AppError::bad_request("courseCode must not be empty"));
    }
    let course = state
        .service
        .repository()
        .create_course(body.course_code.trim(), &body.name, &body.description)
        .await?;
    info!(course_code = %course.course_code, "Course created");
    Ok((StatusCode::CREATED, Json(course)))
}

/// `GET /api/course/{course_code}/assignments`
async fn list_assignments(
    State(state): State<AppState>,
    Path(course_code): Path<String>,
) -> Result<Json<Vec<AssignmentWithEnvironment>>, AppError> {
    let assignments = state
        .service
        .list_assignments_for_course(&course_code)
        .await?;
    Ok(Json(assignments))
}

/// `POST /api/course/{course_code}/assignments`
async fn create_assignment(
    State(state): State<AppState>,
    Path(course_code): Path<String>,
    body: Result<Json<CreateAssignmentBody>, JsonRejection>,
) -> Result<(StatusCode, Json<ProvisionedAssignment>), AppError> {
    let Json(body) = body.map_err(|e| AppError::bad_request(e.body_text()))?;
    let created = state
        .service
        .create_assignment(CreateAssignment {
            course_code,
            title: body.title,
            image: body.image_url,
            participant_ids: body.net_ids,
            description: body.description,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `DELETE /api/assignment/{assignment_id}`
async fn delete_assignment(
    State(state): State<AppState>,
    Path(assignment_id): Path<String>,
) -> Result<Json<Assignment>, AppError> {
    let deleted = state.service.delete_assignment(&assignment_id).await?;
    Ok(Json(deleted))
}
