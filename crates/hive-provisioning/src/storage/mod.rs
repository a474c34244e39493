//! `SQLite` storage for courses, assignments and environments.
//!
//! [`CourseRepository`] is the seam the orchestrator depends on;
//! [`Database`] is its `sqlx` implementation.

mod db;
mod models;
mod queries;
mod repository;


pub use db::{Database, DatabaseError};
pub use models::*;
pub use repository::CourseRepository;
