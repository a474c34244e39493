//! HiVE Provisioning Library
//!
//! Core functionality for assignment provisioning:
//! - SQLite storage for courses, assignments, and environments
//! - HTTP client for the external environment provisioner
//! - Orchestrator that creates and deletes assignments, with rollback
//! - Readiness poller that watches environments until they answer

pub mod error;
pub mod orchestrator;
pub mod provisioner;
pub mod readiness;
pub mod storage;

pub use error::{CompensationFailure, Error, Result};
pub use orchestrator::{CreateAssignment, Orchestrator};
pub use provisioner::{EnvironmentProvisioner, ProvisionError, ProvisionerClient};
pub use readiness::{HttpProbe, ReadinessPoller, ReadinessStatus};
pub use storage::{CourseRepository, Database};
