//! Assignment provisioning workflow.
//!
//! [`Orchestrator`] creates an assignment, asks the provisioner for an
//! environment and records it, rolling back through a [`Saga`] when a later
//! step fails. It also owns deletion (which cascades to the remote
//! environment) and the per-course listing.

mod saga;
mod service;


pub use saga::{Compensation, Saga};
pub use service::{CreateAssignment, Orchestrator};
