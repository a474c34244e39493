//! Environment provisioner integration.
//!
//! Provides a reqwest-based client for the external provisioning service
//! and the [`EnvironmentProvisioner`] trait the orchestrator is written
//! against.

mod client;
pub mod types;


use std::future::Future;
use std::time::Duration;

pub use client::{ProvisionError, ProvisionerClient};
pub use types::{DeprovisionRequest, ProvisionRequest, ProvisionResult};

/// Remote service that materializes and tears down compute environments.
///
/// Calls are single attempts: implementations must not retry, because
/// provisioning is not guaranteed to be idempotent on the remote side.
pub trait EnvironmentProvisioner: Send + Sync {
    fn provision(
        &self,
        req: &ProvisionRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<ProvisionResult, ProvisionError>> + Send;

    fn deprovision(
        &self,
        req: &DeprovisionRequest,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), ProvisionError>> + Send;
}
