//! `HiVE` Core Library
//!
//! Shared functionality for `HiVE` components:
//! - Layered configuration (defaults, settings files, environment)
//! - `SQLite` pool helpers and the shared database error type
//! - Tracing subscriber initialization
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod tracing_init;

pub use config::Config;
pub use error::{Error, Result};
