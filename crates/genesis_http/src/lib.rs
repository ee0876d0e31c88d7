//! HTTP adapter for the Genesis student manager.
//!
//! # Responsibility
//! - Expose the student service as a JSON API.
//! - Resolve process configuration for the server binary.
//!
//! # Invariants
//! - Nothing in this crate touches SQL directly; every operation goes
//!   through `genesis_core::StudentService`.

pub mod api;
pub mod config;

pub use api::{router, ApiError, AppState, StudentIdPath, StudentPayload};
pub use config::{AppConfig, ConfigError};
