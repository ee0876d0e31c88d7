//! Core domain logic for the Genesis student manager.
//! This crate is the single source of truth for student record invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use logging::{default_log_level, init_logging, logging_status, LogLevel, LoggingError};
pub use model::student::{NewStudent, Student, StudentChanges, StudentId};
pub use repo::student_repo::{RepoError, RepoResult, SqliteStudentRepository, StudentRepository};
pub use service::student_service::{ServiceResult, StudentService, StudentServiceError};
pub use validation::{
    validate_student_payload, validate_student_update, ValidationError, ValidationResult,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
