//! Student use-case service.
//!
//! # Responsibility
//! - Provide the only core entry points for student CRUD.
//! - Run payload validation before any repository write.
//! - Translate repository outcomes into `StudentServiceError`.
//!
//! # Invariants
//! - No write reaches the repository unless validation passed.
//! - Not-found and duplicate outcomes are typed results, never panics.
//! - The service holds no storage handle of its own; it is built per unit of
//!   work around an injected repository.

use crate::model::student::{Student, StudentId};
use crate::repo::student_repo::{RepoError, StudentRepository};
use crate::validation::{validate_student_payload, validate_student_update, ValidationError};
use log::{error, info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ServiceResult<T> = Result<T, StudentServiceError>;

/// Outcome taxonomy for student use-cases.
#[derive(Debug)]
pub enum StudentServiceError {
    /// Payload failed validation; nothing was written.
    Validation(ValidationError),
    /// No present record has this id.
    NotFound(StudentId),
    /// The store rejected a write because `enrollment_no` is taken.
    DuplicateEnrollment { enrollment_no: String },
    /// Unclassified persistence failure.
    Repo(RepoError),
}

impl StudentServiceError {
    /// Returns whether this is an expected caller-facing outcome rather than
    /// a system fault.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }
}

impl Display for StudentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "Student id={id} not found."),
            Self::DuplicateEnrollment { .. } => write!(f, "Enrollment number must be unique."),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StudentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for StudentServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for StudentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::NotFound(id),
            RepoError::DuplicateKey { enrollment_no } => Self::DuplicateEnrollment { enrollment_no },
            other => Self::Repo(other),
        }
    }
}

/// Student service facade over a repository implementation.
pub struct StudentService<R: StudentRepository> {
    repo: R,
}

impl<R: StudentRepository> StudentService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists all students, newest id first.
    pub fn list_students(&self) -> ServiceResult<Vec<Student>> {
        self.repo
            .list_all()
            .map_err(|err| log_outcome("student_list", None, err.into()))
    }

    /// Gets one student by id.
    pub fn get_student(&self, id: StudentId) -> ServiceResult<Student> {
        self.find_existing(id)
            .map_err(|err| log_outcome("student_get", Some(id), err))
    }

    /// Validates `payload` and inserts a new student.
    ///
    /// # Errors
    /// - `Validation` when the payload breaks a create rule.
    /// - `DuplicateEnrollment` when the store reports an enrollment collision.
    pub fn create_student(&mut self, payload: &Value) -> ServiceResult<Student> {
        let result = validate_student_payload(payload)
            .map_err(StudentServiceError::from)
            .and_then(|new| self.repo.create(&new).map_err(StudentServiceError::from));

        match result {
            Ok(student) => {
                info!(
                    "event=student_create module=service status=ok student_id={}",
                    student.id
                );
                Ok(student)
            }
            Err(err) => Err(log_outcome("student_create", None, err)),
        }
    }

    /// Applies a partial update to an existing student.
    ///
    /// Only fields present and non-null in `payload` are validated and
    /// written.
    pub fn update_student(&mut self, id: StudentId, payload: &Value) -> ServiceResult<Student> {
        let result = self.find_existing(id).and_then(|existing| {
            let changes = validate_student_update(payload)?;
            if changes.is_empty() {
                info!(
                    "event=student_update module=service status=noop_payload student_id={}",
                    id
                );
            }
            self.repo
                .update(&existing, &changes)
                .map_err(StudentServiceError::from)
        });

        match result {
            Ok(student) => {
                info!(
                    "event=student_update module=service status=ok student_id={}",
                    student.id
                );
                Ok(student)
            }
            Err(err) => Err(log_outcome("student_update", Some(id), err)),
        }
    }

    /// Deletes a student by id.
    pub fn delete_student(&mut self, id: StudentId) -> ServiceResult<()> {
        let result = self
            .find_existing(id)
            .and_then(|existing| self.repo.delete(&existing).map_err(StudentServiceError::from));

        match result {
            Ok(()) => {
                info!(
                    "event=student_delete module=service status=ok student_id={}",
                    id
                );
                Ok(())
            }
            Err(err) => Err(log_outcome("student_delete", Some(id), err)),
        }
    }

    fn find_existing(&self, id: StudentId) -> ServiceResult<Student> {
        self.repo
            .get_by_id(id)?
            .ok_or(StudentServiceError::NotFound(id))
    }
}

/// Logs a failed use-case without payload values and hands the error back.
fn log_outcome(event: &str, id: Option<StudentId>, err: StudentServiceError) -> StudentServiceError {
    let id = id.map_or_else(|| "none".to_string(), |id| id.to_string());
    match &err {
        StudentServiceError::Validation(validation) => info!(
            "event={} module=service status=rejected student_id={} error_code=validation field={}",
            event,
            id,
            validation.field().unwrap_or("payload")
        ),
        StudentServiceError::NotFound(_) => info!(
            "event={} module=service status=rejected student_id={} error_code=not_found",
            event, id
        ),
        StudentServiceError::DuplicateEnrollment { .. } => warn!(
            "event={} module=service status=rejected student_id={} error_code=duplicate_enrollment",
            event, id
        ),
        StudentServiceError::Repo(repo) => error!(
            "event={} module=service status=error student_id={} error_code=repo_failure error={}",
            event, id, repo
        ),
    }
    err
}
