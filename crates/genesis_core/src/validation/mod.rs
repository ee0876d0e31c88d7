//! Pure payload validation for student writes.
//!
//! # Responsibility
//! - Check the field-level shape of untyped caller payloads.
//! - Produce trimmed, typed write inputs for the repository.
//!
//! # Invariants
//! - Validation never touches storage and is deterministic.
//! - Create and update use separate rule sets; update only checks fields
//!   that are present.

pub mod student_payload;

pub use student_payload::{
    validate_student_payload, validate_student_update, ValidationError, ValidationResult,
};
