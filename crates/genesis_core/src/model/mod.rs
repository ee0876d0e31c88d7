//! Domain model for student records.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Separate persisted records from validated write inputs.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned `StudentId`.
//! - Deletion is a hard delete; ids are never reused.

pub mod student;
