//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - The repository is the only core component holding a storage handle.
//! - Store-level uniqueness violations surface as `RepoError::DuplicateKey`,
//!   never as a generic DB error.

pub mod student_repo;
