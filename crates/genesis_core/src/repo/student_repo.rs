//! Student repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `students` table.
//! - Assign identity and timestamps on write.
//! - Translate `uq_enrollment_no` violations into `RepoError::DuplicateKey`.
//!
//! # Invariants
//! - Every mutation runs in one `BEGIN IMMEDIATE` transaction and commits only
//!   after the write and its read-back both succeed.
//! - Duplicate detection relies on the table constraint; there is no
//!   read-before-insert check.
//! - Each successful update moves `updated_at` strictly forward.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::student::{NewStudent, Student, StudentChanges, StudentId};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    enrollment_no,
    first_name,
    last_name,
    email,
    course,
    created_at,
    updated_at
FROM students";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for student persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// The store rejected the row because `enrollment_no` is taken.
    DuplicateKey {
        enrollment_no: String,
    },
    NotFound(StudentId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey { enrollment_no } => {
                write!(f, "enrollment_no `{enrollment_no}` already exists")
            }
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted student data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for student CRUD operations.
pub trait StudentRepository {
    /// Returns every record ordered by `id` descending.
    fn list_all(&self) -> RepoResult<Vec<Student>>;
    fn get_by_id(&self, id: StudentId) -> RepoResult<Option<Student>>;
    fn get_by_enrollment_no(&self, enrollment_no: &str) -> RepoResult<Option<Student>>;
    /// Inserts a record; fails with `DuplicateKey` on an enrollment collision.
    fn create(&mut self, new: &NewStudent) -> RepoResult<Student>;
    /// Applies set fields of `changes` onto `existing` and refreshes
    /// `updated_at`. `existing` is left untouched on failure.
    fn update(&mut self, existing: &Student, changes: &StudentChanges) -> RepoResult<Student>;
    fn delete(&mut self, existing: &Student) -> RepoResult<()>;
}

/// SQLite-backed student repository bound to one connection.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when migrations have not been applied.
    /// - `MissingRequiredTable` when the `students` table is absent.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn list_all(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} ORDER BY id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn get_by_id(&self, id: StudentId) -> RepoResult<Option<Student>> {
        select_by_id(self.conn, id)
    }

    fn get_by_enrollment_no(&self, enrollment_no: &str) -> RepoResult<Option<Student>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE enrollment_no = ?1;"))?;
        let mut rows = stmt.query([enrollment_no])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_student_row(row)?));
        }
        Ok(None)
    }

    fn create(&mut self, new: &NewStudent) -> RepoResult<Student> {
        let now = now_epoch_ms();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO students (
                enrollment_no,
                first_name,
                last_name,
                email,
                course,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6);",
            params![
                new.enrollment_no.as_str(),
                new.first_name.as_str(),
                new.last_name.as_str(),
                new.email.as_str(),
                new.course.as_str(),
                now,
            ],
        )
        .map_err(|err| map_write_error(err, new.enrollment_no.as_str()))?;

        let id = tx.last_insert_rowid();
        let student = select_by_id(&tx, id)?.ok_or_else(|| {
            RepoError::InvalidData(format!("inserted student {id} missing in read-back"))
        })?;
        tx.commit()?;
        Ok(student)
    }

    fn update(&mut self, existing: &Student, changes: &StudentChanges) -> RepoResult<Student> {
        let now = now_epoch_ms();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let changed = tx
            .execute(
                "UPDATE students
                 SET
                    enrollment_no = COALESCE(?1, enrollment_no),
                    first_name = COALESCE(?2, first_name),
                    last_name = COALESCE(?3, last_name),
                    email = COALESCE(?4, email),
                    course = COALESCE(?5, course),
                    updated_at = MAX(?6, updated_at + 1)
                 WHERE id = ?7;",
                params![
                    changes.enrollment_no.as_deref(),
                    changes.first_name.as_deref(),
                    changes.last_name.as_deref(),
                    changes.email.as_deref(),
                    changes.course.as_deref(),
                    now,
                    existing.id,
                ],
            )
            .map_err(|err| {
                let enrollment_no = changes
                    .enrollment_no
                    .as_deref()
                    .unwrap_or(existing.enrollment_no.as_str());
                map_write_error(err, enrollment_no)
            })?;

        if changed == 0 {
            return Err(RepoError::NotFound(existing.id));
        }

        let student = select_by_id(&tx, existing.id)?.ok_or(RepoError::NotFound(existing.id))?;
        tx.commit()?;
        Ok(student)
    }

    fn delete(&mut self, existing: &Student) -> RepoResult<()> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM students WHERE id = ?1;", [existing.id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(existing.id));
        }
        tx.commit()?;
        Ok(())
    }
}

fn select_by_id(conn: &Connection, id: StudentId) -> RepoResult<Option<Student>> {
    let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_student_row(row)?));
    }
    Ok(None)
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let student = Student {
        id: row.get("id")?,
        enrollment_no: row.get("enrollment_no")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        course: row.get("course")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    };

    if student.enrollment_no.is_empty() {
        return Err(RepoError::InvalidData(format!(
            "empty enrollment_no in students.id={}",
            student.id
        )));
    }
    if student.updated_at < student.created_at {
        return Err(RepoError::InvalidData(format!(
            "updated_at {} precedes created_at {} in students.id={}",
            student.updated_at, student.created_at, student.id
        )));
    }

    Ok(student)
}

fn map_write_error(err: rusqlite::Error, enrollment_no: &str) -> RepoError {
    if is_unique_violation(&err) {
        return RepoError::DuplicateKey {
            enrollment_no: enrollment_no.to_string(),
        };
    }
    err.into()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'students';",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some();
    if !table_exists {
        return Err(RepoError::MissingRequiredTable("students"));
    }

    Ok(())
}

fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::is_unique_violation;
    use rusqlite::Connection;

    #[test]
    fn unique_violation_is_detected_by_extended_code() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE t (k TEXT NOT NULL UNIQUE, v TEXT NOT NULL CHECK (length(v) > 0));
             INSERT INTO t (k, v) VALUES ('a', 'x');",
        )
        .unwrap();

        let duplicate = conn
            .execute("INSERT INTO t (k, v) VALUES ('a', 'y');", [])
            .unwrap_err();
        assert!(is_unique_violation(&duplicate));

        let check_failure = conn
            .execute("INSERT INTO t (k, v) VALUES ('b', '');", [])
            .unwrap_err();
        assert!(!is_unique_violation(&check_failure));
    }
}
