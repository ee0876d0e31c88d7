//! Student domain model.
//!
//! # Responsibility
//! - Define the persisted `Student` record and its serialized representation.
//! - Define validated write inputs (`NewStudent`, `StudentChanges`).
//!
//! # Invariants
//! - `id` is assigned by the store and never changes.
//! - `enrollment_no` is unique across live records (enforced by the store).
//! - `updated_at >= created_at` at every point in the record lifecycle.
//! - Optional text fields are stored as `""` when absent, never `NULL`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned integer identity of a student record.
pub type StudentId = i64;

/// Maximum character length for `enrollment_no`, `first_name`, `last_name`.
pub const NAME_MAX_CHARS: usize = 64;
/// Maximum character length for `email` and `course`.
pub const LONG_TEXT_MAX_CHARS: usize = 120;

/// Persisted student record.
///
/// Serializes to the public representation
/// `{id, enrollment_no, first_name, last_name, email, course, created_at, updated_at}`
/// with timestamps rendered as RFC 3339 UTC strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub enrollment_no: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: String,
    /// Unix epoch milliseconds. Set once on insert.
    #[serde(with = "epoch_ms_rfc3339")]
    pub created_at: i64,
    /// Unix epoch milliseconds. Strictly increases on every update.
    #[serde(with = "epoch_ms_rfc3339")]
    pub updated_at: i64,
}

/// Validated, trimmed input for inserting one student.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStudent {
    pub enrollment_no: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub course: String,
}

/// Validated, trimmed partial update. `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StudentChanges {
    pub enrollment_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub course: Option<String>,
}

impl StudentChanges {
    /// Returns whether no field is set.
    pub fn is_empty(&self) -> bool {
        self.enrollment_no.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.email.is_none()
            && self.course.is_none()
    }
}

/// Formats epoch milliseconds as an RFC 3339 UTC string.
///
/// Returns `None` for values outside chrono's representable range.
pub fn format_epoch_ms(epoch_ms: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|value| value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

mod epoch_ms_rfc3339 {
    use super::format_epoch_ms;
    use chrono::DateTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        match format_epoch_ms(*value) {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let text = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&text)
            .map(|value| value.timestamp_millis())
            .map_err(|err| D::Error::custom(format!("invalid timestamp `{text}`: {err}")))
    }
}
