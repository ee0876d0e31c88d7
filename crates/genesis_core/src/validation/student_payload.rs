//! Student payload validator.
//!
//! # Responsibility
//! - Validate create payloads (required fields + per-field constraints).
//! - Validate update payloads (per-field constraints on present fields only).
//!
//! # Invariants
//! - Values are trimmed before any length/emptiness check.
//! - JSON `null` is treated the same as an absent key.
//! - Unknown keys are ignored.

use crate::model::student::{NewStudent, StudentChanges, LONG_TEXT_MAX_CHARS, NAME_MAX_CHARS};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type ValidationResult<T> = Result<T, ValidationError>;

const ENROLLMENT_NO: &str = "enrollment_no";
const ENROLLMENT_NO_ALIAS: &str = "enrollmentNumber";
const FIRST_NAME: &str = "first_name";
const LAST_NAME: &str = "last_name";
const EMAIL: &str = "email";
const COURSE: &str = "course";

/// Caller-input error raised before a payload reaches storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Payload is not a key-value object.
    InvalidShape,
    /// Required field is absent, `null`, or blank.
    MissingField { field: &'static str },
    /// Field is present but not a string within its length limit.
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
    /// Non-empty email without `@` or longer than the column allows.
    InvalidEmail,
}

impl ValidationError {
    /// Returns the payload key this error refers to, if any.
    pub fn field(&self) -> Option<&'static str> {
        match self {
            Self::InvalidShape => None,
            Self::MissingField { field } | Self::WrongType { field, .. } => Some(*field),
            Self::InvalidEmail => Some(EMAIL),
        }
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidShape => write!(f, "Payload must be a JSON object."),
            Self::MissingField { field } => {
                write!(f, "{field} is required and must be a non-empty string.")
            }
            Self::WrongType { field, expected } => write!(f, "{field} must be {expected}."),
            Self::InvalidEmail => write!(
                f,
                "email must be a valid email-like string (<={LONG_TEXT_MAX_CHARS} chars)."
            ),
        }
    }
}

impl Error for ValidationError {}

/// Validates a create payload and returns trimmed insert fields.
///
/// # Errors
/// - `InvalidShape` when `payload` is not an object.
/// - `MissingField` when `enrollment_no` or `first_name` is absent/blank.
/// - `WrongType` for non-string or over-long values.
/// - `InvalidEmail` for a non-empty email without `@` or over 120 chars.
pub fn validate_student_payload(payload: &Value) -> ValidationResult<NewStudent> {
    let object = as_object(payload)?;

    let enrollment_no = required_name(enrollment_value(object), ENROLLMENT_NO)?;
    let first_name = required_name(object.get(FIRST_NAME), FIRST_NAME)?;
    let last_name = optional_text(object.get(LAST_NAME), LAST_NAME, NAME_MAX_CHARS)?;
    let email = optional_email(object.get(EMAIL))?;
    let course = optional_text(object.get(COURSE), COURSE, LONG_TEXT_MAX_CHARS)?;

    Ok(NewStudent {
        enrollment_no,
        first_name,
        last_name: last_name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        course: course.unwrap_or_default(),
    })
}

/// Validates a partial update payload.
///
/// Every field present with a non-null value must satisfy the same rule it
/// has on create; absent fields are reported as `None`.
pub fn validate_student_update(payload: &Value) -> ValidationResult<StudentChanges> {
    let object = as_object(payload)?;

    let enrollment_no = match enrollment_value(object) {
        Some(value) => Some(required_name(Some(value), ENROLLMENT_NO)?),
        None => None,
    };
    let first_name = match present(object.get(FIRST_NAME)) {
        Some(value) => Some(required_name(Some(value), FIRST_NAME)?),
        None => None,
    };

    Ok(StudentChanges {
        enrollment_no,
        first_name,
        last_name: optional_text(object.get(LAST_NAME), LAST_NAME, NAME_MAX_CHARS)?,
        email: optional_email(object.get(EMAIL))?,
        course: optional_text(object.get(COURSE), COURSE, LONG_TEXT_MAX_CHARS)?,
    })
}

fn as_object(payload: &Value) -> ValidationResult<&Map<String, Value>> {
    payload.as_object().ok_or(ValidationError::InvalidShape)
}

/// `enrollment_no` wins when both spellings are sent.
fn enrollment_value(object: &Map<String, Value>) -> Option<&Value> {
    present(object.get(ENROLLMENT_NO)).or_else(|| present(object.get(ENROLLMENT_NO_ALIAS)))
}

fn present(value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| !value.is_null())
}

fn required_name(value: Option<&Value>, field: &'static str) -> ValidationResult<String> {
    let value = present(value).ok_or(ValidationError::MissingField { field })?;
    let text = value.as_str().ok_or(ValidationError::WrongType {
        field,
        expected: "a string",
    })?;
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    if trimmed.chars().count() > NAME_MAX_CHARS {
        return Err(ValidationError::WrongType {
            field,
            expected: length_limit(NAME_MAX_CHARS),
        });
    }
    Ok(trimmed.to_string())
}

fn optional_text(
    value: Option<&Value>,
    field: &'static str,
    max_chars: usize,
) -> ValidationResult<Option<String>> {
    let Some(value) = present(value) else {
        return Ok(None);
    };
    let text = value.as_str().ok_or(ValidationError::WrongType {
        field,
        expected: "a string",
    })?;
    let trimmed = text.trim();
    if trimmed.chars().count() > max_chars {
        return Err(ValidationError::WrongType {
            field,
            expected: length_limit(max_chars),
        });
    }
    Ok(Some(trimmed.to_string()))
}

fn optional_email(value: Option<&Value>) -> ValidationResult<Option<String>> {
    let Some(value) = present(value) else {
        return Ok(None);
    };
    let text = value.as_str().ok_or(ValidationError::WrongType {
        field: EMAIL,
        expected: "a string",
    })?;
    let trimmed = text.trim();
    if !trimmed.is_empty()
        && (!trimmed.contains('@') || trimmed.chars().count() > LONG_TEXT_MAX_CHARS)
    {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(Some(trimmed.to_string()))
}

fn length_limit(max_chars: usize) -> &'static str {
    if max_chars <= NAME_MAX_CHARS {
        "a string of at most 64 characters"
    } else {
        "a string of at most 120 characters"
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_student_payload, validate_student_update, ValidationError};
    use serde_json::json;

    #[test]
    fn create_accepts_minimal_payload_and_fills_optional_fields() {
        let new = validate_student_payload(&json!({
            "enrollment_no": "  ENR001 ",
            "first_name": "Alice\t",
        }))
        .expect("minimal payload should validate");

        assert_eq!(new.enrollment_no, "ENR001");
        assert_eq!(new.first_name, "Alice");
        assert_eq!(new.last_name, "");
        assert_eq!(new.email, "");
        assert_eq!(new.course, "");
    }

    #[test]
    fn create_accepts_camel_case_enrollment_alias() {
        let new = validate_student_payload(&json!({
            "enrollmentNumber": "ENR010",
            "first_name": "Dana",
        }))
        .unwrap();
        assert_eq!(new.enrollment_no, "ENR010");
    }

    #[test]
    fn create_rejects_non_object_payloads() {
        for payload in [json!([]), json!("text"), json!(42), json!(null)] {
            assert_eq!(
                validate_student_payload(&payload),
                Err(ValidationError::InvalidShape)
            );
        }
    }

    #[test]
    fn create_reports_missing_required_fields() {
        let err = validate_student_payload(&json!({ "first_name": "Alice" })).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "enrollment_no"
            }
        );

        let err = validate_student_payload(&json!({ "enrollment_no": "E1", "first_name": "   " }))
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                field: "first_name"
            }
        );

        let err = validate_student_payload(&json!({ "enrollment_no": null, "first_name": "A" }))
            .unwrap_err();
        assert_eq!(err.field(), Some("enrollment_no"));
    }

    #[test]
    fn create_reports_wrong_types_and_lengths() {
        let err = validate_student_payload(&json!({ "enrollment_no": 12, "first_name": "A" }))
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::WrongType {
                field: "enrollment_no",
                ..
            }
        ));

        let long_name = "x".repeat(65);
        let err =
            validate_student_payload(&json!({ "enrollment_no": "E1", "first_name": long_name }))
                .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::WrongType {
                field: "first_name",
                ..
            }
        ));

        let long_course = "c".repeat(121);
        let err = validate_student_payload(
            &json!({ "enrollment_no": "E1", "first_name": "A", "course": long_course }),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::WrongType {
                field: "course",
                ..
            }
        ));
    }

    #[test]
    fn create_rejects_email_without_at_sign_but_allows_empty_email() {
        let err = validate_student_payload(
            &json!({ "enrollment_no": "E1", "first_name": "A", "email": "nobody.example.com" }),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidEmail);

        let new = validate_student_payload(
            &json!({ "enrollment_no": "E1", "first_name": "A", "email": "  " }),
        )
        .unwrap();
        assert_eq!(new.email, "");
    }

    #[test]
    fn create_rejects_over_long_email() {
        let email = format!("{}@example.com", "a".repeat(120));
        let err = validate_student_payload(
            &json!({ "enrollment_no": "E1", "first_name": "A", "email": email }),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::InvalidEmail);
    }

    #[test]
    fn length_limits_count_characters_not_bytes() {
        let name = "é".repeat(64);
        let new =
            validate_student_payload(&json!({ "enrollment_no": "E1", "first_name": name }))
                .unwrap();
        assert_eq!(new.first_name.chars().count(), 64);
    }

    #[test]
    fn update_only_checks_present_fields() {
        let changes = validate_student_update(&json!({
            "first_name": " Bobby ",
            "email": "bob@example.com",
        }))
        .expect("partial update should validate");

        assert_eq!(changes.first_name.as_deref(), Some("Bobby"));
        assert_eq!(changes.email.as_deref(), Some("bob@example.com"));
        assert_eq!(changes.enrollment_no, None);
        assert_eq!(changes.last_name, None);
        assert_eq!(changes.course, None);
    }

    #[test]
    fn update_treats_null_as_absent_and_accepts_empty_object() {
        let changes =
            validate_student_update(&json!({ "first_name": null, "course": null })).unwrap();
        assert!(changes.is_empty());
        assert!(validate_student_update(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn update_still_enforces_field_rules() {
        assert_eq!(
            validate_student_update(&json!({ "email": "broken" })),
            Err(ValidationError::InvalidEmail)
        );
        assert_eq!(
            validate_student_update(&json!({ "enrollment_no": "" })),
            Err(ValidationError::MissingField {
                field: "enrollment_no"
            })
        );
        assert!(matches!(
            validate_student_update(&json!({ "last_name": false })),
            Err(ValidationError::WrongType {
                field: "last_name",
                ..
            })
        ));
        assert_eq!(
            validate_student_update(&json!(["first_name"])),
            Err(ValidationError::InvalidShape)
        );
    }

    #[test]
    fn update_allows_clearing_optional_fields() {
        let changes = validate_student_update(&json!({ "email": "", "last_name": "" })).unwrap();
        assert_eq!(changes.email.as_deref(), Some(""));
        assert_eq!(changes.last_name.as_deref(), Some(""));
    }
}
