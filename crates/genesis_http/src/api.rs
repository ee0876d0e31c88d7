//! JSON API over the student service.
//!
//! # Responsibility
//! - Map HTTP requests onto `StudentService` calls.
//! - Decode JSON or form-encoded request bodies into one payload shape.
//! - Map service outcomes onto status codes and JSON bodies.
//! - Run each request in its own unit of work off the async runtime.
//!
//! # Invariants
//! - One request opens one connection, one repository and one service, and
//!   releases all of them before the response is written.
//! - Handlers never touch SQL; the service is the only entry point into core.
//! - Unclassified failures are logged and answered with a generic 500 body.
//! - Every error response, including a malformed `:id`, is a JSON
//!   `{"error": ...}` body.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Path, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use genesis_core::db::open_db;
use genesis_core::{
    core_version, ServiceResult, SqliteStudentRepository, Student, StudentId, StudentService,
    StudentServiceError,
};
use log::{debug, error};
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

const DUPLICATE_ENROLLMENT_MESSAGE: &str = "enrollment_no must be unique";
const NOT_FOUND_MESSAGE: &str = "not found";
const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Shared handler state: where each unit of work opens its connection.
#[derive(Debug, Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    pub fn db_path(&self) -> &FsPath {
        self.db_path.as_path()
    }
}

/// Builds the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/students", get(list_students).post(create_student))
        .route(
            "/api/students/:id",
            get(get_student).put(update_student).delete(delete_student),
        )
        .with_state(state)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Request failure mapped to an HTTP response.
#[derive(Debug)]
pub enum ApiError {
    /// Outcome reported by the student service.
    Service(StudentServiceError),
    /// Request body could not be decoded for its declared content type.
    MalformedBody(String),
    /// Request body carried a content type other than JSON or form data.
    UnsupportedMediaType(String),
    /// `:id` segment is not a student id.
    InvalidStudentId(String),
    /// Failure outside the service (connection bootstrap, worker crash).
    Internal(String),
}

impl From<StudentServiceError> for ApiError {
    fn from(value: StudentServiceError) -> Self {
        Self::Service(value)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Service(StudentServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            Self::Service(StudentServiceError::DuplicateEnrollment { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Self::Service(StudentServiceError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Service(StudentServiceError::Repo(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InvalidStudentId(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> String {
        match self {
            Self::Service(StudentServiceError::Validation(err)) => err.to_string(),
            Self::Service(StudentServiceError::DuplicateEnrollment { .. }) => {
                DUPLICATE_ENROLLMENT_MESSAGE.to_string()
            }
            Self::Service(StudentServiceError::NotFound(_)) | Self::InvalidStudentId(_) => {
                NOT_FOUND_MESSAGE.to_string()
            }
            Self::MalformedBody(message) => message.clone(),
            Self::UnsupportedMediaType(content_type) => {
                format!("unsupported content type `{content_type}`; send JSON or form data")
            }
            Self::Service(StudentServiceError::Repo(_)) | Self::Internal(_) => {
                INTERNAL_ERROR_MESSAGE.to_string()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Service(err) if status.is_server_error() => error!(
                "event=http_response module=http status=error http_status={} error={}",
                status.as_u16(),
                err
            ),
            Self::Internal(detail) => error!(
                "event=http_response module=http status=error http_status={} error={}",
                status.as_u16(),
                detail
            ),
            Self::InvalidStudentId(detail) => debug!(
                "event=http_response module=http status=rejected http_status={} error={}",
                status.as_u16(),
                detail
            ),
            _ => {}
        }
        (
            status,
            Json(ErrorBody {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

pub async fn healthz() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: core_version(),
    })
}

pub async fn list_students(State(state): State<AppState>) -> ApiResult<Json<Vec<Student>>> {
    let students = run_unit_of_work(&state, |service| service.list_students()).await?;
    Ok(Json(students))
}

pub async fn create_student(
    State(state): State<AppState>,
    StudentPayload(payload): StudentPayload,
) -> ApiResult<(StatusCode, Json<Student>)> {
    let student = run_unit_of_work(&state, move |service| service.create_student(&payload)).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn get_student(
    State(state): State<AppState>,
    StudentIdPath(id): StudentIdPath,
) -> ApiResult<Json<Student>> {
    let student = run_unit_of_work(&state, move |service| service.get_student(id)).await?;
    Ok(Json(student))
}

pub async fn update_student(
    State(state): State<AppState>,
    StudentIdPath(id): StudentIdPath,
    StudentPayload(payload): StudentPayload,
) -> ApiResult<Json<Student>> {
    let student =
        run_unit_of_work(&state, move |service| service.update_student(id, &payload)).await?;
    Ok(Json(student))
}

pub async fn delete_student(
    State(state): State<AppState>,
    StudentIdPath(id): StudentIdPath,
) -> ApiResult<StatusCode> {
    run_unit_of_work(&state, move |service| service.delete_student(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Student fields decoded from a JSON or form-encoded request body.
///
/// A body-less request without a content type decodes to an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentPayload(pub Value);

#[async_trait]
impl<S> FromRequest<S> for StudentPayload
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match BodyKind::of(req.headers()) {
            BodyKind::Json => {
                let Json(value) = Json::<Value>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
                Ok(Self(value))
            }
            BodyKind::Form => {
                let Form(fields) = Form::<Vec<(String, String)>>::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
                Ok(Self(form_fields_to_object(fields)))
            }
            BodyKind::Missing => {
                let body = Bytes::from_request(req, state)
                    .await
                    .map_err(|rejection| ApiError::MalformedBody(rejection.body_text()))?;
                if body.iter().all(u8::is_ascii_whitespace) {
                    Ok(Self(Value::Object(Map::new())))
                } else {
                    Err(ApiError::UnsupportedMediaType("<none>".to_string()))
                }
            }
            BodyKind::Other(content_type) => Err(ApiError::UnsupportedMediaType(content_type)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Missing,
    Other(String),
}

impl BodyKind {
    fn of(headers: &HeaderMap) -> Self {
        let Some(value) = headers.get(header::CONTENT_TYPE) else {
            return Self::Missing;
        };
        let raw = String::from_utf8_lossy(value.as_bytes()).into_owned();
        let essence = raw
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json"
            || (essence.starts_with("application/") && essence.ends_with("+json"))
        {
            Self::Json
        } else if essence == "application/x-www-form-urlencoded" {
            Self::Form
        } else {
            Self::Other(raw)
        }
    }
}

/// Repeated form keys keep their first value.
fn form_fields_to_object(fields: Vec<(String, String)>) -> Value {
    let mut object = Map::new();
    for (key, value) in fields {
        object.entry(key).or_insert(Value::String(value));
    }
    Value::Object(object)
}

/// `:id` path segment parsed as a student id; anything else is a 404.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StudentIdPath(pub StudentId);

#[async_trait]
impl<S> FromRequestParts<S> for StudentIdPath
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<StudentId>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| ApiError::InvalidStudentId(rejection.body_text()))?;
        Ok(Self(id))
    }
}

/// Runs one service call in a fresh unit of work on the blocking pool.
async fn run_unit_of_work<T, F>(state: &AppState, op: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut StudentService<SqliteStudentRepository<'_>>) -> ServiceResult<T>
        + Send
        + 'static,
{
    let db_path = Arc::clone(&state.db_path);
    tokio::task::spawn_blocking(move || with_student_service(&db_path, op))
        .await
        .map_err(|err| ApiError::Internal(format!("unit of work aborted: {err}")))?
}

fn with_student_service<T>(
    db_path: &FsPath,
    op: impl FnOnce(&mut StudentService<SqliteStudentRepository<'_>>) -> ServiceResult<T>,
) -> ApiResult<T> {
    let mut conn =
        open_db(db_path).map_err(|err| ApiError::Internal(format!("db open failed: {err}")))?;
    let repo = SqliteStudentRepository::try_new(&mut conn)
        .map_err(|err| ApiError::Internal(format!("repo init failed: {err}")))?;
    let mut service = StudentService::new(repo);
    op(&mut service).map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::{form_fields_to_object, ApiError, BodyKind};
    use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
    use genesis_core::{RepoError, StudentServiceError, ValidationError};
    use serde_json::json;

    fn headers_with(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn outcomes_map_to_documented_statuses() {
        let cases = [
            (
                ApiError::Service(StudentServiceError::Validation(
                    ValidationError::InvalidEmail,
                )),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Service(StudentServiceError::DuplicateEnrollment {
                    enrollment_no: "ENR001".to_string(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Service(StudentServiceError::NotFound(9)),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::InvalidStudentId("abc".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::UnsupportedMediaType("text/plain".to_string()),
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ),
            (
                ApiError::Service(StudentServiceError::Repo(RepoError::InvalidData(
                    "bad".to_string(),
                ))),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ApiError::Internal("boom".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.status(), expected, "{error:?}");
        }
    }

    #[test]
    fn duplicate_enrollment_uses_fixed_message_and_internal_errors_hide_detail() {
        let duplicate = ApiError::Service(StudentServiceError::DuplicateEnrollment {
            enrollment_no: "ENR001".to_string(),
        });
        assert_eq!(duplicate.message(), "enrollment_no must be unique");

        let internal = ApiError::Internal("db open failed: disk I/O error".to_string());
        assert_eq!(internal.message(), "internal error");

        let bad_id = ApiError::InvalidStudentId("Cannot parse `abc`".to_string());
        assert_eq!(bad_id.message(), "not found");
    }

    #[test]
    fn body_kind_follows_content_type_essence() {
        assert_eq!(BodyKind::of(&HeaderMap::new()), BodyKind::Missing);
        assert_eq!(
            BodyKind::of(&headers_with("application/json; charset=utf-8")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::of(&headers_with("application/merge-patch+json")),
            BodyKind::Json
        );
        assert_eq!(
            BodyKind::of(&headers_with("Application/X-WWW-Form-Urlencoded")),
            BodyKind::Form
        );
        assert_eq!(
            BodyKind::of(&headers_with("text/plain")),
            BodyKind::Other("text/plain".to_string())
        );
    }

    #[test]
    fn form_fields_become_string_object_and_first_value_wins() {
        let object = form_fields_to_object(vec![
            ("first_name".to_string(), "Ann".to_string()),
            ("email".to_string(), String::new()),
            ("first_name".to_string(), "Other".to_string()),
        ]);
        assert_eq!(object, json!({ "first_name": "Ann", "email": "" }));
    }
}
