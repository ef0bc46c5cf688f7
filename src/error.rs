// src/error.rs

use std::{any::Any, backtrace::Backtrace, collections::BTreeMap, fmt, panic::Location};

use axum::{
    Json,
    body::Body,
    extract::{
        State,
        rejection::PathRejection,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use validator::ValidationErrors;

use crate::{
    config::Config, repository::StoreError, response::Envelope, storage::StorageError,
};

/// Field name → human readable messages, in field order.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// An unclassified failure together with where it was raised.
#[derive(Debug)]
pub struct Fault {
    pub message: String,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub trace: String,
}

impl Fault {
    #[track_caller]
    pub fn new(message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            message: message.into(),
            file: Some(location.file()),
            line: Some(location.line()),
            trace: Backtrace::capture().to_string(),
        }
    }

    fn from_panic(message: String) -> Self {
        Self {
            message,
            file: None,
            line: None,
            trace: Backtrace::capture().to_string(),
        }
    }
}

/// Global Application Error Enum.
/// Every failure surfaced by a handler is one of these and is rendered in
/// exactly one place: [`AppError::classify`].
#[derive(Debug)]
pub enum AppError {
    // 401: missing, invalid, expired or revoked token
    Unauthenticated,

    // 403: an ownership/role check failed
    Forbidden(String),

    // 422
    Validation(FieldErrors),

    // 404: lookup by id missed; carries the resource name
    NotFound(&'static str),

    // 404: no route matched
    RouteNotFound,

    // 405
    MethodNotAllowed,

    // 409: delete refused because other rows still reference the resource
    ReferentialIntegrity,

    // 500: persistence failure, detail is never shown in production
    Database(String),

    // 500: anything else
    Internal(Fault),
}

impl AppError {
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        AppError::Internal(Fault::new(message))
    }

    /// A single-field validation failure.
    pub fn invalid(field: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.into()]);
        AppError::Validation(errors)
    }

    /// Maps the error to its status code and envelope.
    ///
    /// With `debug` set, persistence and unclassified faults expose their detail.
    pub fn classify(&self, debug: bool) -> (StatusCode, Envelope) {
        match self {
            AppError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Envelope::error("Unauthenticated. Please login to continue.", None),
            ),
            AppError::Forbidden(message) => {
                (StatusCode::FORBIDDEN, Envelope::error(message.clone(), None))
            }
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Envelope::error("Validation failed.", Some(json!(errors))),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                Envelope::error(
                    format!("No {} found with the specified identifier.", resource),
                    None,
                ),
            ),
            AppError::RouteNotFound => (
                StatusCode::NOT_FOUND,
                Envelope::error("The requested resource was not found.", None),
            ),
            AppError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                Envelope::error("The specified method for the request is invalid.", None),
            ),
            AppError::ReferentialIntegrity => (
                StatusCode::CONFLICT,
                Envelope::error(
                    "Cannot delete resource because it is related to other resources.",
                    None,
                ),
            ),
            AppError::Database(detail) => {
                let errors = debug.then(|| json!({ "detail": detail }));
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Envelope::error("Database error occurred. Please try again later.", errors),
                )
            }
            AppError::Internal(fault) if debug => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Envelope::error(
                    fault.message.clone(),
                    Some(json!({
                        "file": fault.file,
                        "line": fault.line,
                        "trace": fault.trace.lines().map(str::trim).collect::<Vec<_>>(),
                    })),
                ),
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Envelope::error("An unexpected error occurred. Please try again later.", None),
            ),
        }
    }

    fn has_hidden_detail(&self) -> bool {
        matches!(self, AppError::Database(_) | AppError::Internal(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// The debug rendering of a fault, stashed on the response until
/// [`expose_fault_detail`] decides whether the client may see it.
#[derive(Debug, Clone)]
pub struct DebugRendering(pub Envelope);

/// Implements `IntoResponse` for `AppError`.
/// Persistence and unclassified faults are always logged here.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(detail) => tracing::error!("Database error: {}", detail),
            AppError::Internal(fault) => tracing::error!(
                file = fault.file,
                line = fault.line,
                "Unhandled fault: {}",
                fault.message
            ),
            _ => {}
        }

        let (status, body) = self.classify(false);
        let mut response = (status, Json(body)).into_response();

        if self.has_hidden_detail() {
            let (_, debug_body) = self.classify(true);
            response.extensions_mut().insert(DebugRendering(debug_body));
        }

        response
    }
}

/// Axum Middleware: swaps in the detailed fault rendering when `APP_DEBUG` is on.
pub async fn expose_fault_detail(
    State(config): State<Config>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;

    match response.extensions_mut().remove::<DebugRendering>() {
        Some(DebugRendering(body)) if config.app_debug => {
            (response.status(), Json(body)).into_response()
        }
        _ => response,
    }
}

/// Router fallback for unknown paths.
pub async fn route_not_found() -> AppError {
    AppError::RouteNotFound
}

/// Router fallback for a known path hit with an unsupported method.
pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}

/// Renders a handler panic as an unclassified fault.
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Unknown panic".to_string()
    };

    AppError::Internal(Fault::from_panic(message)).into_response()
}

/// Flattens `validator` output into [`FieldErrors`]. Empty when `result` is `Ok`.
pub fn field_errors(result: Result<(), ValidationErrors>) -> FieldErrors {
    let Err(errors) = result else {
        return FieldErrors::new();
    };

    errors
        .field_errors()
        .iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("The {} field is invalid.", field.replace('_', " ")),
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

/// `Err(Validation)` when any field failed.
pub fn reject_invalid(errors: FieldErrors) -> Result<(), AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

impl From<ValidationErrors> for AppError {
    fn from(err: ValidationErrors) -> Self {
        AppError::Validation(field_errors(Err(err)))
    }
}

/// Converts store failures; foreign-key refusals become 409, everything else 500.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ForeignKeyViolation => AppError::ReferentialIntegrity,
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    #[track_caller]
    fn from(err: StorageError) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<MultipartRejection> for AppError {
    fn from(rejection: MultipartRejection) -> Self {
        AppError::invalid("body", rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        AppError::invalid("body", err.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::RouteNotFound
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::invalid("body", err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    #[track_caller]
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

impl From<argon2::password_hash::Error> for AppError {
    #[track_caller]
    fn from(err: argon2::password_hash::Error) -> Self {
        AppError::internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(err: &AppError, debug: bool) -> (u16, serde_json::Value) {
        let (status, body) = err.classify(debug);
        (status.as_u16(), serde_json::to_value(body).unwrap())
    }

    #[test]
    fn unauthenticated_is_401() {
        let (status, body) = render(&AppError::Unauthenticated, false);
        assert_eq!(status, 401);
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Unauthenticated. Please login to continue.");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn forbidden_keeps_policy_message() {
        let err = AppError::Forbidden("Unauthorized. You can only update your own posts.".into());
        let (status, body) = render(&err, false);
        assert_eq!(status, 403);
        assert_eq!(body["message"], "Unauthorized. You can only update your own posts.");
    }

    #[test]
    fn validation_carries_field_map() {
        let err = AppError::invalid("email", "The email field is required.");
        let (status, body) = render(&err, false);
        assert_eq!(status, 422);
        assert_eq!(body["message"], "Validation failed.");
        assert_eq!(body["errors"]["email"][0], "The email field is required.");
    }

    #[test]
    fn not_found_names_the_resource() {
        let (status, body) = render(&AppError::NotFound("post"), false);
        assert_eq!(status, 404);
        assert_eq!(body["message"], "No post found with the specified identifier.");
    }

    #[test]
    fn routing_failures() {
        assert_eq!(render(&AppError::RouteNotFound, false).0, 404);
        let (status, body) = render(&AppError::MethodNotAllowed, false);
        assert_eq!(status, 405);
        assert_eq!(body["message"], "The specified method for the request is invalid.");
    }

    #[test]
    fn foreign_key_violation_becomes_conflict() {
        let err = AppError::from(StoreError::ForeignKeyViolation);
        let (status, body) = render(&err, false);
        assert_eq!(status, 409);
        assert_eq!(
            body["message"],
            "Cannot delete resource because it is related to other resources."
        );
    }

    #[test]
    fn database_detail_hidden_unless_debug() {
        let err = AppError::from(StoreError::Database("relation \"posts\" does not exist".into()));

        let (status, body) = render(&err, false);
        assert_eq!(status, 500);
        assert_eq!(body["message"], "Database error occurred. Please try again later.");
        assert!(body.get("errors").is_none());

        let (_, body) = render(&err, true);
        assert_eq!(body["message"], "Database error occurred. Please try again later.");
        assert!(body["errors"]["detail"].as_str().unwrap().contains("posts"));
    }

    #[test]
    fn internal_fault_generic_in_production() {
        let err = AppError::internal("disk on fire");
        let (status, body) = render(&err, false);
        assert_eq!(status, 500);
        assert_eq!(body["message"], "An unexpected error occurred. Please try again later.");
        assert!(body.get("errors").is_none());
    }

    #[test]
    fn internal_fault_detailed_in_debug() {
        let err = AppError::internal("disk on fire");
        let (_, body) = render(&err, true);
        assert_eq!(body["message"], "disk on fire");
        assert!(body["errors"]["file"].as_str().unwrap().ends_with("error.rs"));
        assert!(body["errors"]["line"].as_u64().is_some());
        assert!(body["errors"]["trace"].is_array());
    }

    #[test]
    fn panic_payloads_are_rendered_as_faults() {
        let response = handle_panic(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.extensions().get::<DebugRendering>().is_some());
    }

    #[test]
    fn field_errors_is_empty_for_ok() {
        assert!(field_errors(Ok(())).is_empty());
        assert!(reject_invalid(FieldErrors::new()).is_ok());
    }
}
