// src/response.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::repository::Page;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// Uniform JSON body of every API response.
///
/// `status` is always present; the remaining keys are emitted only when set.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T = ()> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Field-level detail. Only validation failures (and debug fault
    /// renderings) carry it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl Envelope<()> {
    pub fn error(message: impl Into<String>, errors: Option<serde_json::Value>) -> Self {
        Self {
            status: Status::Error,
            message: Some(message.into()),
            data: None,
            errors: errors.filter(|e| !is_empty_value(e)),
            pagination: None,
        }
    }
}

fn is_empty_value(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        serde_json::Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// Offset pagination block attached to list responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    /// 1-based position of the first item on this page, `null` when the page is empty.
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl Pagination {
    pub fn new(total: u64, per_page: u64, current_page: u64, item_count: usize) -> Self {
        let current_page = current_page.max(1);
        let last_page = if per_page == 0 {
            1
        } else {
            total.div_ceil(per_page).max(1)
        };

        let (from, to) = if item_count == 0 {
            (None, None)
        } else {
            let from = (current_page - 1)
                .saturating_mul(per_page)
                .saturating_add(1);
            (Some(from), Some(from.saturating_add(item_count as u64 - 1)))
        };

        Self {
            total,
            per_page,
            current_page,
            last_page,
            from,
            to,
        }
    }
}

/// An envelope paired with its HTTP status code.
#[derive(Debug)]
pub struct ApiResponse<T = ()> {
    code: StatusCode,
    body: Envelope<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: StatusCode::OK,
            body: Envelope {
                status: Status::Success,
                message: None,
                data: Some(data),
                errors: None,
                pagination: None,
            },
        }
    }

    /// 201 Created with the new entity as payload.
    pub fn created(data: T) -> Self {
        Self::success(data).with_status(StatusCode::CREATED)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.body.message = Some(message.into());
        self
    }

    pub fn with_status(mut self, code: StatusCode) -> Self {
        self.code = code;
        self
    }

    #[cfg(test)]
    pub(crate) fn status_code(&self) -> StatusCode {
        self.code
    }

    #[cfg(test)]
    pub(crate) fn envelope(&self) -> &Envelope<T> {
        &self.body
    }
}

impl ApiResponse<()> {
    /// Success without payload, e.g. after a delete.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            code: StatusCode::OK,
            body: Envelope {
                status: Status::Success,
                message: Some(message.into()),
                data: None,
                errors: None,
                pagination: None,
            },
        }
    }
}

impl<T> ApiResponse<Vec<T>> {
    pub fn paginated(page: Page<T>) -> Self {
        let pagination = Pagination::new(
            page.total,
            page.per_page,
            page.current_page,
            page.items.len(),
        );

        Self {
            code: StatusCode::OK,
            body: Envelope {
                status: Status::Success,
                message: None,
                data: Some(page.items),
                errors: None,
                pagination: Some(pagination),
            },
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.code, Json(self.body)).into_response()
    }
}
