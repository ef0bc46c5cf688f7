// src/extract.rs

//! Request extractors that reject through [`AppError`] so every malformed
//! request still gets the standard envelope.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Multipart, Query, Request},
    http::{header, request::Parts},
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::{
    error::AppError,
    models::upload::UploadedFile,
    repository::{PER_PAGE, PageRequest},
};

/// JSON body. A missing or blank body deserializes as `{}` so required-field
/// rules report per field instead of failing the whole request.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::invalid("body", rejection.body_text()))?;

        Ok(JsonBody(parse_json(&bytes)?))
    }
}

fn parse_json<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_value(Value::Object(Map::new()))?);
    }
    Ok(serde_json::from_slice(bytes)?)
}

/// Payload of endpoints that take an optional upload: either JSON, or
/// `multipart/form-data` whose text parts become the fields of `T`.
#[derive(Debug)]
pub struct FormData<T> {
    pub fields: T,
    pub files: HashMap<String, UploadedFile>,
}

impl<T> FormData<T> {
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.remove(name)
    }
}

impl<S, T> FromRequest<S> for FormData<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if !is_multipart {
            let JsonBody(fields) = JsonBody::from_request(req, state).await?;
            return Ok(FormData {
                fields,
                files: HashMap::new(),
            });
        }

        let mut multipart = Multipart::from_request(req, state).await?;
        let mut text = Map::new();
        let mut files = HashMap::new();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };

            if field.file_name().is_some() {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?;

                // Browsers send an empty part for an untouched file input.
                if bytes.is_empty() {
                    continue;
                }

                files.insert(
                    name,
                    UploadedFile { file_name, bytes },
                );
            } else {
                text.insert(name, Value::String(field.text().await?));
            }
        }

        Ok(FormData {
            fields: serde_json::from_value(Value::Object(text))?,
            files,
        })
    }
}

/// Path parameters; a malformed id is an unknown route (404), not a 400.
#[derive(Debug)]
pub struct Path<T>(pub T);

impl<S, T> FromRequestParts<S> for Path<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Send,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let axum::extract::Path(value) =
            axum::extract::Path::<T>::from_request_parts(parts, state).await?;
        Ok(Path(value))
    }
}

/// `?page=N` for listings. Missing, non-numeric or < 1 means the first page.
#[derive(Debug, Clone, Copy)]
pub struct Paging(pub PageRequest);

impl<S> FromRequestParts<S> for Paging
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let page = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .ok()
            .and_then(|Query(params)| params.get("page").and_then(|p| p.trim().parse::<u64>().ok()))
            .unwrap_or(1);

        Ok(Paging(PageRequest::new(page, PER_PAGE)))
    }
}
