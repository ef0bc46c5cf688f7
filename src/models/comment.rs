// src/models/comment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use super::{empty_as_none, post::Post, user::User};
use crate::utils::html::clean_filled;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    #[serde(rename = "comment")]
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub user_id: i64,
    pub body: String,
}

/// DTO for creating or editing a comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CommentRequest {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(required(message = "The comment field is required."))]
    pub comment: Option<String>,
}

impl CommentRequest {
    /// Sanitizes in place before validation, so markup-only text counts as missing.
    pub fn sanitize(&mut self) {
        self.comment = clean_filled(self.comment.take());
    }
}

/// DTO for displaying a comment with its author (and parent post when listed per user).
#[derive(Debug, Clone, Serialize)]
pub struct CommentResource {
    #[serde(flatten)]
    pub comment: Comment,
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Post>,
}
