// src/models/post.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationError};

use super::{comment::CommentResource, empty_as_none, filled, rule_error, user::User};
use crate::utils::html::{clean_filled, clean_opt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "post_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PostType {
    Article,
    Gif,
}

impl FromStr for PostType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "article" => Ok(PostType::Article),
            "gif" => Ok(PostType::Gif),
            _ => Err(()),
        }
    }
}

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Post {
    pub id: i64,
    /// Author. Set once at creation.
    pub user_id: i64,
    pub title: String,
    pub content: String,

    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: PostType,

    pub image_url: Option<String>,

    /// Set by moderation; never cleared.
    pub flagged: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub kind: PostType,
    pub image_url: Option<String>,
}

/// Partial post update; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub kind: Option<PostType>,
    pub image_url: Option<String>,
}

/// Restricts the post type to 'article' or 'gif'.
fn validate_post_type(kind: &str) -> Result<(), ValidationError> {
    kind.parse::<PostType>()
        .map(|_| ())
        .map_err(|_| rule_error("in", "The selected type is invalid."))
}

/// DTO for creating a new post. The optional `image` travels as a multipart file.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "The title field is required."),
        length(max = 255, message = "The title field must not be greater than 255 characters.")
    )]
    pub title: Option<String>,

    #[serde(default, deserialize_with = "empty_as_none")]
    #[validate(required(message = "The content field is required."))]
    pub content: Option<String>,

    #[serde(rename = "type", default, deserialize_with = "empty_as_none")]
    #[validate(
        required(message = "The type field is required."),
        custom(function = validate_post_type)
    )]
    pub kind: Option<String>,
}

fn title_filled(title: &str) -> Result<(), ValidationError> {
    filled(title, "The title field is required.")
}

fn content_filled(content: &str) -> Result<(), ValidationError> {
    filled(content, "The content field is required.")
}

/// DTO for updating a post. Absent fields keep their value; present ones
/// must not be blank.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[serde(default)]
    #[validate(
        custom(function = title_filled),
        length(max = 255, message = "The title field must not be greater than 255 characters.")
    )]
    pub title: Option<String>,

    #[serde(default)]
    #[validate(custom(function = content_filled))]
    pub content: Option<String>,

    #[serde(rename = "type", default)]
    #[validate(custom(function = validate_post_type))]
    pub kind: Option<String>,
}

impl CreatePostRequest {
    /// Sanitizes the body in place. Runs before validation so markup-only
    /// content fails `required`.
    pub fn sanitize(&mut self) {
        self.content = clean_filled(self.content.take());
    }

    /// Converts a validated request into insertable columns.
    pub fn into_new_post(self, user_id: i64, image_url: Option<String>) -> NewPost {
        NewPost {
            user_id,
            title: self.title.unwrap_or_default(),
            content: self.content.unwrap_or_default(),
            kind: self
                .kind
                .and_then(|k| k.parse().ok())
                .unwrap_or(PostType::Article),
            image_url,
        }
    }
}

impl UpdatePostRequest {
    /// Sanitizes the body in place; a markup-only body then fails `filled`.
    pub fn sanitize(&mut self) {
        self.content = clean_opt(self.content.take());
    }

    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title,
            content: self.content,
            kind: self.kind.and_then(|k| k.parse().ok()),
            image_url: None,
        }
    }
}

/// A post with its author and, on single fetches, its comments.
#[derive(Debug, Clone, Serialize)]
pub struct PostResource {
    #[serde(flatten)]
    pub post: Post,
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<CommentResource>>,
}

impl PostResource {
    pub fn new(post: Post, user: Option<User>) -> Self {
        Self {
            post,
            user,
            comments: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::field_errors;
    use serde_json::json;

    #[test]
    fn create_requires_title_content_and_type() {
        let req: CreatePostRequest = serde_json::from_value(json!({"title": ""})).unwrap();
        let errors = field_errors(req.validate());
        assert_eq!(errors["title"], vec!["The title field is required.".to_string()]);
        assert_eq!(errors["content"], vec!["The content field is required.".to_string()]);
        assert_eq!(errors["type"].len(), 1);
    }

    #[test]
    fn type_is_limited_to_article_or_gif() {
        let req: CreatePostRequest = serde_json::from_value(
            json!({"title": "T", "content": "C", "type": "video"}),
        )
        .unwrap();
        let errors = field_errors(req.validate());
        assert_eq!(errors["type"], vec!["The selected type is invalid.".to_string()]);

        let req: CreatePostRequest =
            serde_json::from_value(json!({"title": "T", "content": "C", "type": "gif"})).unwrap();
        assert!(req.validate().is_ok());
    }

    #[test]
    fn update_accepts_empty_payload() {
        let req: UpdatePostRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_ok());
        assert!(req.title.is_none() && req.content.is_none() && req.kind.is_none());
    }

    #[test]
    fn update_rejects_blank_present_fields() {
        let req: UpdatePostRequest =
            serde_json::from_value(json!({"title": "  ", "content": ""})).unwrap();
        let errors = field_errors(req.validate());
        assert_eq!(errors["title"], vec!["The title field is required.".to_string()]);
        assert_eq!(errors["content"], vec!["The content field is required.".to_string()]);
    }

    #[test]
    fn conversions_parse_the_type() {
        let req: CreatePostRequest =
            serde_json::from_value(json!({"title": "T", "content": "C", "type": "gif"})).unwrap();
        let new_post = req.into_new_post(7, Some("/storage/posts/a.gif".into()));
        assert_eq!(new_post.user_id, 7);
        assert_eq!(new_post.kind, PostType::Gif);

        let req: UpdatePostRequest = serde_json::from_value(json!({"type": "article"})).unwrap();
        let changes = req.into_changes();
        assert_eq!(changes.kind, Some(PostType::Article));
        assert!(changes.title.is_none() && changes.image_url.is_none());
    }

    #[test]
    fn title_length_is_capped() {
        let req: UpdatePostRequest =
            serde_json::from_value(json!({"title": "x".repeat(256)})).unwrap();
        assert!(req.validate().is_err());
    }
}
