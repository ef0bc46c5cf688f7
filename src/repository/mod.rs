// src/repository/mod.rs

mod postgres;

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub use postgres::PgRepository;

use crate::models::{
    comment::{Comment, NewComment},
    post::{NewPost, Post, PostChanges},
    user::{NewUser, ProfileChanges, User},
};

/// Page size of every listing endpoint.
pub const PER_PAGE: u64 = 10;

/// Offset pagination input. `page` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    /// Rows to skip. Saturates instead of overflowing for absurd page numbers.
    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }

    /// `LIMIT`/`OFFSET` as SQL `BIGINT`s. Offsets past `i64::MAX` clamp to it,
    /// which still selects nothing.
    pub fn limit_offset(&self) -> (i64, i64) {
        (
            i64::try_from(self.per_page).unwrap_or(i64::MAX),
            i64::try_from(self.offset()).unwrap_or(i64::MAX),
        )
    }
}

/// One page of results plus the metadata the envelope needs.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        Self {
            items,
            total,
            per_page: request.per_page,
            current_page: request.page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
        }
    }
}

#[derive(Debug)]
pub enum StoreError {
    /// A row is still referenced by another table.
    ForeignKeyViolation,
    /// A unique constraint (named) rejected the write.
    UniqueViolation(String),
    Database(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::ForeignKeyViolation => write!(f, "foreign key violation"),
            StoreError::UniqueViolation(constraint) => {
                write!(f, "unique constraint violated: {}", constraint)
            }
            StoreError::Database(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation;
            }
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(
                    db_err.constraint().unwrap_or_default().to_string(),
                );
            }
        }
        StoreError::Database(err.to_string())
    }
}

/// Repository Trait
///
/// Every persistence operation the handlers need. Lookups by id return
/// `Ok(None)` on a miss; the handlers decide how that surfaces.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_users(&self, ids: &[i64]) -> Result<Vec<User>, StoreError>;
    /// Users ordered by id.
    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, StoreError>;
    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User, StoreError>;
    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError>;
    async fn set_admin_status(&self, id: i64, is_admin: bool) -> Result<User, StoreError>;

    // --- Posts ---
    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError>;
    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError>;
    async fn find_posts(&self, ids: &[i64]) -> Result<Vec<Post>, StoreError>;
    /// Newest first, optionally restricted to one author.
    async fn list_posts(
        &self,
        author: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Post>, StoreError>;
    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Post, StoreError>;
    async fn flag_post(&self, id: i64) -> Result<(), StoreError>;
    async fn delete_post(&self, id: i64) -> Result<(), StoreError>;

    // --- Comments ---
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError>;
    /// Only matches a comment that belongs to `post_id`.
    async fn find_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError>;
    async fn list_post_comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn list_user_comments(&self, user_id: i64) -> Result<Vec<Comment>, StoreError>;
    async fn update_comment(&self, id: i64, body: &str) -> Result<Comment, StoreError>;
    async fn delete_comment(&self, id: i64) -> Result<(), StoreError>;

    // --- Tokens ---
    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError>;
    async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError>;
}

pub type RepositoryState = Arc<dyn Repository>;
