// src/repository/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use super::{Page, PageRequest, Repository, StoreError};
use crate::models::{
    comment::{Comment, NewComment},
    post::{NewPost, Post, PostChanges},
    user::{NewUser, ProfileChanges, User},
};

const USER_COLUMNS: &str = "id, name, email, password, department, job_role, avatar, bio, \
                            address, gender, phone, is_admin, created_at, updated_at";

const POST_COLUMNS: &str =
    "id, user_id, title, content, type, image_url, flagged, created_at, updated_at";

const COMMENT_COLUMNS: &str = "id, post_id, user_id, body, created_at, updated_at";

/// `Repository` backed by PostgreSQL.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password, department, job_role, gender, address, phone)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {USER_COLUMNS}
            "#
        );

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(user.name)
            .bind(user.email)
            .bind(user.password)
            .bind(user.department)
            .bind(user.job_role)
            .bind(user.gender)
            .bind(user.address)
            .bind(user.phone)
            .fetch_one(&self.pool)
            .await?;

        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_users(&self, ids: &[i64]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        let (limit, offset) = page.limit_offset();
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY id LIMIT $1 OFFSET $2");
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(users, total as u64, page))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = builder.separated(", ");

        if let Some(name) = changes.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name);
        }

        if let Some(department) = changes.department {
            separated.push("department = ");
            separated.push_bind_unseparated(department);
        }

        if let Some(job_role) = changes.job_role {
            separated.push("job_role = ");
            separated.push_bind_unseparated(job_role);
        }

        if let Some(bio) = changes.bio {
            separated.push("bio = ");
            separated.push_bind_unseparated(bio);
        }

        if let Some(address) = changes.address {
            separated.push("address = ");
            separated.push_bind_unseparated(address);
        }

        if let Some(gender) = changes.gender {
            separated.push("gender = ");
            separated.push_bind_unseparated(gender);
        }

        if let Some(phone) = changes.phone {
            separated.push("phone = ");
            separated.push_bind_unseparated(phone);
        }

        if let Some(avatar) = changes.avatar {
            separated.push("avatar = ");
            separated.push_bind_unseparated(avatar);
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {USER_COLUMNS}"));

        Ok(builder.build_query_as::<User>().fetch_one(&self.pool).await?)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_admin_status(&self, id: i64, is_admin: bool) -> Result<User, StoreError> {
        let sql = format!(
            r#"
            UPDATE users SET is_admin = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {USER_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(is_admin)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO posts (user_id, title, content, type, image_url)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {POST_COLUMNS}
            "#
        );

        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(post.user_id)
            .bind(post.title)
            .bind(post.content)
            .bind(post.kind)
            .bind(post.image_url)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = $1");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_posts(&self, ids: &[i64]) -> Result<Vec<Post>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT {POST_COLUMNS} FROM posts WHERE id = ANY($1)");
        Ok(sqlx::query_as::<_, Post>(&sql)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_posts(
        &self,
        author: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Post>, StoreError> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM posts WHERE ($1::BIGINT IS NULL OR user_id = $1)",
        )
        .bind(author)
        .fetch_one(&self.pool)
        .await?;

        let sql = format!(
            r#"
            SELECT {POST_COLUMNS}
            FROM posts
            WHERE ($1::BIGINT IS NULL OR user_id = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#
        );
        let (limit, offset) = page.limit_offset();
        let posts = sqlx::query_as::<_, Post>(&sql)
            .bind(author)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::new(posts, total as u64, page))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Post, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE posts SET ");
        let mut separated = builder.separated(", ");

        if let Some(title) = changes.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title);
        }

        if let Some(content) = changes.content {
            separated.push("content = ");
            separated.push_bind_unseparated(content);
        }

        if let Some(kind) = changes.kind {
            separated.push("type = ");
            separated.push_bind_unseparated(kind);
        }

        if let Some(image_url) = changes.image_url {
            separated.push("image_url = ");
            separated.push_bind_unseparated(image_url);
        }

        separated.push("updated_at = NOW()");

        builder.push(" WHERE id = ");
        builder.push_bind(id);
        builder.push(format!(" RETURNING {POST_COLUMNS}"));

        Ok(builder.build_query_as::<Post>().fetch_one(&self.pool).await?)
    }

    async fn flag_post(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE posts SET flagged = TRUE, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO comments (post_id, user_id, body)
            VALUES ($1, $2, $3)
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(comment.post_id)
            .bind(comment.user_id)
            .bind(comment.body)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError> {
        let sql = format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1 AND post_id = $2");
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_post_comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE post_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(post_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_user_comments(&self, user_id: i64) -> Result<Vec<Comment>, StoreError> {
        let sql = format!(
            r#"
            SELECT {COMMENT_COLUMNS} FROM comments
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_comment(&self, id: i64, body: &str) -> Result<Comment, StoreError> {
        let sql = format!(
            r#"
            UPDATE comments SET body = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING {COMMENT_COLUMNS}
            "#
        );
        Ok(sqlx::query_as::<_, Comment>(&sql)
            .bind(body)
            .bind(id)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        // Expired entries can no longer authenticate anyway.
        sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < NOW()")
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO revoked_tokens (jti, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (jti) DO NOTHING
            "#,
        )
        .bind(jti)
        .bind(expires_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        let revoked: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = $1)")
                .bind(jti)
                .fetch_one(&self.pool)
                .await?;
        Ok(revoked)
    }
}
