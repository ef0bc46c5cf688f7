// src/handlers/mod.rs

pub mod auth;
pub mod comment;
pub mod post;
pub mod user;

use std::collections::HashMap;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentResource},
        post::Post,
        user::User,
    },
    repository::RepositoryState,
    storage::StorageState,
};

/// Loads the users behind `ids` in one query, keyed by id.
pub(crate) async fn load_users(
    repo: &RepositoryState,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, User>, AppError> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    Ok(repo
        .find_users(&ids)
        .await?
        .into_iter()
        .map(|user| (user.id, user))
        .collect())
}

async fn load_posts(
    repo: &RepositoryState,
    ids: impl IntoIterator<Item = i64>,
) -> Result<HashMap<i64, Post>, AppError> {
    let mut ids: Vec<i64> = ids.into_iter().collect();
    ids.sort_unstable();
    ids.dedup();

    Ok(repo
        .find_posts(&ids)
        .await?
        .into_iter()
        .map(|post| (post.id, post))
        .collect())
}

/// Attaches each comment's author, and its parent post when `with_posts` is set.
pub(crate) async fn comment_resources(
    repo: &RepositoryState,
    comments: Vec<Comment>,
    with_posts: bool,
) -> Result<Vec<CommentResource>, AppError> {
    let authors = load_users(repo, comments.iter().map(|c| c.user_id)).await?;
    let posts = if with_posts {
        load_posts(repo, comments.iter().map(|c| c.post_id)).await?
    } else {
        HashMap::new()
    };

    Ok(comments
        .into_iter()
        .map(|comment| CommentResource {
            user: authors.get(&comment.user_id).cloned(),
            post: posts.get(&comment.post_id).cloned(),
            comment,
        })
        .collect())
}

/// Best-effort removal of a replaced or orphaned upload. A leftover file is
/// logged, never surfaced to the client.
pub(crate) async fn discard_stored_file(storage: &StorageState, url: &str) {
    if let Err(e) = storage.delete(url).await {
        tracing::warn!("Failed to delete stored file {}: {}", url, e);
    }
}
