// src/handlers/comment.rs

use axum::{Extension, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    extract::{JsonBody, Path},
    handlers::comment_resources,
    models::{
        comment::{Comment, CommentRequest, CommentResource, NewComment},
        post::Post,
        user::User,
    },
    policy::{Action, authorize, can_delete_comment, can_modify_comment},
    repository::RepositoryState,
    response::ApiResponse,
};

/// Resolves `/posts/{post_id}/comments/{comment_id}`; the comment must belong to the post.
async fn find_post_comment(
    repo: &RepositoryState,
    post_id: i64,
    comment_id: i64,
) -> Result<(Post, Comment), AppError> {
    let post = repo
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    let comment = repo
        .find_comment(post.id, comment_id)
        .await?
        .ok_or(AppError::NotFound("comment"))?;

    Ok((post, comment))
}

/// Comments of a post, newest first, each with its author.
pub async fn list_comments(
    State(repo): State<RepositoryState>,
    Path(post_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    let comments = repo.list_post_comments(post.id).await?;
    let resources = comment_resources(&repo, comments, false).await?;

    Ok(ApiResponse::success(resources))
}

pub async fn create_comment(
    State(repo): State<RepositoryState>,
    Extension(actor): Extension<User>,
    Path(post_id): Path<i64>,
    JsonBody(mut payload): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo
        .find_post(post_id)
        .await?
        .ok_or(AppError::NotFound("post"))?;

    payload.sanitize();
    payload.validate()?;

    let comment = repo
        .create_comment(NewComment {
            post_id: post.id,
            user_id: actor.id,
            body: payload.comment.unwrap_or_default(),
        })
        .await?;

    Ok(ApiResponse::created(CommentResource {
        comment,
        user: Some(actor),
        post: None,
    })
    .with_message("Comment added successfully"))
}

pub async fn get_comment(
    State(repo): State<RepositoryState>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (_, comment) = find_post_comment(&repo, post_id, comment_id).await?;
    let author = repo.find_user(comment.user_id).await?;

    Ok(ApiResponse::success(CommentResource {
        comment,
        user: author,
        post: None,
    }))
}

/// Edit a comment.
/// Requires: Comment author OR Admin.
pub async fn update_comment(
    State(repo): State<RepositoryState>,
    Extension(actor): Extension<User>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
    JsonBody(mut payload): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (_, comment) = find_post_comment(&repo, post_id, comment_id).await?;

    authorize(can_modify_comment(&actor, &comment), Action::UpdateComment)?;

    payload.sanitize();
    payload.validate()?;

    let body = payload.comment.unwrap_or_default();
    let updated = repo.update_comment(comment.id, &body).await?;
    let author = repo.find_user(updated.user_id).await?;

    Ok(ApiResponse::success(CommentResource {
        comment: updated,
        user: author,
        post: None,
    })
    .with_message("Comment updated successfully"))
}

/// Delete a comment.
/// Requires: Comment author, the post's author, OR Admin.
pub async fn delete_comment(
    State(repo): State<RepositoryState>,
    Extension(actor): Extension<User>,
    Path((post_id, comment_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    let (post, comment) = find_post_comment(&repo, post_id, comment_id).await?;

    authorize(
        can_delete_comment(&actor, &comment, &post),
        Action::DeleteComment,
    )?;

    repo.delete_comment(comment.id).await?;

    Ok(ApiResponse::message("Comment deleted successfully"))
}
