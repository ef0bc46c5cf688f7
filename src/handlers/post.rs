// src/handlers/post.rs

use axum::{Extension, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::{AppError, field_errors, reject_invalid},
    extract::{FormData, Paging, Path},
    handlers::{comment_resources, discard_stored_file, load_users},
    models::{
        post::{CreatePostRequest, PostResource, UpdatePostRequest},
        upload::check_image,
        user::User,
    },
    policy::{Action, authorize, can_delete_post, can_modify_post},
    repository::RepositoryState,
    response::ApiResponse,
    storage::{POST_IMAGE_FOLDER, StorageState},
};

/// List posts (Recent first), each with its author.
pub async fn list_posts(
    State(repo): State<RepositoryState>,
    Paging(page): Paging,
) -> Result<impl IntoResponse, AppError> {
    let posts = repo.list_posts(None, page).await?;
    let authors = load_users(&repo, posts.items.iter().map(|p| p.user_id)).await?;

    let resources = posts.map(|post| {
        let author = authors.get(&post.user_id).cloned();
        PostResource::new(post, author)
    });

    Ok(ApiResponse::paginated(resources))
}

/// Create a new post owned by the caller.
///
/// Accepts JSON or multipart (with an optional `image`).
pub async fn create_post(
    State(repo): State<RepositoryState>,
    State(storage): State<StorageState>,
    Extension(actor): Extension<User>,
    mut form: FormData<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let image = form.take_file("image");

    form.fields.sanitize();
    let mut errors = field_errors(form.fields.validate());
    check_image(&mut errors, "image", image.as_ref());
    reject_invalid(errors)?;

    let image_url = match image {
        Some(file) => Some(storage.store(POST_IMAGE_FOLDER, &file).await?),
        None => None,
    };

    let new_post = form.fields.into_new_post(actor.id, image_url);
    let post = repo.create_post(new_post).await?;
    tracing::info!("User {} created post {}", actor.id, post.id);

    Ok(ApiResponse::created(PostResource::new(post, Some(actor)))
        .with_message("Post created successfully"))
}

/// Get a single post with its author and its comments (newest first).
pub async fn get_post(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo.find_post(id).await?.ok_or(AppError::NotFound("post"))?;

    let author = repo.find_user(post.user_id).await?;
    let comments = repo.list_post_comments(post.id).await?;
    let comments = comment_resources(&repo, comments, false).await?;

    Ok(ApiResponse::success(PostResource {
        post,
        user: author,
        comments: Some(comments),
    }))
}

/// Update a post.
/// Requires: Author OR Admin. A new image replaces the stored one.
pub async fn update_post(
    State(repo): State<RepositoryState>,
    State(storage): State<StorageState>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
    mut form: FormData<UpdatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo.find_post(id).await?.ok_or(AppError::NotFound("post"))?;

    authorize(can_modify_post(&actor, &post), Action::UpdatePost)?;

    let image = form.take_file("image");
    form.fields.sanitize();
    let mut errors = field_errors(form.fields.validate());
    check_image(&mut errors, "image", image.as_ref());
    reject_invalid(errors)?;

    let mut changes = form.fields.into_changes();

    if let Some(file) = image {
        let url = storage.store(POST_IMAGE_FOLDER, &file).await?;
        if let Some(old) = &post.image_url {
            discard_stored_file(&storage, old).await;
        }
        changes.image_url = Some(url);
    }

    let updated = repo.update_post(post.id, changes).await?;
    let author = repo.find_user(updated.user_id).await?;

    Ok(ApiResponse::success(PostResource::new(updated, author))
        .with_message("Post updated successfully"))
}

/// Delete a post.
/// Requires: Author OR Admin. Its image is removed once the row is gone.
pub async fn delete_post(
    State(repo): State<RepositoryState>,
    State(storage): State<StorageState>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo.find_post(id).await?.ok_or(AppError::NotFound("post"))?;

    authorize(can_delete_post(&actor, &post), Action::DeletePost)?;

    repo.delete_post(post.id).await?;

    if let Some(url) = &post.image_url {
        discard_stored_file(&storage, url).await;
    }

    tracing::info!("User {} deleted post {}", actor.id, post.id);

    Ok(ApiResponse::message("Post deleted successfully"))
}

/// Flag a post as inappropriate. Any authenticated user may flag; it is never unset.
pub async fn flag_post(
    State(repo): State<RepositoryState>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let post = repo.find_post(id).await?.ok_or(AppError::NotFound("post"))?;

    repo.flag_post(post.id).await?;
    tracing::info!("User {} flagged post {}", actor.id, post.id);

    Ok(ApiResponse::message("Post flagged successfully"))
}
