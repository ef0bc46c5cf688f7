// src/handlers/user.rs

use axum::{Extension, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::{AppError, field_errors, reject_invalid},
    extract::{FormData, JsonBody, Paging, Path},
    handlers::{comment_resources, discard_stored_file},
    models::{
        check_confirmed,
        post::PostResource,
        upload::check_image,
        user::{AdminStatusRequest, ChangePasswordRequest, UpdateProfileRequest, User},
    },
    policy::{Action, authorize, can_set_admin_status},
    repository::RepositoryState,
    response::ApiResponse,
    storage::{AVATAR_FOLDER, StorageState},
    utils::{
        hash::{hash_password, verify_password},
        html::clean_opt,
    },
};

/// List all users (paginated, by id).
pub async fn list_users(
    State(repo): State<RepositoryState>,
    Paging(page): Paging,
) -> Result<impl IntoResponse, AppError> {
    let users = repo.list_users(page).await?;
    Ok(ApiResponse::paginated(users))
}

pub async fn get_user(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user = repo.find_user(id).await?.ok_or(AppError::NotFound("user"))?;
    Ok(ApiResponse::success(user))
}

/// Update the caller's own profile.
///
/// Accepts JSON or multipart (with an optional `avatar` image). A new avatar
/// replaces the stored one; the old file is removed before the new URL is saved.
pub async fn update_profile(
    State(repo): State<RepositoryState>,
    State(storage): State<StorageState>,
    Extension(actor): Extension<User>,
    mut form: FormData<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    let avatar = form.take_file("avatar");

    let mut errors = field_errors(form.fields.validate());
    check_image(&mut errors, "avatar", avatar.as_ref());
    reject_invalid(errors)?;

    let mut changes = form.fields.into_changes();
    changes.bio = clean_opt(changes.bio);

    if let Some(file) = avatar {
        let url = storage.store(AVATAR_FOLDER, &file).await?;
        if let Some(old) = &actor.avatar {
            discard_stored_file(&storage, old).await;
        }
        changes.avatar = Some(url);
    }

    let user = repo.update_profile(actor.id, changes).await?;

    Ok(ApiResponse::success(user).with_message("Profile updated successfully"))
}

/// Change the caller's password. The current one must be re-entered.
pub async fn change_password(
    State(repo): State<RepositoryState>,
    Extension(actor): Extension<User>,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = field_errors(payload.validate());
    check_confirmed(
        &mut errors,
        "password",
        &payload.password,
        &payload.password_confirmation,
    );
    reject_invalid(errors)?;

    let current = payload.current_password.as_deref().unwrap_or_default();
    if !verify_password(current, &actor.password)? {
        return Err(AppError::invalid(
            "current_password",
            "The current password is incorrect.",
        ));
    }

    let hashed_password = hash_password(payload.password.as_deref().unwrap_or_default())?;
    repo.update_password(actor.id, &hashed_password).await?;

    Ok(ApiResponse::message("Password changed successfully"))
}

/// Grant or revoke admin rights. Admin only.
pub async fn update_admin_status(
    State(repo): State<RepositoryState>,
    Extension(actor): Extension<User>,
    Path(id): Path<i64>,
    JsonBody(payload): JsonBody<AdminStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    authorize(can_set_admin_status(&actor), Action::SetAdminStatus)?;

    let target = repo.find_user(id).await?.ok_or(AppError::NotFound("user"))?;

    payload.validate()?;
    let is_admin = payload
        .flag()
        .ok_or_else(|| AppError::invalid("is_admin", "The is admin field must be true or false."))?;

    let user = repo.set_admin_status(target.id, is_admin).await?;
    tracing::info!(
        "User {} set admin status of user {} to {}",
        actor.id,
        user.id,
        is_admin
    );

    Ok(ApiResponse::success(user).with_message("User admin status updated successfully"))
}

/// Posts written by one user, newest first (paginated).
pub async fn list_user_posts(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
    Paging(page): Paging,
) -> Result<impl IntoResponse, AppError> {
    let author = repo.find_user(id).await?.ok_or(AppError::NotFound("user"))?;

    let posts = repo.list_posts(Some(author.id), page).await?;
    let resources = posts.map(|post| PostResource::new(post, Some(author.clone())));

    Ok(ApiResponse::paginated(resources))
}

/// Comments written by one user, newest first, each with its post.
pub async fn list_user_comments(
    State(repo): State<RepositoryState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let author = repo.find_user(id).await?.ok_or(AppError::NotFound("user"))?;

    let comments = repo.list_user_comments(author.id).await?;
    let resources = comment_resources(&repo, comments, true).await?;

    Ok(ApiResponse::success(resources))
}
