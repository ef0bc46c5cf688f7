// src/handlers/auth.rs

use axum::{Extension, extract::State, response::IntoResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::{AppError, field_errors, reject_invalid},
    extract::JsonBody,
    models::{
        check_confirmed,
        user::{LoginRequest, RegisterRequest, User},
    },
    repository::{RepositoryState, StoreError},
    response::ApiResponse,
    utils::{
        hash::{hash_password, verify_password},
        jwt::{Claims, sign_jwt},
    },
};

const EMAIL_TAKEN: &str = "The email has already been taken.";

/// Registers a new user.
///
/// Hashes the password using Argon2 before storing it. New accounts are never
/// admins, whatever the payload says.
/// Returns 201 Created with the user and a bearer token.
pub async fn register(
    State(repo): State<RepositoryState>,
    State(config): State<Config>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut errors = field_errors(payload.validate());
    check_confirmed(
        &mut errors,
        "password",
        &payload.password,
        &payload.password_confirmation,
    );

    if let Some(email) = &payload.email {
        if !errors.contains_key("email") && repo.find_user_by_email(email).await?.is_some() {
            errors
                .entry("email".to_string())
                .or_default()
                .push(EMAIL_TAKEN.to_string());
        }
    }
    reject_invalid(errors)?;

    let hashed_password = hash_password(payload.password.as_deref().unwrap_or_default())?;

    // A concurrent registration can still win the race to the unique index.
    let user = repo
        .create_user(payload.into_new_user(hashed_password))
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation(_) => AppError::invalid("email", EMAIL_TAKEN),
            other => AppError::from(other),
        })?;

    tracing::info!("User {} registered", user.id);

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(ApiResponse::created(json!({ "user": user, "token": token }))
        .with_message("User registered successfully"))
}

/// Authenticates a user and returns a JWT token.
///
/// Unknown email and wrong password fail identically.
pub async fn login(
    State(repo): State<RepositoryState>,
    State(config): State<Config>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let email = payload.email.as_deref().unwrap_or_default();
    let password = payload.password.as_deref().unwrap_or_default();

    let user = match repo.find_user_by_email(email).await? {
        Some(user) if verify_password(password, &user.password)? => user,
        _ => {
            return Err(AppError::invalid(
                "email",
                "The provided credentials are incorrect.",
            ));
        }
    };

    let token = sign_jwt(user.id, &config.jwt_secret, config.jwt_expiration)?;

    Ok(ApiResponse::success(json!({ "user": user, "token": token }))
        .with_message("User logged in successfully"))
}

/// Revokes the token used for this request.
pub async fn logout(
    State(repo): State<RepositoryState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    repo.revoke_token(&claims.jti, claims.expires_at()).await?;

    Ok(ApiResponse::message("User logged out successfully"))
}

/// The authenticated user.
pub async fn current_user(Extension(actor): Extension<User>) -> impl IntoResponse {
    ApiResponse::success(json!({ "user": actor }))
}
