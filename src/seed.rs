// src/seed.rs

use crate::{
    config::Config,
    error::AppError,
    models::user::NewUser,
    repository::RepositoryState,
    utils::hash::hash_password,
};

/// Creates the bootstrap admin from `ADMIN_EMAIL` / `ADMIN_PASSWORD`.
///
/// Does nothing when either variable is unset or the account already exists.
/// Returns whether an account was created.
pub async fn seed_admin_user(repo: &RepositoryState, config: &Config) -> Result<bool, AppError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(false);
    };

    let email = email.trim().to_lowercase();
    if repo.find_user_by_email(&email).await?.is_some() {
        return Ok(false);
    }

    tracing::info!("Seeding admin user: {}", email);

    let user = repo
        .create_user(NewUser {
            name: "Administrator".to_string(),
            email,
            password: hash_password(password)?,
            department: None,
            job_role: None,
            gender: None,
            address: None,
            phone: None,
        })
        .await?;
    repo.set_admin_status(user.id, true).await?;

    tracing::info!("Admin user created successfully.");
    Ok(true)
}
