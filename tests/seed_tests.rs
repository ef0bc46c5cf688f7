// tests/seed_tests.rs

mod common;

use std::sync::Arc;

use common::{MemoryRepository, test_config};
use scribe::{
    repository::{Repository, RepositoryState},
    seed::seed_admin_user,
    utils::hash::verify_password,
};

#[tokio::test]
async fn admin_is_seeded_once_from_config() {
    let repo: RepositoryState = Arc::new(MemoryRepository::default());

    let mut config = test_config(std::env::temp_dir(), false);
    config.admin_email = Some("root@x.com".to_string());
    config.admin_password = Some("supersecret".to_string());

    assert!(seed_admin_user(&repo, &config).await.unwrap());
    assert!(!seed_admin_user(&repo, &config).await.unwrap());

    let admin = repo.find_user_by_email("root@x.com").await.unwrap().unwrap();
    assert!(admin.is_admin);
    assert!(verify_password("supersecret", &admin.password).unwrap());
}

#[tokio::test]
async fn nothing_is_seeded_without_credentials() {
    let repo: RepositoryState = Arc::new(MemoryRepository::default());
    let config = test_config(std::env::temp_dir(), false);

    assert!(!seed_admin_user(&repo, &config).await.unwrap());
    assert!(repo.find_user_by_email("root@x.com").await.unwrap().is_none());
}
