// tests/common/mod.rs

#![allow(dead_code)]

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use scribe::{
    config::Config,
    models::{
        comment::{Comment, NewComment},
        post::{NewPost, Post, PostChanges},
        user::{NewUser, ProfileChanges, User},
    },
    repository::{Page, PageRequest, Repository, StoreError},
    routes,
    state::AppState,
    storage::LocalStorage,
};
use serde_json::{Value, json};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    revoked: HashMap<String, DateTime<Utc>>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `Repository` with switches to simulate store behaviour.
#[derive(Default)]
pub struct MemoryRepository {
    tables: Mutex<Tables>,
    /// Refuse to delete posts that still have comments, like a FK without cascade.
    pub refuse_post_cascade: AtomicBool,
    /// Fail every call like an unreachable database.
    pub broken: AtomicBool,
    /// Panic while listing users.
    pub panic_on_list_users: AtomicBool,
}

fn row_not_found() -> StoreError {
    StoreError::Database("no rows returned by a query that expected to return at least one row".into())
}

fn page_of<T: Clone>(rows: Vec<T>, page: PageRequest) -> Page<T> {
    let total = rows.len() as u64;
    let items = rows
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.per_page as usize)
        .collect();
    Page::new(items, total, page)
}

impl MemoryRepository {
    fn check(&self) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            Err(StoreError::Database(
                "error communicating with database: Connection refused".into(),
            ))
        } else {
            Ok(())
        }
    }

    pub fn user(&self, id: i64) -> Option<User> {
        let tables = self.tables.lock().unwrap();
        tables.users.iter().find(|u| u.id == id).cloned()
    }

    pub fn post(&self, id: i64) -> Option<Post> {
        let tables = self.tables.lock().unwrap();
        tables.posts.iter().find(|p| p.id == id).cloned()
    }

    pub fn comment_count(&self) -> usize {
        self.tables.lock().unwrap().comments.len()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if tables.users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            name: user.name,
            email: user.email,
            password: user.password,
            department: user.department,
            job_role: user.job_role,
            avatar: None,
            bio: None,
            address: user.address,
            gender: user.gender,
            phone: user.phone,
            is_admin: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, StoreError> {
        self.check()?;
        Ok(self.user(id))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn find_users(&self, ids: &[i64]) -> Result<Vec<User>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .users
            .iter()
            .filter(|u| ids.contains(&u.id))
            .cloned()
            .collect())
    }

    async fn list_users(&self, page: PageRequest) -> Result<Page<User>, StoreError> {
        self.check()?;
        if self.panic_on_list_users.load(Ordering::SeqCst) {
            panic!("user listing exploded");
        }
        let mut users = self.tables.lock().unwrap().users.clone();
        users.sort_by_key(|u| u.id);
        Ok(page_of(users, page))
    }

    async fn update_profile(&self, id: i64, changes: ProfileChanges) -> Result<User, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(row_not_found)?;

        if let Some(v) = changes.name {
            user.name = v;
        }
        if let Some(v) = changes.department {
            user.department = Some(v);
        }
        if let Some(v) = changes.job_role {
            user.job_role = Some(v);
        }
        if let Some(v) = changes.bio {
            user.bio = Some(v);
        }
        if let Some(v) = changes.address {
            user.address = Some(v);
        }
        if let Some(v) = changes.gender {
            user.gender = Some(v);
        }
        if let Some(v) = changes.phone {
            user.phone = Some(v);
        }
        if let Some(v) = changes.avatar {
            user.avatar = Some(v);
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(row_not_found)?;
        user.password = password_hash.to_string();
        Ok(())
    }

    async fn set_admin_status(&self, id: i64, is_admin: bool) -> Result<User, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let user = tables
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(row_not_found)?;
        user.is_admin = is_admin;
        Ok(user.clone())
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.users.iter().any(|u| u.id == post.user_id) {
            return Err(StoreError::ForeignKeyViolation);
        }

        let now = Utc::now();
        let post = Post {
            id: tables.next_id(),
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            kind: post.kind,
            image_url: post.image_url,
            flagged: false,
            created_at: now,
            updated_at: now,
        };
        tables.posts.push(post.clone());
        Ok(post)
    }

    async fn find_post(&self, id: i64) -> Result<Option<Post>, StoreError> {
        self.check()?;
        Ok(self.post(id))
    }

    async fn find_posts(&self, ids: &[i64]) -> Result<Vec<Post>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .posts
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn list_posts(
        &self,
        author: Option<i64>,
        page: PageRequest,
    ) -> Result<Page<Post>, StoreError> {
        self.check()?;
        let mut posts: Vec<Post> = self
            .tables
            .lock()
            .unwrap()
            .posts
            .iter()
            .filter(|p| author.is_none_or(|a| p.user_id == a))
            .cloned()
            .collect();
        posts.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(page_of(posts, page))
    }

    async fn update_post(&self, id: i64, changes: PostChanges) -> Result<Post, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let post = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(row_not_found)?;

        if let Some(v) = changes.title {
            post.title = v;
        }
        if let Some(v) = changes.content {
            post.content = v;
        }
        if let Some(v) = changes.kind {
            post.kind = v;
        }
        if let Some(v) = changes.image_url {
            post.image_url = Some(v);
        }
        post.updated_at = Utc::now();
        Ok(post.clone())
    }

    async fn flag_post(&self, id: i64) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(post) = tables.posts.iter_mut().find(|p| p.id == id) {
            post.flagged = true;
        }
        Ok(())
    }

    async fn delete_post(&self, id: i64) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let has_comments = tables.comments.iter().any(|c| c.post_id == id);
        if has_comments && self.refuse_post_cascade.load(Ordering::SeqCst) {
            return Err(StoreError::ForeignKeyViolation);
        }
        tables.comments.retain(|c| c.post_id != id);
        tables.posts.retain(|p| p.id != id);
        Ok(())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        if !tables.posts.iter().any(|p| p.id == comment.post_id) {
            return Err(StoreError::ForeignKeyViolation);
        }

        let now = Utc::now();
        let comment = Comment {
            id: tables.next_id(),
            post_id: comment.post_id,
            user_id: comment.user_id,
            body: comment.body,
            created_at: now,
            updated_at: now,
        };
        tables.comments.push(comment.clone());
        Ok(comment)
    }

    async fn find_comment(&self, post_id: i64, id: i64) -> Result<Option<Comment>, StoreError> {
        self.check()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .comments
            .iter()
            .find(|c| c.id == id && c.post_id == post_id)
            .cloned())
    }

    async fn list_post_comments(&self, post_id: i64) -> Result<Vec<Comment>, StoreError> {
        self.check()?;
        let mut comments: Vec<Comment> = self
            .tables
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(comments)
    }

    async fn list_user_comments(&self, user_id: i64) -> Result<Vec<Comment>, StoreError> {
        self.check()?;
        let mut comments: Vec<Comment> = self
            .tables
            .lock()
            .unwrap()
            .comments
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        Ok(comments)
    }

    async fn update_comment(&self, id: i64, body: &str) -> Result<Comment, StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        let comment = tables
            .comments
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(row_not_found)?;
        comment.body = body.to_string();
        comment.updated_at = Utc::now();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: i64) -> Result<(), StoreError> {
        self.check()?;
        self.tables.lock().unwrap().comments.retain(|c| c.id != id);
        Ok(())
    }

    async fn revoke_token(&self, jti: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check()?;
        let mut tables = self.tables.lock().unwrap();
        tables.revoked.retain(|_, exp| *exp >= Utc::now());
        tables.revoked.insert(jti.to_string(), expires_at);
        Ok(())
    }

    async fn is_token_revoked(&self, jti: &str) -> Result<bool, StoreError> {
        self.check()?;
        Ok(self.tables.lock().unwrap().revoked.contains_key(jti))
    }
}

pub struct TestApp {
    pub address: String,
    pub repo: Arc<MemoryRepository>,
    pub storage_root: PathBuf,
    pub client: reqwest::Client,
}

/// Helper function to spawn the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(false).await
}

pub fn test_config(storage_root: PathBuf, app_debug: bool) -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        app_debug,
        port: 0,
        storage_root,
        admin_email: None,
        admin_password: None,
    }
}

pub async fn spawn_app_with(app_debug: bool) -> TestApp {
    let storage_root =
        std::env::temp_dir().join(format!("scribe-test-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&storage_root).expect("Failed to create storage dir");

    let config = test_config(storage_root.clone(), app_debug);

    let repo = Arc::new(MemoryRepository::default());
    let state = AppState {
        repo: repo.clone(),
        storage: Arc::new(LocalStorage::new(storage_root.clone())),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        repo,
        storage_root,
        client: reqwest::Client::new(),
    }
}

pub const PASSWORD: &str = "password1";

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    /// Registers a user and returns `(token, id)`.
    pub async fn register(&self, name: &str, email: &str) -> (String, i64) {
        let response = self
            .client
            .post(self.url("/register"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "password_confirmation": PASSWORD
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        (
            body["data"]["token"].as_str().unwrap().to_string(),
            body["data"]["user"]["id"].as_i64().unwrap(),
        )
    }

    /// Registers a user and promotes it straight in the store.
    pub async fn register_admin(&self, email: &str) -> (String, i64) {
        let (token, id) = self.register("Admin", email).await;
        self.repo.set_admin_status(id, true).await.unwrap();
        (token, id)
    }

    /// Creates an article and returns its id.
    pub async fn create_post(&self, token: &str, title: &str) -> i64 {
        let response = self
            .client
            .post(self.url("/posts"))
            .bearer_auth(token)
            .json(&json!({"title": title, "content": "Body text", "type": "article"}))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }

    /// Adds a comment and returns its id.
    pub async fn create_comment(&self, token: &str, post_id: i64, text: &str) -> i64 {
        let response = self
            .client
            .post(self.url(&format!("/posts/{}/comments", post_id)))
            .bearer_auth(token)
            .json(&json!({"comment": text}))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 201);

        let body: Value = response.json().await.unwrap();
        body["data"]["id"].as_i64().unwrap()
    }
}

/// Smallest valid GIF header, enough to pass content sniffing.
pub fn gif_bytes() -> Vec<u8> {
    b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00!\xf9\x04\x01\x00\x00\x00\x00,\x00\x00\x00\x00\x01\x00\x01\x00\x00\x02\x02D\x01\x00;".to_vec()
}

pub fn png_bytes() -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image::DynamicImage::new_rgb8(2, 2)
        .write_to(&mut out, image::ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}
