// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{Method, header},
    middleware,
    routing::{get, post, put},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{
    error::{expose_fault_detail, handle_panic, method_not_allowed, route_not_found},
    handlers::{auth, comment, post, user},
    state::AppState,
    storage::PUBLIC_PREFIX,
    utils::jwt::auth_middleware,
};

/// Request bodies above this are refused outright. Larger than the image cap
/// so oversized uploads still reach validation.
const BODY_LIMIT: usize = 10 * 1024 * 1024;

/// Assembles the main application router.
///
/// * Public auth routes and token-protected routes, all under `/api`.
/// * Stored uploads served at `/storage`.
/// * Every unmatched path, wrong method, panic and fault rendered as an envelope.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let public_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .method_not_allowed_fallback(method_not_allowed);

    let user_routes = Router::new()
        .route("/logout", post(auth::logout))
        .route("/user", get(auth::current_user))
        .route("/users", get(user::list_users))
        .route("/users/{id}", get(user::get_user))
        .route("/users/{id}/admin-status", put(user::update_admin_status))
        .route("/users/{id}/posts", get(user::list_user_posts))
        .route("/users/{id}/comments", get(user::list_user_comments))
        .route("/profile", put(user::update_profile))
        .route("/change-password", post(user::change_password));

    let post_routes = Router::new()
        .route("/posts", get(post::list_posts).post(post::create_post))
        .route(
            "/posts/{id}",
            get(post::get_post)
                .put(post::update_post)
                .delete(post::delete_post),
        )
        .route("/posts/{id}/flag", put(post::flag_post))
        .route(
            "/posts/{id}/comments",
            get(comment::list_comments).post(comment::create_comment),
        )
        .route(
            "/posts/{id}/comments/{comment_id}",
            get(comment::get_comment)
                .put(comment::update_comment)
                .delete(comment::delete_comment),
        );

    // Everything except register/login requires a valid, unrevoked token.
    let protected_routes = user_routes
        .merge(post_routes)
        .method_not_allowed_fallback(method_not_allowed)
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .nest_service(PUBLIC_PREFIX, ServeDir::new(&state.config.storage_root))
        .fallback(route_not_found)
        // Global Middleware (the last layer added is the outermost)
        .layer(DefaultBodyLimit::max(BODY_LIMIT))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            expose_fault_detail,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
