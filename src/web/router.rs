//! Router for the HTTP API.

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{admin, auth, board, setup, AppState};
use super::middleware::{create_cors_layer, jwt_auth, login_rate_limit, JwtState, LoginRateLimit};
use crate::config::WebConfig;

/// Build the `/api` router with tracing, CORS and JWT layers.
pub fn create_router(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    config: &WebConfig,
) -> Router {
    let login_limit = Arc::new(LoginRateLimit::new(config.login_rate_limit));
    create_router_with_limiter(app_state, jwt_state, login_limit, &config.cors_origins)
}

/// Like [`create_router`], with a caller-owned login limiter so its
/// cleanup task can be started.
pub fn create_router_with_limiter(
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    login_limit: Arc<LoginRateLimit>,
    cors_origins: &[String],
) -> Router {
    let login_route = Router::new()
        .route("/login", post(auth::login))
        .route_layer(middleware::from_fn(move |req, next| {
            login_rate_limit(login_limit.clone(), req, next)
        }));

    let auth_routes = Router::new()
        .merge(login_route)
        .route("/register", post(auth::register))
        .route(
            "/one-time-password",
            post(auth::redeem_one_time_password_handler),
        )
        .route("/me", get(auth::me).put(auth::update_me))
        .route("/me/password", put(auth::change_my_password));

    let setup_routes = Router::new()
        .route("/status", get(setup::setup_status))
        .route("/admin", post(setup::create_first_admin));

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route("/users/:username", delete(admin::delete_user))
        .route("/users/:username/roles", put(admin::set_user_role))
        .route("/invitations", post(admin::create_invitation))
        .route("/invitations/count", get(admin::invitation_count))
        .route("/one-time-passwords", post(admin::create_one_time_password));

    let board_routes = Router::new()
        .route("/threads", get(board::list_threads).post(board::create_thread))
        .route("/posts", get(board::list_posts).post(board::create_post))
        .route("/posts/mine", get(board::list_my_posts))
        .route(
            "/posts/:id",
            get(board::get_post)
                .put(board::update_post)
                .delete(board::delete_post),
        )
        .route("/posts/:id/read", put(board::set_post_read))
        .route(
            "/posts/:id/replies",
            get(board::list_replies).post(board::create_reply),
        )
        .route(
            "/replies/:id",
            put(board::update_reply).delete(board::delete_reply),
        )
        .route("/replies/:id/read", put(board::set_reply_read));

    let api_routes = Router::new()
        .route("/health", get(health_check))
        .nest("/setup", setup_routes)
        .nest("/auth", auth_routes)
        .nest("/admin", admin_routes)
        .merge(board_routes);

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    jwt_auth(jwt_state.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

async fn health_check() -> &'static str {
    "OK"
}
