mod authentication;
pub mod config;
mod data_formats;
mod db_helpers;
mod errors;
mod handlers;
pub mod media;
mod models;
mod ownership;

use std::{net::TcpListener, str::FromStr, sync::Arc};

use anyhow::Context;
pub use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::http::{
    header::{AUTHORIZATION, CONTENT_TYPE},
    HeaderValue, Method, StatusCode,
};
use axum::{routing::*, Extension, Json, Router};
pub use config::Config;
pub use data_formats::*;
use handlers::*;
pub use media::{MediaStore, MemoryMediaStore};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub type JsonResponse<T> = (StatusCode, Json<T>);

/// Upper bound for request bodies, media uploads included.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared by every handler through an `Extension` layer.
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub media: Arc<dyn MediaStore>,
}

pub async fn run_app(app: Router, listener: TcpListener) -> Result<()> {
    axum::Server::from_tcp(listener)?
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

pub async fn init_db(config: &Config) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .context("DATABASE_URL is not a valid sqlite url")?
        .create_if_missing(true)
        .foreign_keys(true);

    // an in-memory database lives and dies with its one connection
    let pool = if is_in_memory(&config.database_url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new().connect_with(options).await?
    };

    tracing::debug!("running migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!(database = %config.database_url, "database ready");
    Ok(pool)
}

pub fn make_router() -> Router {
    let user_routes = Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/logout", post(logout_user))
        .route("/refresh-token", post(refresh_access_token))
        .route("/change-password", post(change_password))
        .route("/current-user", get(get_current_user))
        .route("/update-account", patch(update_account))
        .route("/avatar", patch(update_user_avatar))
        .route("/cover-image", patch(update_user_cover_image))
        .route("/c/:username", get(get_user_channel_profile))
        .route("/history", get(get_watch_history));

    let art_routes = Router::new()
        .route("/", get(get_all_arts).post(publish_art))
        .route("/:art_id", get(get_art).patch(update_art).delete(delete_art))
        .route("/:art_id/toggle-publish", patch(toggle_publish_status));

    let comment_routes = Router::new()
        .route("/:art_id", get(get_art_comments).post(add_comment))
        .route("/c/:comment_id", patch(update_comment).delete(delete_comment));

    let like_routes = Router::new()
        .route("/art/:art_id/toggle", post(toggle_art_like))
        .route("/comment/:comment_id/toggle", post(toggle_comment_like))
        .route("/arts", get(get_liked_arts));

    Router::new()
        .route("/healthcheck", get(alive))
        .nest("/user", user_routes)
        .nest("/art", art_routes)
        .nest("/comment", comment_routes)
        .nest("/like", like_routes)
        .fallback(not_found)
}

fn cors_layer(origin: &str) -> Result<CorsLayer> {
    let origin: HeaderValue = origin.parse().context("CORS_ORIGIN is not a valid origin")?;
    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]))
}

/// The full application: routes, shared state and the HTTP middleware stack.
pub fn make_app(state: AppState) -> Result<Router> {
    let cors = match &state.config.cors_origin {
        Some(origin) => Some(cors_layer(origin)?),
        None => None,
    };
    let mut app = make_router()
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(Extension(Arc::new(state)));
    if let Some(cors) = cors {
        app = app.layer(cors);
    }
    Ok(app.layer(TraceLayer::new_for_http()))
}
