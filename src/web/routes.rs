use super::handlers;
use super::state::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

/// Slack for the multipart framing and text fields around an upload.
const FORM_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn post_routes(max_upload_bytes: usize) -> Router<Arc<AppState>> {
    let body_limit = DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES);

    Router::new()
        .route("/", get(handlers::posts::index))
        .route("/group/:slug/", get(handlers::posts::group_posts))
        .route("/profile/:username/", get(handlers::posts::profile))
        .route("/posts/:post_id/", get(handlers::posts::post_detail))
        .route(
            "/create/",
            get(handlers::posts::post_create_form)
                .post(handlers::posts::post_create)
                .layer(body_limit),
        )
        .route(
            "/posts/:post_id/edit/",
            get(handlers::posts::post_edit_form)
                .post(handlers::posts::post_edit)
                .layer(body_limit),
        )
        .route(
            "/posts/:post_id/comment/",
            post(handlers::posts::add_comment),
        )
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/auth/signup/",
            get(handlers::users::signup_form).post(handlers::users::signup),
        )
        .route(
            "/auth/login/",
            get(handlers::users::login_form).post(handlers::users::login),
        )
        .route(
            "/auth/logout/",
            get(handlers::users::logout).post(handlers::users::logout),
        )
}

pub fn media_routes() -> Router<Arc<AppState>> {
    Router::new().route("/media/posts/:filename", get(handlers::media::post_image))
}
