pub mod media;
pub mod posts;
pub mod users;

use crate::models::User;
use crate::web::error::AppResult;
use crate::web::extractors::OptionalUser;
use crate::web::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::sync::Arc;
use tera::Context;

pub(crate) fn make_context(state: &AppState, user: &Option<User>) -> Context {
    let mut ctx = Context::new();
    ctx.insert("site", &state.config.site);
    ctx.insert("user", user);
    ctx.insert("year", &chrono::Utc::now().format("%Y").to_string());
    ctx
}

pub(crate) fn not_found(state: &AppState, user: &Option<User>) -> AppResult<Response> {
    let ctx = make_context(state, user);
    let html = state.templates.render("core/404.html", &ctx)?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}

pub async fn fallback(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
) -> AppResult<Response> {
    not_found(&state, &user)
}
