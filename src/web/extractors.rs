use crate::models::User;
use crate::services::auth;
use crate::web::state::AppState;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub const SESSION_COOKIE: &str = "session";

/// The logged-in user. Requests without a valid session are redirected to
/// the login page with the requested path in `next`.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = Response;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let headers = parts.headers.clone();
        let next = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());
        Box::pin(async move {
            let to_login =
                || Redirect::to(&login_redirect_url(&state.config.auth.login_url, &next)).into_response();

            let cookies = CookieJar::from_headers(&headers);
            let token = match cookies.get(SESSION_COOKIE) {
                Some(c) => c.value().to_string(),
                None => return Err(to_login()),
            };

            match auth::validate_session(&state.db, &token) {
                Ok(Some(user)) => Ok(CurrentUser(user)),
                Ok(None) => Err(to_login()),
                Err(e) => {
                    tracing::error!("Session lookup failed: {:?}", e);
                    Err(StatusCode::INTERNAL_SERVER_ERROR.into_response())
                }
            }
        })
    }
}

pub struct OptionalUser(pub Option<User>);

impl FromRequestParts<Arc<AppState>> for OptionalUser {
    type Rejection = StatusCode;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> Pin<Box<dyn Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>>
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        let state = state.clone();
        let headers = parts.headers.clone();
        Box::pin(async move {
            let cookies = CookieJar::from_headers(&headers);
            let token = cookies.get(SESSION_COOKIE).map(|c| c.value().to_string());

            let user = match token {
                Some(t) => auth::validate_session(&state.db, &t).ok().flatten(),
                None => None,
            };

            Ok(OptionalUser(user))
        })
    }
}

/// `<login_url>?next=<next>` with the return path query-encoded except for
/// its slashes.
pub fn login_redirect_url(login_url: &str, next: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(next.as_bytes()).collect();
    format!("{}?next={}", login_url, encoded.replace("%2F", "/"))
}

/// Only local absolute paths are followed after login.
pub fn is_safe_redirect(next: &str) -> bool {
    next.starts_with('/') && !next.starts_with("//") && !next.contains('\\')
}
