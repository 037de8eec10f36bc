use crate::models::User;
use crate::services::auth;
use crate::web::error::AppResult;
use crate::web::extractors::{is_safe_redirect, OptionalUser, SESSION_COOKIE};
use crate::web::forms::{FormErrors, LoginForm, SignupForm};
use crate::web::handlers::make_context;
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use std::sync::Arc;
use time::Duration;

fn session_cookie(token: String, days: i64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .max_age(Duration::days(days))
        .build()
}

#[derive(Deserialize)]
pub struct NextQuery {
    next: Option<String>,
}

fn render_login(
    state: &AppState,
    user: &Option<User>,
    username: &str,
    next: Option<&str>,
    error: Option<&str>,
) -> AppResult<Html<String>> {
    let mut ctx = make_context(state, user);
    ctx.insert("username", username);
    ctx.insert("next", &next.unwrap_or_default());
    ctx.insert("error", &error);
    let html = state.templates.render("users/login.html", &ctx)?;
    Ok(Html(html))
}

pub async fn login_form(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<NextQuery>,
) -> AppResult<Response> {
    Ok(render_login(&state, &user, "", query.next.as_deref(), None)?.into_response())
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let rate_key = format!("login:{}", form.username);
    if !state.login_limiter.check(&rate_key) {
        tracing::warn!(username = %form.username, "Login rate limit hit");
        let html = render_login(
            &state,
            &None,
            &form.username,
            form.next.as_deref(),
            Some("Too many failed login attempts. Please try again later."),
        )?;
        return Ok((StatusCode::TOO_MANY_REQUESTS, html).into_response());
    }

    match auth::authenticate(&state.db, &form.username, &form.password)? {
        Some(user) => {
            state.login_limiter.clear(&rate_key);
            let token = auth::create_session(&state.db, user.id, state.session_days)?;
            tracing::info!(user_id = user.id, "User logged in");

            let target = form
                .next
                .as_deref()
                .filter(|n| is_safe_redirect(n))
                .unwrap_or("/");
            Ok((
                jar.add(session_cookie(token, state.session_days)),
                Redirect::to(target),
            )
                .into_response())
        }
        None => {
            state.login_limiter.record_attempt(&rate_key);
            let html = render_login(
                &state,
                &None,
                &form.username,
                form.next.as_deref(),
                Some("Please enter a correct username and password. Note that both fields may be case-sensitive."),
            )?;
            Ok(html.into_response())
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> AppResult<Response> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if let Err(e) = auth::delete_session(&state.db, cookie.value()) {
            tracing::warn!("Failed to delete session: {:?}", e);
        }
    }

    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .max_age(Duration::ZERO)
        .build();

    let ctx = make_context(&state, &None);
    let html = state.templates.render("users/logged_out.html", &ctx)?;
    Ok((jar.remove(cookie), Html(html)).into_response())
}

fn render_signup(
    state: &AppState,
    user: &Option<User>,
    form: &SignupForm,
    errors: &FormErrors,
) -> AppResult<Response> {
    let mut ctx = make_context(state, user);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    let html = state.templates.render("users/signup.html", &ctx)?;
    Ok(Html(html).into_response())
}

pub async fn signup_form(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
) -> AppResult<Response> {
    render_signup(&state, &user, &SignupForm::default(), &FormErrors::default())
}

pub async fn signup(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let input = match form.clean(&state.db)? {
        Ok(input) => input,
        Err(errors) => return render_signup(&state, &None, &form, &errors),
    };

    let user_id = match SignupForm::register(&state.db, &input)? {
        Ok(id) => id,
        Err(errors) => return render_signup(&state, &None, &form, &errors),
    };
    let token = auth::create_session(&state.db, user_id, state.session_days)?;

    Ok((
        jar.add(session_cookie(token, state.session_days)),
        Redirect::to("/"),
    )
        .into_response())
}
