use crate::models::{PostWithRelations, User};
use crate::services::cache::index_page_key;
use crate::services::paginator::{Page, Paginator};
use crate::services::posts::PostFilter;
use crate::services::{auth, comments, groups, posts};
use crate::web::error::{AppError, AppResult};
use crate::web::extractors::{CurrentUser, OptionalUser};
use crate::web::forms::{CommentForm, FormErrors, PostForm};
use crate::web::handlers::{make_context, not_found};
use crate::web::state::AppState;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct PageQuery {
    page: Option<String>,
}

/// Paginator over the posts matching `filter` and the page number the raw
/// `?page=` value resolves to.
fn resolve_page(
    state: &AppState,
    filter: PostFilter,
    raw_page: Option<&str>,
) -> anyhow::Result<(Paginator, usize)> {
    let count = posts::count_posts(&state.db, filter)?;
    let paginator = Paginator::new(count, state.config.content.posts_per_page);
    let number = paginator.get_page_number(raw_page);
    Ok((paginator, number))
}

fn load_page(
    state: &AppState,
    filter: PostFilter,
    paginator: &Paginator,
    number: usize,
) -> anyhow::Result<Page<PostWithRelations>> {
    let (limit, offset) = paginator.bounds(number);
    let items = posts::list_posts(&state.db, filter, limit, offset)?;
    Ok(paginator.page(items, number))
}

fn paginate_posts(
    state: &AppState,
    filter: PostFilter,
    raw_page: Option<&str>,
) -> anyhow::Result<Page<PostWithRelations>> {
    let (paginator, number) = resolve_page(state, filter, raw_page)?;
    load_page(state, filter, &paginator, number)
}

fn parse_post_id(raw: &str) -> Option<i64> {
    raw.parse::<i64>().ok().filter(|id| *id > 0)
}

fn detail_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

pub async fn index(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Html<String>> {
    let (paginator, number) = resolve_page(&state, PostFilter::All, query.page.as_deref())?;
    let key = index_page_key(number, user.as_ref().map(|u| u.username.as_str()));
    if let Some(html) = state.page_cache.get(&key) {
        tracing::debug!(key = %key, "Index page served from cache");
        return Ok(Html(html));
    }

    let page_obj = load_page(&state, PostFilter::All, &paginator, number)?;

    let mut ctx = make_context(&state, &user);
    ctx.insert("page_obj", &page_obj);

    let html = state.templates.render("posts/index.html", &ctx)?;
    state.page_cache.insert(key, html.clone());
    Ok(Html(html))
}

pub async fn group_posts(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let Some(group) = groups::get_group_by_slug(&state.db, &slug)? else {
        return not_found(&state, &user);
    };

    let page_obj = paginate_posts(&state, PostFilter::Group(group.id), query.page.as_deref())?;

    let mut ctx = make_context(&state, &user);
    ctx.insert("group", &group);
    ctx.insert("page_obj", &page_obj);

    let html = state.templates.render("posts/group_list.html", &ctx)?;
    Ok(Html(html).into_response())
}

pub async fn profile(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> AppResult<Response> {
    let Some(author) = auth::get_user_by_username(&state.db, &username)? else {
        return not_found(&state, &user);
    };

    let page_obj = paginate_posts(&state, PostFilter::Author(author.id), query.page.as_deref())?;

    let mut ctx = make_context(&state, &user);
    ctx.insert("author", &crate::models::UserSummary::from(&author));
    ctx.insert("posts_count", &page_obj.count);
    ctx.insert("page_obj", &page_obj);

    let html = state.templates.render("posts/profile.html", &ctx)?;
    Ok(Html(html).into_response())
}

pub async fn post_detail(
    State(state): State<Arc<AppState>>,
    OptionalUser(user): OptionalUser,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    let post = match parse_post_id(&raw_id) {
        Some(id) => posts::get_post_with_relations(&state.db, id)?,
        None => None,
    };
    let Some(post) = post else {
        return not_found(&state, &user);
    };

    let comments = comments::list_comments(&state.db, post.post.id)?;
    let author_posts_count = posts::count_posts(&state.db, PostFilter::Author(post.post.author_id))?;
    let is_author = user.as_ref().is_some_and(|u| u.id == post.post.author_id);

    let mut ctx = make_context(&state, &user);
    ctx.insert("post", &post);
    ctx.insert("comments", &comments);
    ctx.insert("posts_count", &author_posts_count);
    ctx.insert("is_author", &is_author);
    ctx.insert("comment_form", &CommentForm::default());

    let html = state.templates.render("posts/post_detail.html", &ctx)?;
    Ok(Html(html).into_response())
}

fn render_post_form(
    state: &AppState,
    user: &User,
    form: &PostForm,
    errors: &FormErrors,
    edited: Option<&PostWithRelations>,
) -> AppResult<Response> {
    let all_groups = groups::list_groups(&state.db)?;

    let mut ctx = make_context(state, &Some(user.clone()));
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert("groups", &all_groups);
    ctx.insert("is_edit", &edited.is_some());
    ctx.insert("post", &edited);

    let html = state.templates.render("posts/create_post.html", &ctx)?;
    Ok(Html(html).into_response())
}

pub async fn post_create_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> AppResult<Response> {
    render_post_form(&state, &user, &PostForm::default(), &FormErrors::default(), None)
}

pub async fn post_create(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let form = PostForm::from_multipart(multipart, state.max_upload_bytes)
        .await
        .map_err(AppError::multipart)?;

    let clean = match form.clean(&state.db, state.max_upload_bytes)? {
        Ok(clean) => clean,
        Err(errors) => return render_post_form(&state, &user, &form, &errors, None),
    };

    let input = clean.into_input(&state.media_dir, None)?;
    posts::create_post(&state.db, input, user.id)?;

    Ok(Redirect::to(&format!("/profile/{}/", user.username)).into_response())
}

/// Loads the post for editing. `Err` carries the response for an unknown
/// post or a requester who is not the author.
fn load_editable_post(
    state: &AppState,
    user: &User,
    raw_id: &str,
) -> AppResult<Result<PostWithRelations, Response>> {
    let post = match parse_post_id(raw_id) {
        Some(id) => posts::get_post_with_relations(&state.db, id)?,
        None => None,
    };
    let Some(post) = post else {
        return Ok(Err(not_found(state, &Some(user.clone()))?));
    };

    if post.post.author_id != user.id {
        tracing::debug!(
            post_id = post.post.id,
            user_id = user.id,
            "Edit by non-author redirected to detail"
        );
        return Ok(Err(Redirect::to(&detail_url(post.post.id)).into_response()));
    }

    Ok(Ok(post))
}

pub async fn post_edit_form(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
) -> AppResult<Response> {
    let post = match load_editable_post(&state, &user, &raw_id)? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };

    let form = PostForm::from_post(&post.post);
    render_post_form(&state, &user, &form, &FormErrors::default(), Some(&post))
}

pub async fn post_edit(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    multipart: Multipart,
) -> AppResult<Response> {
    let post = match load_editable_post(&state, &user, &raw_id)? {
        Ok(post) => post,
        Err(response) => return Ok(response),
    };

    let form = PostForm::from_multipart(multipart, state.max_upload_bytes)
        .await
        .map_err(AppError::multipart)?;

    let clean = match form.clean(&state.db, state.max_upload_bytes)? {
        Ok(clean) => clean,
        Err(errors) => return render_post_form(&state, &user, &form, &errors, Some(&post)),
    };

    let input = clean.into_input(&state.media_dir, Some(&post.post))?;
    posts::update_post(&state.db, post.post.id, input)?;

    Ok(Redirect::to(&detail_url(post.post.id)).into_response())
}

pub async fn add_comment(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
    Path(raw_id): Path<String>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let post = match parse_post_id(&raw_id) {
        Some(id) => posts::get_post(&state.db, id)?,
        None => None,
    };
    let Some(post) = post else {
        return not_found(&state, &Some(user));
    };

    match form.clean() {
        Ok(text) => {
            comments::create_comment(&state.db, post.id, user.id, &text)?;
        }
        Err(_) => {
            tracing::debug!(post_id = post.id, "Empty comment discarded");
        }
    }

    Ok(Redirect::to(&detail_url(post.id)).into_response())
}
