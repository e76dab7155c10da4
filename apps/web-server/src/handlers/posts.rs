//! Feeds, post pages and the post form.

use actix_web::{HttpResponse, web};
use serde::Serialize;

use yatube_core::domain::{Group, NewComment, NewPost, PageRequest, Post, PostFilter};
use yatube_core::error::DomainError;
use yatube_shared::dto::PageQuery;
use yatube_shared::forms::{CleanedPost, INVALID_IMAGE, field_map};
use yatube_shared::{CommentForm, FormErrors, PostForm};

use super::forms::{PostBody, PostSubmission, Upload, bind};
use super::views::{self, PageView, PostView};
use super::{profile_url, redirect};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;
use crate::templates;

/// Cache key of one rendered index page. Guests share one entry per page.
///
/// `page` is the page number actually served, so any query value maps onto
/// one of the existing pages.
pub fn index_cache_key(viewer: Option<&Identity>, page: u64) -> String {
    let viewer = viewer
        .map(|identity| identity.user_id.to_string())
        .unwrap_or_else(|| "anon".to_string());
    format!("index_page:{}:{}", viewer, page)
}

async fn feed_page(
    state: &AppState,
    filter: PostFilter,
    request: PageRequest,
) -> AppResult<PageView<PostView>> {
    let page = state.posts.find_page(filter, request).await?;
    views::hydrate_page(state, page).await
}

fn page_request(state: &AppState, query: &PageQuery) -> PageRequest {
    PageRequest::from_query(query.page.as_deref(), state.settings.posts_per_page)
}

/// GET /
///
/// Rendered pages are cached for a short while; new posts show up once the
/// entry expires.
pub async fn index(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let viewer = identity.0;
    let request = page_request(&state, &query);
    let total = state.posts.count(PostFilter::All).await?;
    let number = request.resolve(total);
    let cache_key = index_cache_key(viewer.as_ref(), number);

    if let Some(body) = state.cache.get(&cache_key).await {
        tracing::debug!(key = %cache_key, "Index page served from cache");
        return Ok(templates::html(body));
    }

    let request = PageRequest::new(number as i64, request.per_page());
    let page = feed_page(&state, PostFilter::All, request).await?;
    let mut context = templates::context(viewer.as_ref());
    context.insert("page_obj", &page);
    let body = templates::render("posts/index.html", &context)?;

    if let Err(e) = state
        .cache
        .set(&cache_key, &body, Some(state.settings.index_cache_ttl))
        .await
    {
        tracing::warn!(key = %cache_key, error = %e, "Failed to cache index page");
    }

    Ok(templates::html(body))
}

/// GET /group/{slug}/
pub async fn group_posts(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let slug = path.into_inner();
    let group = state
        .groups
        .find_by_slug(&slug)
        .await?
        .ok_or_else(|| DomainError::not_found("Group", &slug))?;

    let request = page_request(&state, &query);
    let page = feed_page(&state, PostFilter::Group(group.id), request).await?;

    let mut context = templates::context(identity.0.as_ref());
    context.insert("group", &views::GroupView::from(&group));
    context.insert("page_obj", &page);
    templates::page("posts/group_list.html", &context)
}

/// GET /profile/{username}/
pub async fn profile(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let page = state
        .posts
        .find_page(PostFilter::Author(author.id), page_request(&state, &query))
        .await?;
    let posts_count = page.total;
    let page = views::hydrate_page(&state, page).await?;

    let viewer = identity.0;
    let show_follow = viewer.as_ref().is_some_and(|v| v.user_id != author.id);
    let following = match viewer.as_ref() {
        Some(v) if show_follow => state.follows.exists(v.user_id, author.id).await?,
        _ => false,
    };

    let mut context = templates::context(viewer.as_ref());
    context.insert("author", &views::AuthorView::from(&author));
    context.insert("posts_count", &posts_count);
    context.insert("show_follow", &show_follow);
    context.insert("following", &following);
    context.insert("page_obj", &page);
    templates::page("posts/profile.html", &context)
}

async fn load_post(state: &AppState, post_id: i32) -> AppResult<Post> {
    state
        .posts
        .find_by_id(post_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Post", post_id).into())
}

/// GET /posts/{post_id}/
pub async fn post_detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;
    let viewer = identity.0;

    let author_posts_count = state.posts.count(PostFilter::Author(post.author_id)).await?;
    let is_author = viewer.as_ref().is_some_and(|v| v.user_id == post.author_id);
    let comments = state.comments.find_by_post(post.id).await?;
    let comments = views::hydrate_comments(&state, comments).await?;
    let post = views::hydrate_post(&state, post).await?;

    let mut context = templates::context(viewer.as_ref());
    context.insert("post", &post);
    context.insert("author_posts_count", &author_posts_count);
    context.insert("is_author", &is_author);
    context.insert("comment_form", &field_map(&CommentForm::FIELDS));
    context.insert("comments", &comments);
    templates::page("posts/post_detail.html", &context)
}

/// One option of the group select box.
#[derive(Debug, Serialize)]
struct GroupChoice<'a> {
    id: i32,
    title: &'a str,
    selected: bool,
}

/// Everything the post form page shows.
struct PostFormPage<'a> {
    action: String,
    is_edit: bool,
    form: &'a PostForm,
    errors: &'a FormErrors,
    groups: &'a [Group],
    current_image: Option<String>,
}

impl PostFormPage<'_> {
    fn render(&self, viewer: &Identity) -> AppResult<HttpResponse> {
        let selected = self.form.group.trim();
        let choices: Vec<GroupChoice<'_>> = self
            .groups
            .iter()
            .map(|group| GroupChoice {
                id: group.id,
                title: &group.title,
                selected: group.id.to_string() == selected,
            })
            .collect();

        let values = [("text", self.form.text.as_str()), ("group", selected)];

        let mut context = templates::context(Some(viewer));
        context.insert("is_edit", &self.is_edit);
        context.insert("action", &self.action);
        context.insert("form", &bind(&PostForm::FIELDS, &values, self.errors));
        context.insert("groups", &choices);
        context.insert("current_image", &self.current_image);
        templates::page("posts/create_post.html", &context)
    }
}

fn group_ids(groups: &[Group]) -> Vec<i32> {
    groups.iter().map(|group| group.id).collect()
}

/// Run the form rules and the image check together so every error shows at once.
fn validate_submission(
    form: &PostForm,
    image: Option<&Upload>,
    group_ids: &[i32],
) -> Result<CleanedPost, FormErrors> {
    let mut errors = FormErrors::default();
    let cleaned = match form.clean(group_ids) {
        Ok(cleaned) => Some(cleaned),
        Err(form_errors) => {
            errors.extend(form_errors);
            None
        }
    };

    if image.is_some_and(|upload| !upload.is_image()) {
        errors.add("image", INVALID_IMAGE);
    }

    match cleaned {
        Some(cleaned) if errors.is_empty() => Ok(cleaned),
        _ => Err(errors),
    }
}

async fn store_image(state: &AppState, image: Option<Upload>) -> AppResult<Option<String>> {
    let Some(upload) = image else {
        return Ok(None);
    };
    let name = upload
        .stored_name()
        .ok_or_else(|| AppError::BadRequest(INVALID_IMAGE.to_string()))?;
    let path = state.media.save("posts", &name, &upload.data).await?;
    Ok(Some(path))
}

/// Remove an image stored for a post that was never written.
async fn discard_image(state: &AppState, path: Option<&str>) {
    let Some(path) = path else { return };
    if let Err(e) = state.media.delete(path).await {
        tracing::warn!(path, error = %e, "Failed to remove orphaned image");
    }
}

/// GET /create/
pub async fn post_create_form(
    state: web::Data<AppState>,
    identity: Identity,
) -> AppResult<HttpResponse> {
    let groups = state.groups.list_all().await?;
    PostFormPage {
        action: "/create/".to_string(),
        is_edit: false,
        form: &PostForm::default(),
        errors: &FormErrors::default(),
        groups: &groups,
        current_image: None,
    }
    .render(&identity)
}

/// POST /create/
pub async fn post_create(
    state: web::Data<AppState>,
    identity: Identity,
    body: PostBody,
) -> AppResult<HttpResponse> {
    let PostSubmission { form, image } = body.into();
    let groups = state.groups.list_all().await?;

    let cleaned = match validate_submission(&form, image.as_ref(), &group_ids(&groups)) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return PostFormPage {
                action: "/create/".to_string(),
                is_edit: false,
                form: &form,
                errors: &errors,
                groups: &groups,
                current_image: None,
            }
            .render(&identity);
        }
    };

    let image = store_image(&state, image).await?;
    let created = state
        .posts
        .create(NewPost {
            text: cleaned.text,
            author_id: identity.user_id,
            group_id: cleaned.group_id,
            image: image.clone(),
        })
        .await;
    let post = match created {
        Ok(post) => post,
        Err(e) => {
            discard_image(&state, image.as_deref()).await;
            return Err(e.into());
        }
    };

    tracing::info!(post_id = post.id, author = %identity.username, "Post created");
    Ok(redirect(profile_url(&identity.username)))
}

/// Load a post the viewer may edit. Other users' posts look missing.
async fn load_own_post(state: &AppState, identity: &Identity, post_id: i32) -> AppResult<Post> {
    let post = load_post(state, post_id).await?;
    if post.author_id != identity.user_id {
        tracing::debug!(post_id, user_id = identity.user_id, "Edit refused for non-author");
        return Err(AppError::NotFound(format!("Post {} not editable", post_id)));
    }
    Ok(post)
}

/// GET /posts/{post_id}/edit/
pub async fn post_edit_form(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
) -> AppResult<HttpResponse> {
    let post = load_own_post(&state, &identity, path.into_inner()).await?;
    let groups = state.groups.list_all().await?;

    PostFormPage {
        action: format!("/posts/{}/edit/", post.id),
        is_edit: true,
        form: &PostForm::new(post.text.clone(), post.group_id),
        errors: &FormErrors::default(),
        groups: &groups,
        current_image: post.image.as_deref().map(views::media_url),
    }
    .render(&identity)
}

/// POST /posts/{post_id}/edit/
pub async fn post_edit(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
    body: PostBody,
) -> AppResult<HttpResponse> {
    let mut post = load_own_post(&state, &identity, path.into_inner()).await?;
    let PostSubmission { form, image } = body.into();
    let groups = state.groups.list_all().await?;

    let cleaned = match validate_submission(&form, image.as_ref(), &group_ids(&groups)) {
        Ok(cleaned) => cleaned,
        Err(errors) => {
            return PostFormPage {
                action: format!("/posts/{}/edit/", post.id),
                is_edit: true,
                form: &form,
                errors: &errors,
                groups: &groups,
                current_image: post.image.as_deref().map(views::media_url),
            }
            .render(&identity);
        }
    };

    let new_image = store_image(&state, image).await?;
    if let Some(path) = &new_image {
        post.image = Some(path.clone());
    }
    post.text = cleaned.text;
    post.group_id = cleaned.group_id;
    let post = match state.posts.update(&post).await {
        Ok(post) => post,
        Err(e) => {
            discard_image(&state, new_image.as_deref()).await;
            return Err(e.into());
        }
    };

    tracing::info!(post_id = post.id, "Post updated");
    Ok(redirect(format!("/posts/{}/", post.id)))
}

/// POST /posts/{post_id}/comment/
///
/// Invalid comments are dropped; the user lands back on the post either way.
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<i32>,
    body: web::Form<CommentForm>,
) -> AppResult<HttpResponse> {
    let post = load_post(&state, path.into_inner()).await?;

    match body.clean() {
        Ok(text) => {
            let comment = state
                .comments
                .create(NewComment::new(post.id, identity.user_id, text))
                .await?;
            tracing::info!(post_id = post.id, comment_id = comment.id, "Comment added");
        }
        Err(errors) => tracing::debug!(post_id = post.id, ?errors, "Comment rejected"),
    }

    Ok(redirect(format!("/posts/{}/", post.id)))
}
