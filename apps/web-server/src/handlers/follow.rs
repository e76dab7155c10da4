//! Subscriptions between users and the feed they produce.

use actix_web::{HttpResponse, web};

use yatube_core::domain::{NewFollow, PageRequest, PostFilter};
use yatube_core::error::{DomainError, RepoError};
use yatube_shared::dto::PageQuery;

use super::{profile_url, redirect, views};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;
use crate::templates;

/// GET /follow/
pub async fn follow_index(
    state: web::Data<AppState>,
    identity: Identity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let request = PageRequest::from_query(query.page.as_deref(), state.settings.posts_per_page);
    let page = state
        .posts
        .find_page(PostFilter::FollowedBy(identity.user_id), request)
        .await?;
    let page = views::hydrate_page(&state, page).await?;

    let mut context = templates::context(Some(&identity));
    context.insert("page_obj", &page);
    templates::page("posts/follow.html", &context)
}

/// GET /profile/{username}/follow/
///
/// Following yourself or someone you already follow changes nothing.
pub async fn profile_follow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    let follow = NewFollow::new(identity.user_id, author.id);
    if !follow.is_self_follow() && !state.follows.exists(identity.user_id, author.id).await? {
        match state.follows.create(follow).await {
            Ok(_) => tracing::info!(user = %identity.username, author = %author.username, "Followed"),
            // Lost a race with a concurrent request for the same pair
            Err(RepoError::Constraint(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }

    Ok(redirect(profile_url(&author.username)))
}

/// GET /profile/{username}/unfollow/
pub async fn profile_unfollow(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let username = path.into_inner();
    let author = state
        .users
        .find_by_username(&username)
        .await?
        .ok_or_else(|| DomainError::not_found("User", &username))?;

    if state
        .follows
        .delete_by_pair(identity.user_id, author.id)
        .await?
    {
        tracing::info!(user = %identity.username, author = %author.username, "Unfollowed");
    }

    Ok(redirect(profile_url(&author.username)))
}
