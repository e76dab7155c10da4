//! Template-facing shapes of domain entities.
//!
//! Posts and comments only carry foreign keys; authors and groups for a
//! whole page are resolved with one batched lookup each.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use yatube_core::domain::{Comment, Group, Page, Post, User};

use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

const DATE_FORMAT: &str = "%d.%m.%Y %H:%M";

#[derive(Debug, Clone, Serialize)]
pub struct AuthorView {
    pub id: i32,
    pub username: String,
}

impl From<&User> for AuthorView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupView {
    pub id: i32,
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl From<&Group> for GroupView {
    fn from(group: &Group) -> Self {
        Self {
            id: group.id,
            title: group.title.clone(),
            slug: group.slug.clone(),
            description: group.description.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostView {
    pub id: i32,
    pub text: String,
    pub short_text: String,
    pub pub_date: String,
    pub author: AuthorView,
    pub group: Option<GroupView>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub text: String,
    pub created: String,
    pub author: AuthorView,
}

/// A page of items plus the navigation values templates need.
#[derive(Debug, Serialize)]
pub struct PageView<T> {
    pub object_list: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
    pub next_page_number: Option<u64>,
    pub previous_page_number: Option<u64>,
    pub page_range: Vec<u64>,
}

impl<T> From<Page<T>> for PageView<T> {
    fn from(page: Page<T>) -> Self {
        Self {
            has_next: page.has_next(),
            has_previous: page.has_previous(),
            next_page_number: page.next_page_number(),
            previous_page_number: page.previous_page_number(),
            page_range: page.page_range().collect(),
            number: page.number,
            num_pages: page.num_pages,
            object_list: page.items,
        }
    }
}

pub fn media_url(path: &str) -> String {
    format!("/media/{}", path)
}

/// Placeholder for rows whose author vanished between queries.
fn unknown_author(id: i32) -> AuthorView {
    AuthorView {
        id,
        username: String::new(),
    }
}

async fn authors_by_id(state: &AppState, ids: BTreeSet<i32>) -> AppResult<HashMap<i32, AuthorView>> {
    let ids: Vec<i32> = ids.into_iter().collect();
    let users = state.users.find_by_ids(&ids).await?;
    Ok(users.iter().map(|u| (u.id, AuthorView::from(u))).collect())
}

/// Resolve authors and groups of `posts`, keeping their order.
pub async fn hydrate_posts(state: &AppState, posts: Vec<Post>) -> AppResult<Vec<PostView>> {
    let authors = authors_by_id(state, posts.iter().map(|p| p.author_id).collect()).await?;

    let group_ids: Vec<i32> = posts
        .iter()
        .filter_map(|p| p.group_id)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let groups: HashMap<i32, GroupView> = if group_ids.is_empty() {
        HashMap::new()
    } else {
        state
            .groups
            .find_by_ids(&group_ids)
            .await?
            .iter()
            .map(|g| (g.id, GroupView::from(g)))
            .collect()
    };

    Ok(posts
        .into_iter()
        .map(|post| PostView {
            short_text: post.to_string(),
            pub_date: post.pub_date.format(DATE_FORMAT).to_string(),
            author: authors
                .get(&post.author_id)
                .cloned()
                .unwrap_or_else(|| unknown_author(post.author_id)),
            group: post.group_id.and_then(|id| groups.get(&id).cloned()),
            image_url: post.image.as_deref().map(media_url),
            id: post.id,
            text: post.text,
        })
        .collect())
}

pub async fn hydrate_post(state: &AppState, post: Post) -> AppResult<PostView> {
    let id = post.id;
    hydrate_posts(state, vec![post])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(format!("post {} vanished while rendering", id)))
}

pub async fn hydrate_page(state: &AppState, page: Page<Post>) -> AppResult<PageView<PostView>> {
    let Page {
        items,
        number,
        total,
        per_page,
        num_pages,
    } = page;
    let items = hydrate_posts(state, items).await?;
    Ok(PageView::from(Page {
        items,
        number,
        num_pages,
        total,
        per_page,
    }))
}

pub async fn hydrate_comments(
    state: &AppState,
    comments: Vec<Comment>,
) -> AppResult<Vec<CommentView>> {
    let authors = authors_by_id(state, comments.iter().map(|c| c.author_id).collect()).await?;

    Ok(comments
        .into_iter()
        .map(|comment| CommentView {
            id: comment.id,
            created: comment.created.format(DATE_FORMAT).to_string(),
            author: authors
                .get(&comment.author_id)
                .cloned()
                .unwrap_or_else(|| unknown_author(comment.author_id)),
            text: comment.text,
        })
        .collect())
}
