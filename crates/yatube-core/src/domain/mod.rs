//! Domain entities - the core business objects.

mod comment;
mod follow;
mod group;
mod pagination;
mod post;
mod user;

pub use comment::{Comment, NewComment};
pub use follow::{Follow, NewFollow};
pub use group::{Group, NewGroup};
pub use pagination::{DEFAULT_PER_PAGE, Page, PageRequest};
pub use post::{NewPost, Post, PostFilter};
pub use user::{NewUser, User};

/// Number of characters an entity shows when rendered as a short label.
pub const SHORT_LABEL_CHARS: usize = 15;

pub(crate) fn short_label(text: &str) -> &str {
    match text.char_indices().nth(SHORT_LABEL_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
