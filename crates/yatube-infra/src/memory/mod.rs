//! In-memory repositories - used when `DATABASE_URL` is not configured and in tests.
//!
//! All repositories created from one [`InMemoryDatabase`] share the same
//! tables, so cross-entity queries (the follow feed) and cascading deletes
//! behave like they do against PostgreSQL.

mod comments;
mod follows;
mod groups;
mod posts;
mod users;

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use yatube_core::domain::{Comment, Follow, Group, Post, User};

pub use comments::InMemoryCommentRepository;
pub use follows::InMemoryFollowRepository;
pub use groups::InMemoryGroupRepository;
pub use posts::InMemoryPostRepository;
pub use users::InMemoryUserRepository;

/// Rows of every table plus their id sequences.
#[derive(Default)]
pub(crate) struct Tables {
    users: BTreeMap<i32, User>,
    groups: BTreeMap<i32, Group>,
    posts: BTreeMap<i32, Post>,
    comments: BTreeMap<i32, Comment>,
    follows: BTreeMap<i32, Follow>,
    sequences: Sequences,
}

#[derive(Default)]
struct Sequences {
    users: i32,
    groups: i32,
    posts: i32,
    comments: i32,
    follows: i32,
}

fn next_id(sequence: &mut i32) -> i32 {
    *sequence += 1;
    *sequence
}

impl Tables {
    fn remove_post(&mut self, id: i32) -> Option<Post> {
        let post = self.posts.remove(&id)?;
        self.comments.retain(|_, comment| comment.post_id != id);
        Some(post)
    }

    fn remove_user(&mut self, id: i32) -> Option<User> {
        let user = self.users.remove(&id)?;
        let authored: Vec<i32> = self
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in authored {
            self.remove_post(post_id);
        }
        self.comments.retain(|_, comment| comment.author_id != id);
        self.follows
            .retain(|_, follow| follow.user_id != id && follow.author_id != id);
        Some(user)
    }

    fn remove_group(&mut self, id: i32) -> Option<Group> {
        let group = self.groups.remove(&id)?;
        for post in self.posts.values_mut() {
            if post.group_id == Some(id) {
                post.group_id = None;
            }
        }
        Some(group)
    }
}

type SharedTables = Arc<RwLock<Tables>>;

/// Handle to one in-memory data set. Cheap to clone.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    tables: SharedTables,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> InMemoryUserRepository {
        InMemoryUserRepository::new(self.tables.clone())
    }

    pub fn groups(&self) -> InMemoryGroupRepository {
        InMemoryGroupRepository::new(self.tables.clone())
    }

    pub fn posts(&self) -> InMemoryPostRepository {
        InMemoryPostRepository::new(self.tables.clone())
    }

    pub fn comments(&self) -> InMemoryCommentRepository {
        InMemoryCommentRepository::new(self.tables.clone())
    }

    pub fn follows(&self) -> InMemoryFollowRepository {
        InMemoryFollowRepository::new(self.tables.clone())
    }
}
