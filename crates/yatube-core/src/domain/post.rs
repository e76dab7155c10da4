use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::short_label;

/// Post entity - a user-authored text entry, optionally grouped and illustrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i32,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub author_id: i32,
    pub group_id: Option<i32>,
    /// Media-relative path of the attached image, e.g. `posts/picture.gif`.
    pub image: Option<String>,
}

/// Data for a post that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub text: String,
    pub author_id: i32,
    pub group_id: Option<i32>,
    pub image: Option<String>,
}

impl NewPost {
    pub fn new(author_id: i32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            author_id,
            group_id: None,
            image: None,
        }
    }

    pub fn with_group(mut self, group_id: i32) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Materialize the post. `pub_date` is fixed here and never changes afterwards.
    pub fn into_post(self, id: i32) -> Post {
        Post {
            id,
            text: self.text,
            pub_date: Utc::now(),
            author_id: self.author_id,
            group_id: self.group_id,
            image: self.image,
        }
    }
}

/// Which posts a feed lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    /// Site-wide feed.
    All,
    /// Posts in a group.
    Group(i32),
    /// Posts written by one author.
    Author(i32),
    /// Posts written by authors the given user follows.
    FollowedBy(i32),
}

impl std::fmt::Display for Post {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(short_label(&self.text))
    }
}
