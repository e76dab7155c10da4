use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::short_label;

/// Comment entity - a reply attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i32,
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
    pub created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i32,
    pub author_id: i32,
    pub text: String,
}

impl NewComment {
    pub fn new(post_id: i32, author_id: i32, text: impl Into<String>) -> Self {
        Self {
            post_id,
            author_id,
            text: text.into(),
        }
    }

    pub fn into_comment(self, id: i32) -> Comment {
        Comment {
            id,
            post_id: self.post_id,
            author_id: self.author_id,
            text: self.text,
            created: Utc::now(),
        }
    }
}

impl std::fmt::Display for Comment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(short_label(&self.text))
    }
}
