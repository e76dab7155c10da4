use serde::{Deserialize, Serialize};

/// Follow entity - a directed subscription from `user_id` to `author_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follow {
    pub id: i32,
    pub user_id: i32,
    pub author_id: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct NewFollow {
    pub user_id: i32,
    pub author_id: i32,
}

impl NewFollow {
    pub fn new(user_id: i32, author_id: i32) -> Self {
        Self { user_id, author_id }
    }

    /// Users cannot subscribe to themselves.
    pub fn is_self_follow(&self) -> bool {
        self.user_id == self.author_id
    }

    pub fn into_follow(self, id: i32) -> Follow {
        Follow {
            id,
            user_id: self.user_id,
            author_id: self.author_id,
        }
    }
}
