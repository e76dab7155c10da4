use async_trait::async_trait;

use yatube_core::domain::{Comment, NewComment};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, CommentRepository};

use super::{SharedTables, next_id};

pub struct InMemoryCommentRepository {
    tables: SharedTables,
}

impl InMemoryCommentRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Comment, i32> for InMemoryCommentRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Comment>, RepoError> {
        Ok(self.tables.read().await.comments.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn count_all(&self) -> Result<u64, RepoError> {
        Ok(self.tables.read().await.comments.len() as u64)
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        if !tables.posts.contains_key(&comment.post_id) {
            return Err(RepoError::Constraint(format!(
                "post {} does not exist",
                comment.post_id
            )));
        }
        if !tables.users.contains_key(&comment.author_id) {
            return Err(RepoError::Constraint(format!(
                "author {} does not exist",
                comment.author_id
            )));
        }
        let id = next_id(&mut tables.sequences.comments);
        let comment = comment.into_comment(id);
        tables.comments.insert(id, comment.clone());
        Ok(comment)
    }

    async fn find_by_post(&self, post_id: i32) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|comment| (comment.created, comment.id));
        Ok(comments)
    }
}
