use async_trait::async_trait;

use crate::domain::{
    Comment, Follow, Group, NewComment, NewFollow, NewGroup, NewPost, NewUser, Page, PageRequest,
    Post, PostFilter, User,
};
use crate::error::RepoError;

/// Generic repository trait defining the operations every entity supports.
#[async_trait]
pub trait BaseRepository<T, ID>: Send + Sync {
    /// Find an entity by its unique ID.
    async fn find_by_id(&self, id: ID) -> Result<Option<T>, RepoError>;

    /// Delete an entity by its ID.
    async fn delete(&self, id: ID) -> Result<(), RepoError>;

    /// Count all stored entities.
    async fn count_all(&self) -> Result<u64, RepoError>;
}

/// User repository with domain-specific methods.
#[async_trait]
pub trait UserRepository: BaseRepository<User, i32> {
    /// Store a new user. Fails with `RepoError::Constraint` if the username is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepoError>;

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;

    /// Load several users at once; missing ids are skipped.
    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<User>, RepoError>;
}

/// Group repository.
#[async_trait]
pub trait GroupRepository: BaseRepository<Group, i32> {
    async fn create(&self, group: NewGroup) -> Result<Group, RepoError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError>;

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Group>, RepoError>;

    /// All groups ordered by title, for form choices.
    async fn list_all(&self) -> Result<Vec<Group>, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: BaseRepository<Post, i32> {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;

    /// Persist edits to text, group and image. Author and `pub_date` are never changed.
    async fn update(&self, post: &Post) -> Result<Post, RepoError>;

    /// One page of a feed, newest first.
    async fn find_page(
        &self,
        filter: PostFilter,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError>;

    /// Number of posts a feed would list.
    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError>;
}

/// Comment repository.
#[async_trait]
pub trait CommentRepository: BaseRepository<Comment, i32> {
    async fn create(&self, comment: NewComment) -> Result<Comment, RepoError>;

    /// Comments on a post, oldest first.
    async fn find_by_post(&self, post_id: i32) -> Result<Vec<Comment>, RepoError>;
}

/// Follow repository.
#[async_trait]
pub trait FollowRepository: BaseRepository<Follow, i32> {
    /// Store a follow. Fails with `RepoError::Constraint` if the pair already exists.
    async fn create(&self, follow: NewFollow) -> Result<Follow, RepoError>;

    async fn find_by_pair(&self, user_id: i32, author_id: i32)
    -> Result<Option<Follow>, RepoError>;

    async fn exists(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        Ok(self.find_by_pair(user_id, author_id).await?.is_some())
    }

    /// Remove a follow. Returns whether anything was deleted.
    async fn delete_by_pair(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError>;
}
