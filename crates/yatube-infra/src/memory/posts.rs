use std::cmp::Reverse;

use async_trait::async_trait;

use yatube_core::domain::{NewPost, Page, PageRequest, Post, PostFilter};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, PostRepository};

use super::{SharedTables, Tables, next_id};

pub struct InMemoryPostRepository {
    tables: SharedTables,
}

impl InMemoryPostRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

fn check_references(tables: &Tables, author_id: i32, group_id: Option<i32>) -> Result<(), RepoError> {
    if !tables.users.contains_key(&author_id) {
        return Err(RepoError::Constraint(format!("author {author_id} does not exist")));
    }
    if let Some(group_id) = group_id
        && !tables.groups.contains_key(&group_id)
    {
        return Err(RepoError::Constraint(format!("group {group_id} does not exist")));
    }
    Ok(())
}

/// Posts matching `filter`, newest first.
fn select(tables: &Tables, filter: PostFilter) -> Vec<Post> {
    let mut posts: Vec<Post> = match filter {
        PostFilter::All => tables.posts.values().cloned().collect(),
        PostFilter::Group(group_id) => tables
            .posts
            .values()
            .filter(|post| post.group_id == Some(group_id))
            .cloned()
            .collect(),
        PostFilter::Author(author_id) => tables
            .posts
            .values()
            .filter(|post| post.author_id == author_id)
            .cloned()
            .collect(),
        PostFilter::FollowedBy(user_id) => {
            let authors: Vec<i32> = tables
                .follows
                .values()
                .filter(|follow| follow.user_id == user_id)
                .map(|follow| follow.author_id)
                .collect();
            tables
                .posts
                .values()
                .filter(|post| authors.contains(&post.author_id))
                .cloned()
                .collect()
        }
    };
    posts.sort_by_key(|post| Reverse((post.pub_date, post.id)));
    posts
}

#[async_trait]
impl BaseRepository<Post, i32> for InMemoryPostRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.remove_post(id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn count_all(&self) -> Result<u64, RepoError> {
        Ok(self.tables.read().await.posts.len() as u64)
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        check_references(&tables, post.author_id, post.group_id)?;
        let id = next_id(&mut tables.sequences.posts);
        let post = post.into_post(id);
        tables.posts.insert(id, post.clone());
        Ok(post)
    }

    async fn update(&self, post: &Post) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        check_references(&tables, post.author_id, post.group_id)?;
        let stored = tables.posts.get_mut(&post.id).ok_or(RepoError::NotFound)?;
        stored.text = post.text.clone();
        stored.group_id = post.group_id;
        stored.image = post.image.clone();
        Ok(stored.clone())
    }

    async fn find_page(
        &self,
        filter: PostFilter,
        request: PageRequest,
    ) -> Result<Page<Post>, RepoError> {
        let tables = self.tables.read().await;
        Ok(Page::from_vec(select(&tables, filter), &request))
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(select(&tables, filter).len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::InMemoryDatabase;
    use yatube_core::domain::{
        NewComment, NewFollow, NewGroup, NewPost, NewUser, PageRequest, PostFilter,
    };
    use yatube_core::error::RepoError;
    use yatube_core::ports::{
        BaseRepository, CommentRepository, FollowRepository, GroupRepository, PostRepository,
        UserRepository,
    };

    #[tokio::test]
    async fn test_feed_is_newest_first_and_paginated() {
        let db = InMemoryDatabase::new();
        let author = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        for n in 0..13 {
            db.posts()
                .create(NewPost::new(author.id, format!("post {n}")))
                .await
                .unwrap();
        }

        let first = db
            .posts()
            .find_page(PostFilter::All, PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first.items[0].text, "post 12");

        let second = db
            .posts()
            .find_page(PostFilter::All, PageRequest::new(2, 10))
            .await
            .unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(second.items[2].text, "post 0");
    }

    #[tokio::test]
    async fn test_filters_by_group_author_and_follows() {
        let db = InMemoryDatabase::new();
        let author = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        let other = db.users().create(NewUser::new("Other", "", "hash")).await.unwrap();
        let reader = db.users().create(NewUser::new("Reader", "", "hash")).await.unwrap();
        let group = db.groups().create(NewGroup::new("G", "g", "")).await.unwrap();

        db.posts()
            .create(NewPost::new(author.id, "grouped").with_group(group.id))
            .await
            .unwrap();
        db.posts().create(NewPost::new(other.id, "plain")).await.unwrap();
        db.follows()
            .create(NewFollow::new(reader.id, author.id))
            .await
            .unwrap();

        let posts = db.posts();
        assert_eq!(posts.count(PostFilter::All).await.unwrap(), 2);
        assert_eq!(posts.count(PostFilter::Group(group.id)).await.unwrap(), 1);
        assert_eq!(posts.count(PostFilter::Author(other.id)).await.unwrap(), 1);

        let feed = posts
            .find_page(PostFilter::FollowedBy(reader.id), PageRequest::first(10))
            .await
            .unwrap();
        assert_eq!(feed.items.len(), 1);
        assert_eq!(feed.items[0].text, "grouped");
        assert_eq!(posts.count(PostFilter::FollowedBy(other.id)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_update_keeps_author_and_date() {
        let db = InMemoryDatabase::new();
        let author = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        let group = db.groups().create(NewGroup::new("G", "g", "")).await.unwrap();
        let post = db.posts().create(NewPost::new(author.id, "old")).await.unwrap();

        let mut edited = post.clone();
        edited.text = "new".to_string();
        edited.group_id = Some(group.id);
        let saved = db.posts().update(&edited).await.unwrap();

        assert_eq!(saved.text, "new");
        assert_eq!(saved.group_id, Some(group.id));
        assert_eq!(saved.pub_date, post.pub_date);
        assert_eq!(db.posts().count_all().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_create_requires_existing_author_and_group() {
        let db = InMemoryDatabase::new();
        let result = db.posts().create(NewPost::new(1, "orphan")).await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));

        let author = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        let result = db
            .posts()
            .create(NewPost::new(author.id, "text").with_group(5))
            .await;
        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_deleting_post_removes_comments() {
        let db = InMemoryDatabase::new();
        let author = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        let post = db.posts().create(NewPost::new(author.id, "text")).await.unwrap();
        db.comments()
            .create(NewComment::new(post.id, author.id, "comment"))
            .await
            .unwrap();

        db.posts().delete(post.id).await.unwrap();

        assert_eq!(db.comments().count_all().await.unwrap(), 0);
        assert!(matches!(
            db.posts().delete(post.id).await,
            Err(RepoError::NotFound)
        ));
    }
}
