use async_trait::async_trait;

use yatube_core::domain::{Follow, NewFollow};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, FollowRepository};

use super::{SharedTables, next_id};

pub struct InMemoryFollowRepository {
    tables: SharedTables,
}

impl InMemoryFollowRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Follow, i32> for InMemoryFollowRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Follow>, RepoError> {
        Ok(self.tables.read().await.follows.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables
            .follows
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn count_all(&self) -> Result<u64, RepoError> {
        Ok(self.tables.read().await.follows.len() as u64)
    }
}

#[async_trait]
impl FollowRepository for InMemoryFollowRepository {
    async fn create(&self, follow: NewFollow) -> Result<Follow, RepoError> {
        if follow.user_id == follow.author_id {
            return Err(RepoError::Constraint(format!(
                "user {} cannot follow themselves",
                follow.user_id
            )));
        }
        let mut tables = self.tables.write().await;
        for id in [follow.user_id, follow.author_id] {
            if !tables.users.contains_key(&id) {
                return Err(RepoError::Constraint(format!("user {id} does not exist")));
            }
        }
        let duplicate = tables
            .follows
            .values()
            .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id);
        if duplicate {
            return Err(RepoError::Constraint(format!(
                "user {} already follows {}",
                follow.user_id, follow.author_id
            )));
        }
        let id = next_id(&mut tables.sequences.follows);
        let follow = follow.into_follow(id);
        tables.follows.insert(id, follow.clone());
        Ok(follow)
    }

    async fn find_by_pair(
        &self,
        user_id: i32,
        author_id: i32,
    ) -> Result<Option<Follow>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .follows
            .values()
            .find(|f| f.user_id == user_id && f.author_id == author_id)
            .cloned())
    }

    async fn delete_by_pair(&self, user_id: i32, author_id: i32) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let before = tables.follows.len();
        tables
            .follows
            .retain(|_, f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::InMemoryDatabase;
    use yatube_core::domain::{NewFollow, NewUser};
    use yatube_core::error::RepoError;
    use yatube_core::ports::{BaseRepository, FollowRepository, UserRepository};

    #[tokio::test]
    async fn test_follow_pair_is_unique() {
        let db = InMemoryDatabase::new();
        let kir = db.users().create(NewUser::new("Kir", "", "hash")).await.unwrap();
        let auth = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        let follows = db.follows();

        follows.create(NewFollow::new(kir.id, auth.id)).await.unwrap();
        let again = follows.create(NewFollow::new(kir.id, auth.id)).await;

        assert!(matches!(again, Err(RepoError::Constraint(_))));
        assert_eq!(follows.count_all().await.unwrap(), 1);
        assert!(follows.exists(kir.id, auth.id).await.unwrap());
        assert!(!follows.exists(auth.id, kir.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_self_follow_is_rejected() {
        let db = InMemoryDatabase::new();
        let kir = db.users().create(NewUser::new("Kir", "", "hash")).await.unwrap();
        let follows = db.follows();

        let result = follows.create(NewFollow::new(kir.id, kir.id)).await;

        assert!(matches!(result, Err(RepoError::Constraint(_))));
        assert_eq!(follows.count_all().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_by_pair_reports_whether_removed() {
        let db = InMemoryDatabase::new();
        let kir = db.users().create(NewUser::new("Kir", "", "hash")).await.unwrap();
        let auth = db.users().create(NewUser::new("Auth", "", "hash")).await.unwrap();
        let follows = db.follows();
        follows.create(NewFollow::new(kir.id, auth.id)).await.unwrap();

        assert!(follows.delete_by_pair(kir.id, auth.id).await.unwrap());
        assert!(!follows.delete_by_pair(kir.id, auth.id).await.unwrap());
        assert_eq!(follows.find_by_pair(kir.id, auth.id).await.unwrap(), None);
    }
}
