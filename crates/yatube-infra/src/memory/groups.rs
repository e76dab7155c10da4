use async_trait::async_trait;

use yatube_core::domain::{Group, NewGroup};
use yatube_core::error::RepoError;
use yatube_core::ports::{BaseRepository, GroupRepository};

use super::{SharedTables, next_id};

pub struct InMemoryGroupRepository {
    tables: SharedTables,
}

impl InMemoryGroupRepository {
    pub(crate) fn new(tables: SharedTables) -> Self {
        Self { tables }
    }
}

#[async_trait]
impl BaseRepository<Group, i32> for InMemoryGroupRepository {
    async fn find_by_id(&self, id: i32) -> Result<Option<Group>, RepoError> {
        Ok(self.tables.read().await.groups.get(&id).cloned())
    }

    async fn delete(&self, id: i32) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        tables.remove_group(id).map(|_| ()).ok_or(RepoError::NotFound)
    }

    async fn count_all(&self) -> Result<u64, RepoError> {
        Ok(self.tables.read().await.groups.len() as u64)
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn create(&self, group: NewGroup) -> Result<Group, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.groups.values().any(|g| g.slug == group.slug) {
            return Err(RepoError::Constraint(format!(
                "slug '{}' is already taken",
                group.slug
            )));
        }
        let id = next_id(&mut tables.sequences.groups);
        let group = group.into_group(id);
        tables.groups.insert(id, group.clone());
        Ok(group)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.groups.values().find(|g| g.slug == slug).cloned())
    }

    async fn find_by_ids(&self, ids: &[i32]) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.groups.get(id).cloned())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<Group>, RepoError> {
        let tables = self.tables.read().await;
        let mut groups: Vec<Group> = tables.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
        Ok(groups)
    }
}
