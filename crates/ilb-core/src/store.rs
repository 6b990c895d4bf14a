use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{link_key, link_key_prefix, user_from_key, GroupId, InviteLink, UserId};
use crate::ports::LinkStore;
use crate::Result;

/// In-memory `LinkStore` backend for tests and local runs.
///
/// Uses the same `link:{group}:{user}` key format as the SQLite backend; the
/// BTreeMap keeps `list_group` in stable key order.
#[derive(Debug, Default)]
pub struct MemoryLinkStore {
    inner: Mutex<BTreeMap<String, String>>,
}

impl MemoryLinkStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }
}

#[async_trait]
impl LinkStore for MemoryLinkStore {
    async fn get(&self, group: GroupId, user: UserId) -> Result<Option<InviteLink>> {
        let map = self.inner.lock().await;
        Ok(map.get(&link_key(group, user)).cloned().map(InviteLink))
    }

    async fn put(&self, group: GroupId, user: UserId, link: &InviteLink) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.insert(link_key(group, user), link.0.clone());
        Ok(())
    }

    async fn put_if_absent(
        &self,
        group: GroupId,
        user: UserId,
        link: &InviteLink,
    ) -> Result<Option<InviteLink>> {
        let mut map = self.inner.lock().await;
        let key = link_key(group, user);
        if let Some(existing) = map.get(&key) {
            return Ok(Some(InviteLink(existing.clone())));
        }
        map.insert(key, link.0.clone());
        Ok(None)
    }

    async fn delete(&self, group: GroupId, user: UserId) -> Result<()> {
        let mut map = self.inner.lock().await;
        map.remove(&link_key(group, user));
        Ok(())
    }

    async fn list_group(&self, group: GroupId) -> Result<Vec<(UserId, InviteLink)>> {
        let prefix = link_key_prefix(group);
        let map = self.inner.lock().await;
        Ok(map
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .filter_map(|(k, v)| Some((user_from_key(k)?, InviteLink(v.clone()))))
            .collect())
    }
}
