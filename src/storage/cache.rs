//! Process-wide cache of resolved work item types.
//!
//! The cache is an explicit object shared through `Arc`; nothing reaches it
//! through global state. Reads take a shared lock, writes an exclusive one.

use crate::model::WorkItemType;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct TypeCache {
    types: RwLock<HashMap<Uuid, Arc<WorkItemType>>>,
}

impl TypeCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<Arc<WorkItemType>> {
        let found = self.types.read().get(id).cloned();
        trace!(%id, hit = found.is_some(), "Type cache lookup");
        found
    }

    /// Insert or replace, returning the shared handle.
    pub fn put(&self, work_item_type: WorkItemType) -> Arc<WorkItemType> {
        let shared = Arc::new(work_item_type);
        self.types.write().insert(shared.id, Arc::clone(&shared));
        shared
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<WorkItemType>> {
        self.types.write().remove(id)
    }

    pub fn clear(&self) {
        self.types.write().clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_get_remove() {
        let cache = TypeCache::new();
        let wit = WorkItemType::new("bug");
        let id = wit.id;
        cache.put(wit);
        assert_eq!(cache.get(&id).unwrap().name, "bug");
        assert!(cache.remove(&id).is_some());
        assert!(cache.get(&id).is_none());
    }

    #[test]
    fn put_replaces_existing_entry() {
        let cache = TypeCache::new();
        let mut wit = WorkItemType::new("bug");
        cache.put(wit.clone());
        wit.version = 2;
        cache.put(wit.clone());
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&wit.id).unwrap().version, 2);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let cache = Arc::new(TypeCache::new());
        let ids: Vec<Uuid> = (0..8)
            .map(|i| cache.put(WorkItemType::new(format!("type-{i}"))).id)
            .collect();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let cache = Arc::clone(&cache);
                let ids = ids.clone();
                scope.spawn(move || {
                    for id in &ids {
                        assert!(cache.get(id).is_some());
                    }
                });
            }
            let writer = Arc::clone(&cache);
            scope.spawn(move || {
                for i in 0..8 {
                    writer.put(WorkItemType::new(format!("extra-{i}")));
                }
            });
        });

        assert_eq!(cache.len(), 16);
        cache.clear();
        assert!(cache.is_empty());
    }
}
