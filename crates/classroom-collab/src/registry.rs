//! C5 Instance Registry — process-wide cache of live `DocumentInstance`s,
//! grounded on `skynet-memory::MemoryManager`'s cache-with-eviction shape:
//! an in-memory map guarded by one lock, a bound on live entries, and a
//! periodic sweep that persists and evicts.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{info, warn};

use classroom_core::collaborators::DocumentRecordStore;
use classroom_core::config::MAX_DOC_INSTANCES;

use crate::error::{CollabError, Result};
use crate::instance::DocumentInstance;
use crate::merge::StepMerger;

pub type InstanceHandle = Arc<Mutex<DocumentInstance>>;

/// Builds the initial document for an instance that has never been saved.
pub type SeedFn = dyn Fn() -> String + Send + Sync;

pub struct InstanceRegistry {
    instances: Mutex<HashMap<String, InstanceHandle>>,
    store: Arc<dyn DocumentRecordStore>,
    seed: Arc<SeedFn>,
    max_instances: usize,
}

impl InstanceRegistry {
    pub fn new(store: Arc<dyn DocumentRecordStore>, seed: Arc<SeedFn>) -> Self {
        Self::with_max_instances(store, seed, MAX_DOC_INSTANCES)
    }

    /// Same as [`Self::new`] with an explicit cap — used by tests that need
    /// to exercise eviction (§8 S6) without instantiating hundreds of docs.
    pub fn with_max_instances(store: Arc<dyn DocumentRecordStore>, seed: Arc<SeedFn>, max_instances: usize) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            store,
            seed,
            max_instances,
        }
    }

    /// Return the live instance for `(namespace_id, lesson_id, component_id)`,
    /// loading it from storage (or seeding a fresh document) on first use,
    /// and evicting the least-recently-active clean instance if the cache
    /// is full (§4.5 C5).
    pub async fn get_instance(
        &self,
        namespace_id: &str,
        lesson_id: &str,
        component_id: &str,
    ) -> Result<InstanceHandle> {
        let id = instance_id(namespace_id, lesson_id, component_id);

        {
            let instances = self.instances.lock().await;
            if let Some(handle) = instances.get(&id) {
                handle.lock().await.touch();
                return Ok(handle.clone());
            }
        }

        let loaded = self.store.load(namespace_id, lesson_id, component_id).await?;

        let instance = match loaded {
            Some(record) => DocumentInstance::from_record(id.clone(), record)?,
            None => DocumentInstance::new(id.clone(), (self.seed)()),
        };

        let mut instances = self.instances.lock().await;
        if let Some(handle) = instances.get(&id) {
            return Ok(handle.clone());
        }

        if instances.len() >= self.max_instances {
            self.evict_one(&mut instances).await;
        }

        let handle = Arc::new(Mutex::new(instance));
        instances.insert(id, handle.clone());
        Ok(handle)
    }

    /// Drop the least-recently-active instance that has no unsaved steps.
    /// If every live instance is currently dirty, the cache is allowed to
    /// grow past `max_instances` rather than discard unsaved work (C5).
    async fn evict_one(&self, instances: &mut HashMap<String, InstanceHandle>) {
        let mut candidate: Option<(String, chrono::DateTime<chrono::Utc>)> = None;
        for (id, handle) in instances.iter() {
            let guard = handle.lock().await;
            if guard.is_dirty() {
                continue;
            }
            if candidate
                .as_ref()
                .map(|(_, last)| guard.last_active_at < *last)
                .unwrap_or(true)
            {
                candidate = Some((id.clone(), guard.last_active_at));
            }
        }

        if let Some((id, _)) = candidate {
            instances.remove(&id);
            info!(instance = %id, "document instance evicted");
        } else {
            warn!(
                count = instances.len(),
                "instance cache full but every entry has unsaved steps; skipping eviction"
            );
        }
    }

    /// Persist and drop `id` regardless of dirty state, bypassing the normal
    /// last-active eviction order — unrelated to the per-member
    /// `remove_from_instances` operation in §4.5, which deactivates a
    /// member across instances (`DocumentInstance::remove_user`).
    pub async fn evict_and_persist(&self, namespace_id: &str, lesson_id: &str, component_id: &str) -> Result<()> {
        let id = instance_id(namespace_id, lesson_id, component_id);
        let handle = {
            let mut instances = self.instances.lock().await;
            instances.remove(&id)
        };
        if let Some(handle) = handle {
            let mut guard = handle.lock().await;
            self.persist(&id, &mut guard).await?;
        }
        Ok(())
    }

    /// Sweep every live instance, persisting any with unsaved steps, then
    /// clearing its dirty flag. Run on a timer by the owning process
    /// (§4.8 periodic save, mirroring the scheduler's tick loop).
    pub async fn save_dirty(&self, merger: &dyn StepMerger) -> Result<usize> {
        let handles: Vec<(String, InstanceHandle)> = {
            let instances = self.instances.lock().await;
            instances
                .iter()
                .map(|(id, handle)| (id.clone(), handle.clone()))
                .collect()
        };

        let mut saved = 0;
        for (id, handle) in handles {
            let mut guard = handle.lock().await;
            if !guard.is_dirty() {
                continue;
            }
            guard.compact_history(merger);
            self.persist(&id, &mut guard).await?;
            saved += 1;
        }
        Ok(saved)
    }

    async fn persist(&self, id: &str, instance: &mut DocumentInstance) -> Result<()> {
        let record = instance.to_record()?;
        self.store
            .save(id, &record)
            .await
            .map_err(|e| CollabError::Database(rusqlite::Error::InvalidParameterName(e.to_string())))?;
        instance.mark_persisted();
        Ok(())
    }

    pub async fn instance_count(&self) -> usize {
        self.instances.lock().await.len()
    }
}

fn instance_id(namespace_id: &str, lesson_id: &str, component_id: &str) -> String {
    format!("{namespace_id}/{lesson_id}/{component_id}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use classroom_core::collaborators::DocumentRecord;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct InMemoryStore {
        saved: StdMutex<HashMap<String, DocumentRecord>>,
    }

    #[async_trait]
    impl DocumentRecordStore for InMemoryStore {
        async fn load(
            &self,
            _namespace_id: &str,
            _lesson_id: &str,
            _component_id: &str,
        ) -> classroom_core::Result<Option<DocumentRecord>> {
            Ok(None)
        }

        async fn save(&self, id: &str, payload: &DocumentRecord) -> classroom_core::Result<()> {
            self.saved
                .lock()
                .unwrap()
                .insert(id.to_string(), payload.clone());
            Ok(())
        }
    }

    fn seed() -> Arc<SeedFn> {
        Arc::new(|| "seed".to_string())
    }

    #[tokio::test]
    async fn get_instance_creates_then_reuses_same_handle() {
        let registry = InstanceRegistry::new(Arc::new(InMemoryStore::default()), seed());
        let a = registry.get_instance("ns", "lesson", "doc").await.unwrap();
        let b = registry.get_instance("ns", "lesson", "doc").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.instance_count().await, 1);
    }

    /// S6: with `max_instances=3`, loading A,B,C,D evicts A (oldest, clean).
    /// Dirtying C then loading E evicts B, not C, since C has a pending save.
    #[tokio::test]
    async fn s6_eviction_skips_instances_with_pending_saves() {
        let store = Arc::new(InMemoryStore::default());
        let registry = InstanceRegistry::with_max_instances(store, seed(), 3);

        async fn load_and_wait(registry: &InstanceRegistry, name: &str) -> InstanceHandle {
            let handle = registry.get_instance("ns", "lesson", name).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            handle
        }

        let _a = load_and_wait(&registry, "a").await;
        let b = load_and_wait(&registry, "b").await;
        let c = load_and_wait(&registry, "c").await;
        let _d = load_and_wait(&registry, "d").await;

        // A was evicted (oldest, clean); the cache stays at the cap.
        assert_eq!(registry.instance_count().await, 3);

        // Dirty c, then load e: b (oldest clean) must be evicted, not c.
        {
            let mut op = operational_transform::OperationSeq::default();
            op.retain(4);
            op.insert("!");
            c.lock().await.add_step("alice", 0, op).unwrap();
        }
        let _e = load_and_wait(&registry, "e").await;

        let b2 = registry.get_instance("ns", "lesson", "b").await.unwrap();
        assert!(
            !Arc::ptr_eq(&b, &b2),
            "b should have been evicted and reloaded as a fresh instance"
        );
    }

    #[tokio::test]
    async fn evict_and_persist_persists_dirty_work() {
        let store = Arc::new(InMemoryStore::default());
        let registry = InstanceRegistry::new(store.clone(), seed());
        let handle = registry.get_instance("ns", "lesson", "doc").await.unwrap();
        {
            let mut op = operational_transform::OperationSeq::default();
            op.retain(4);
            op.insert("!");
            handle.lock().await.add_step("alice", 0, op).unwrap();
        }
        registry
            .evict_and_persist("ns", "lesson", "doc")
            .await
            .unwrap();
        assert_eq!(registry.instance_count().await, 0);
        assert!(store.saved.lock().unwrap().contains_key("ns/lesson/doc"));
    }
}
