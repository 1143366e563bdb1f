//! Durable CRUD for one entity kind, with change propagation.
//!
//! An [`EntityStore`] keeps the whole set of one kind under a single key of a
//! [`DurableMedium`]. Every mutation is written to the medium first; only
//! after the write succeeds is the in-memory cache replaced and the change
//! published on the [`EventBus`]. A failed write leaves both the cache and the
//! medium as they were and returns the error.

pub mod dependents;

pub use dependents::{ColumnDependents, Removal};

use crate::{
    domain::Entity,
    error::{Result, ShopError},
    events::{EntityChange, EventBus},
    storage::DurableMedium,
};
use chrono::{DateTime, Utc};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};
use uuid::Uuid;

pub struct EntityStore<T: Entity> {
    key: String,
    medium: Arc<dyn DurableMedium>,
    bus: EventBus,
    cache: Mutex<Option<Vec<T>>>,
    /// Serializes mutations (and cache fills) across await points
    write_lock: tokio::sync::Mutex<()>,
}

impl<T: Entity> EntityStore<T> {
    pub fn new(key: impl Into<String>, medium: Arc<dyn DurableMedium>, bus: EventBus) -> Self {
        Self {
            key: key.into(),
            medium,
            bus,
            cache: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Copy of the cached set, without touching the medium. `None` when the
    /// cache is cold. Lets synchronous subscribers re-read after a change.
    pub fn cached(&self) -> Option<Vec<T>> {
        self.cache_guard().clone()
    }

    /// Drops the cache so the next read goes to the medium
    pub fn invalidate(&self) {
        self.set_cache(None);
    }

    pub async fn get_all(&self) -> Result<Vec<T>> {
        if let Some(items) = self.cached() {
            return Ok(items);
        }
        let _guard = self.write_lock.lock().await;
        self.snapshot().await
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<T>> {
        Ok(self.get_all().await?.into_iter().find(|item| item.id() == id))
    }

    pub async fn query<P>(&self, predicate: P) -> Result<Vec<T>>
    where
        P: Fn(&T) -> bool,
    {
        let items = self.get_all().await?;
        Ok(items.into_iter().filter(|item| predicate(item)).collect())
    }

    pub async fn count(&self) -> Result<usize> {
        Ok(self.get_all().await?.len())
    }

    /// Assigns an id and creation time, persists and publishes `created`
    pub async fn add(&self, draft: T::Draft) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.snapshot().await?;

        let entity = T::from_draft(Uuid::new_v4(), Utc::now(), draft);
        items.push(entity.clone());
        self.persist(items).await?;

        tracing::debug!(kind = %T::KIND, id = %entity.id(), "entity created");
        self.bus
            .emit(T::into_event(EntityChange::Created(entity.clone())));
        Ok(entity)
    }

    /// Merges `patch` into the entity, stamps `updated_at`, persists and
    /// publishes `updated`
    pub async fn update(&self, id: Uuid, patch: T::Patch) -> Result<T> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.snapshot().await?;

        let entity = items
            .iter_mut()
            .find(|item| item.id() == id)
            .ok_or_else(|| ShopError::not_found(T::KIND.to_string(), id))?;
        entity.apply_patch(patch, Utc::now());
        let updated = entity.clone();
        self.persist(items).await?;

        tracing::debug!(kind = %T::KIND, %id, "entity updated");
        self.bus
            .emit(T::into_event(EntityChange::Updated(updated.clone())));
        Ok(updated)
    }

    /// Hard delete. Returns `false` when the id is unknown.
    pub async fn remove(&self, id: Uuid) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut items = self.snapshot().await?;

        let Some(index) = items.iter().position(|item| item.id() == id) else {
            return Ok(false);
        };
        let removed = items.remove(index);
        self.persist(items).await?;

        tracing::debug!(kind = %T::KIND, %id, "entity deleted");
        self.bus.emit(T::into_event(EntityChange::Deleted(removed)));
        Ok(true)
    }

    /// Runs `f` over the full set and persists the result in one write.
    ///
    /// Publishes `created`, `updated` or `deleted` for each record that
    /// differs from the set before the call. Nothing is written when `f`
    /// fails or changes nothing.
    pub async fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>, DateTime<Utc>) -> Result<R> + Send,
        R: Send,
    {
        self.lock_writes().await.modify(f).await
    }

    /// Takes the store's write lock until the guard is dropped. Other
    /// mutations of this store wait; reads served from the cache do not.
    pub async fn lock_writes(&self) -> WriteGuard<'_, T> {
        WriteGuard {
            store: self,
            _lock: self.write_lock.lock().await,
        }
    }

    /// Body of `modify`. Callers hold `write_lock`.
    async fn apply<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>, DateTime<Utc>) -> Result<R> + Send,
        R: Send,
    {
        let before = self.snapshot().await?;

        let mut after = before.clone();
        let result = f(&mut after, Utc::now())?;
        ensure_unique_ids(&after)?;

        let changes = diff(&before, &after);
        if changes.is_empty() {
            return Ok(result);
        }
        self.persist(after).await?;

        tracing::debug!(kind = %T::KIND, changes = changes.len(), "bulk modification");
        for change in changes {
            self.bus.emit(T::into_event(change));
        }
        Ok(result)
    }

    /// Serialized full set (pretty JSON array)
    pub async fn export(&self) -> Result<String> {
        let items = self.get_all().await?;
        Ok(serde_json::to_string_pretty(&items)?)
    }

    /// Replaces the full set with `blob`. Rejects anything that is not an
    /// array of valid records without touching the stored set.
    pub async fn import(&self, blob: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(blob)
            .map_err(|e| ShopError::InvalidFormat(format!("not valid JSON: {}", e)))?;
        if !value.is_array() {
            return Err(ShopError::InvalidFormat(
                "expected an array of records".to_string(),
            ));
        }
        let items: Vec<T> = serde_json::from_value(value)
            .map_err(|e| ShopError::InvalidFormat(format!("invalid {} record: {}", T::KIND, e)))?;
        ensure_unique_ids(&items)?;
        let count = items.len();

        let _guard = self.write_lock.lock().await;
        let blob = serde_json::to_string(&items)?;
        self.medium.write(&self.key, &blob).await?;
        self.set_cache(None);

        tracing::debug!(kind = %T::KIND, count, "imported");
        self.bus
            .emit(T::into_event(EntityChange::Imported { count }));
        Ok(count)
    }

    /// Deletes the durable key and publishes `cleared`
    pub async fn clear(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.medium.delete(&self.key).await?;
        self.set_cache(None);

        tracing::debug!(kind = %T::KIND, "cleared");
        self.bus.emit(T::into_event(EntityChange::Cleared));
        Ok(())
    }

    /// Current set; fills the cache from the medium on a miss.
    /// Callers hold `write_lock`.
    async fn snapshot(&self) -> Result<Vec<T>> {
        if let Some(items) = self.cached() {
            return Ok(items);
        }
        let items = self.load().await?;
        self.set_cache(Some(items.clone()));
        Ok(items)
    }

    async fn load(&self) -> Result<Vec<T>> {
        match self.medium.read(&self.key).await? {
            None => Ok(Vec::new()),
            Some(blob) => serde_json::from_str(&blob).map_err(|e| {
                ShopError::InvalidFormat(format!("stored {} set is corrupt: {}", T::KIND, e))
            }),
        }
    }

    async fn persist(&self, items: Vec<T>) -> Result<()> {
        let blob = serde_json::to_string(&items)?;
        self.medium.write(&self.key, &blob).await?;
        self.set_cache(Some(items));
        Ok(())
    }

    fn cache_guard(&self) -> MutexGuard<'_, Option<Vec<T>>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_cache(&self, items: Option<Vec<T>>) {
        *self.cache_guard() = items;
    }
}

/// Exclusive write access to one [`EntityStore`], held across several
/// steps so that a read and the write depending on it cannot interleave with
/// another writer.
pub struct WriteGuard<'a, T: Entity> {
    store: &'a EntityStore<T>,
    _lock: tokio::sync::MutexGuard<'a, ()>,
}

impl<'a, T: Entity> WriteGuard<'a, T> {
    /// Current set, as seen by the lock holder
    pub async fn items(&self) -> Result<Vec<T>> {
        self.store.snapshot().await
    }

    /// Same as [`EntityStore::modify`], without re-taking the lock
    pub async fn modify<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<T>, DateTime<Utc>) -> Result<R> + Send,
        R: Send,
    {
        self.store.apply(f).await
    }
}

fn ensure_unique_ids<T: Entity>(items: &[T]) -> Result<()> {
    let mut seen = HashSet::with_capacity(items.len());
    for item in items {
        if !seen.insert(item.id()) {
            return Err(ShopError::InvalidFormat(format!(
                "duplicate {} id {}",
                T::KIND,
                item.id()
            )));
        }
    }
    Ok(())
}

/// Per-record changes from `before` to `after`: creations and updates in
/// `after` order, then deletions in `before` order
fn diff<T: Entity>(before: &[T], after: &[T]) -> Vec<EntityChange<T>> {
    let previous: HashMap<Uuid, &T> = before.iter().map(|item| (item.id(), item)).collect();
    let remaining: HashSet<Uuid> = after.iter().map(Entity::id).collect();

    let mut changes = Vec::new();
    for item in after {
        match previous.get(&item.id()) {
            None => changes.push(EntityChange::Created(item.clone())),
            Some(old) if *old != item => changes.push(EntityChange::Updated(item.clone())),
            Some(_) => {}
        }
    }
    for item in before {
        if !remaining.contains(&item.id()) {
            changes.push(EntityChange::Deleted(item.clone()));
        }
    }
    changes
}
