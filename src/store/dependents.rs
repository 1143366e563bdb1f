use crate::{
    domain::{EntityKind, Staged},
    error::{Result, ShopError},
    store::EntityStore,
};
use async_trait::async_trait;
use std::{future::Future, pin::Pin};
use uuid::Uuid;

/// Deferred column deletion handed down through [`ColumnDependents::evacuate`]
pub type Removal<'a> = Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>>;

/// Items that reference a board column. The board checks these before a
/// column is removed, without knowing the concrete entity kinds.
#[async_trait]
pub trait ColumnDependents: Send + Sync {
    fn dependent_kind(&self) -> EntityKind;

    async fn count_in_column(&self, column_id: Uuid) -> Result<usize>;

    /// Moves every item in `from` to `to`; returns how many moved
    async fn reassign_column(&self, from: Uuid, to: Uuid) -> Result<usize>;

    /// Moves every item out of `from` and then runs `removal`, holding this
    /// kind's write lock throughout, so no item can land in `from` between
    /// the move and the deletion.
    ///
    /// Fails with `HasDependents` when items sit in `from` and there is no
    /// `fallback`; `removal` is not run in that case.
    async fn evacuate<'a>(
        &'a self,
        from: Uuid,
        fallback: Option<Uuid>,
        removal: Removal<'a>,
    ) -> Result<bool>;
}

#[async_trait]
impl<T: Staged> ColumnDependents for EntityStore<T> {
    fn dependent_kind(&self) -> EntityKind {
        T::KIND
    }

    async fn count_in_column(&self, column_id: Uuid) -> Result<usize> {
        let items = self.get_all().await?;
        Ok(count_in(&items, column_id))
    }

    async fn reassign_column(&self, from: Uuid, to: Uuid) -> Result<usize> {
        let moved = self.modify(move |items, now| Ok(move_items(items, from, to, now))).await?;

        tracing::debug!(kind = %T::KIND, %from, %to, moved, "reassigned column dependents");
        Ok(moved)
    }

    async fn evacuate<'a>(
        &'a self,
        from: Uuid,
        fallback: Option<Uuid>,
        removal: Removal<'a>,
    ) -> Result<bool> {
        let guard = self.lock_writes().await;

        let count = count_in(&guard.items().await?, from);
        if count > 0 {
            let to = fallback.ok_or_else(|| ShopError::HasDependents {
                column: from.to_string(),
                count,
            })?;
            let moved = guard
                .modify(move |items, now| Ok(move_items(items, from, to, now)))
                .await?;
            tracing::info!(kind = %T::KIND, moved, %from, %to, "migrated column dependents");
        }

        removal.await
    }
}

fn count_in<T: Staged>(items: &[T], column_id: Uuid) -> usize {
    items
        .iter()
        .filter(|item| item.column_id() == Some(column_id))
        .count()
}

fn move_items<T: Staged>(
    items: &mut [T],
    from: Uuid,
    to: Uuid,
    now: chrono::DateTime<chrono::Utc>,
) -> usize {
    let mut moved = 0;
    for item in items.iter_mut().filter(|item| item.column_id() == Some(from)) {
        item.set_column_id(to, now);
        moved += 1;
    }
    moved
}
