//! Ordered workflow stages (kanban columns) and the safe removal lifecycle.

use crate::{
    domain::{
        board::{
            default_columns, next_ordinal, normalize_ordinals, remove_and_normalize,
            sort_by_ordinal, swap_ordinals,
        },
        BoardColumn, ColumnPatch, Entity, NewColumn,
    },
    error::{Result, ShopError},
    store::{ColumnDependents, EntityStore, Removal},
};
use std::sync::Arc;
use uuid::Uuid;

/// Board columns backed by an entity store.
///
/// Ordinals stay dense (0..N-1) after every mutation. Items that live in a
/// column are reached only through the registered [`ColumnDependents`].
pub struct StageBoard {
    columns: Arc<EntityStore<BoardColumn>>,
    dependents: Vec<Arc<dyn ColumnDependents>>,
}

impl StageBoard {
    pub fn new(columns: Arc<EntityStore<BoardColumn>>) -> Self {
        Self {
            columns,
            dependents: Vec::new(),
        }
    }

    /// Registers a kind whose items must be migrated before a column goes
    pub fn with_dependents(mut self, dependents: Arc<dyn ColumnDependents>) -> Self {
        self.dependents.push(dependents);
        self
    }

    pub fn store(&self) -> &Arc<EntityStore<BoardColumn>> {
        &self.columns
    }

    /// Seeds the default columns when the board is empty
    pub async fn initialize(&self) -> Result<Vec<BoardColumn>> {
        let seeded = self
            .columns
            .modify(|columns, now| {
                if !columns.is_empty() {
                    return Ok(false);
                }
                for (title, color) in default_columns() {
                    let ordinal = next_ordinal(columns);
                    columns.push(BoardColumn::from_draft(
                        Uuid::new_v4(),
                        now,
                        NewColumn {
                            title: title.to_string(),
                            color: color.to_string(),
                            ordinal,
                        },
                    ));
                }
                Ok(true)
            })
            .await?;

        if seeded {
            tracing::info!("seeded default board columns");
        }
        self.columns().await
    }

    /// Columns in display order
    pub async fn columns(&self) -> Result<Vec<BoardColumn>> {
        let mut columns = self.columns.get_all().await?;
        sort_by_ordinal(&mut columns);
        Ok(columns)
    }

    /// Appends a column at the end of the board
    pub async fn add_column(&self, title: impl Into<String>, color: impl Into<String>) -> Result<BoardColumn> {
        let title = title.into();
        let color = color.into();
        self.columns
            .modify(move |columns, now| {
                normalize_ordinals(columns, now);
                let column = BoardColumn::from_draft(
                    Uuid::new_v4(),
                    now,
                    NewColumn {
                        title,
                        color,
                        ordinal: next_ordinal(columns),
                    },
                );
                columns.push(column.clone());
                Ok(column)
            })
            .await
    }

    pub async fn update_column(&self, id: Uuid, patch: ColumnPatch) -> Result<BoardColumn> {
        self.columns.update(id, patch).await
    }

    /// Removes a column.
    ///
    /// Returns `Ok(false)` for an unknown id and `LastColumn` for the only
    /// remaining column. When items still sit in the column, `fallback_id`
    /// is required (`HasDependents` otherwise) and those items are moved
    /// there before the column is deleted.
    ///
    /// The column store and every dependent store stay write-locked from the
    /// checks to the deletion, so no item can be added to the column in
    /// between. Locks are taken in a fixed order: columns, then dependents in
    /// registration order.
    pub async fn remove_column(&self, id: Uuid, fallback_id: Option<Uuid>) -> Result<bool> {
        let guard = self.columns.lock_writes().await;
        let current = guard.items().await?;
        if !current.iter().any(|column| column.id == id) {
            return Ok(false);
        }
        if current.len() == 1 {
            return Err(ShopError::LastColumn);
        }
        if let Some(fallback) = fallback_id {
            if fallback == id {
                return Err(ShopError::InvalidFallback(
                    "fallback must differ from the removed column".to_string(),
                ));
            }
            if !current.iter().any(|column| column.id == fallback) {
                return Err(ShopError::InvalidFallback(format!(
                    "column {} does not exist",
                    fallback
                )));
            }
        }

        let guard = &guard;
        let mut removal: Removal<'_> = Box::pin(async move {
            guard
                .modify(move |columns, now| remove_and_normalize(columns, id, now))
                .await
        });
        for dependents in self.dependents.iter().rev() {
            removal = dependents.evacuate(id, fallback_id, removal);
        }
        removal.await
    }

    /// Swaps the positions of two columns
    pub async fn reorder(&self, source_id: Uuid, target_id: Uuid) -> Result<()> {
        self.columns
            .modify(move |columns, now| swap_ordinals(columns, source_id, target_id, now))
            .await
    }
}
