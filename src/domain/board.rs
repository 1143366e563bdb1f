use crate::{
    domain::entity::{Entity, EntityKind},
    error::{Result, ShopError},
    events::{EntityChange, StoreEvent},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A kanban stage. `ordinal` defines display order and is kept dense
/// (0..N-1) by the functions in this module.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardColumn {
    pub id: Uuid,
    pub title: String,
    pub color: String,
    pub ordinal: u32,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewColumn {
    pub title: String,
    pub color: String,
    pub ordinal: u32,
}

/// Title/color edit. Ordinals are only changed through reorder and removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnPatch {
    pub title: Option<String>,
    pub color: Option<String>,
}

impl ColumnPatch {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            color: None,
        }
    }
}

impl Entity for BoardColumn {
    type Draft = NewColumn;
    type Patch = ColumnPatch;

    const KIND: EntityKind = EntityKind::BoardColumn;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    fn from_draft(id: Uuid, created_at: DateTime<Utc>, draft: NewColumn) -> Self {
        Self {
            id,
            title: draft.title,
            color: draft.color,
            ordinal: draft.ordinal,
            created_at,
            updated_at: None,
        }
    }

    fn apply_patch(&mut self, patch: ColumnPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(color) = patch.color {
            self.color = color;
        }
        self.updated_at = Some(now);
    }

    fn into_event(change: EntityChange<Self>) -> StoreEvent {
        StoreEvent::BoardColumn(change)
    }

    fn from_event(event: &StoreEvent) -> Option<&EntityChange<Self>> {
        match event {
            StoreEvent::BoardColumn(change) => Some(change),
            _ => None,
        }
    }
}

/// Columns seeded into an empty board
pub fn default_columns() -> Vec<(&'static str, &'static str)> {
    vec![
        ("New", "#64748b"),
        ("Contacted", "#3b82f6"),
        ("Quoted", "#f59e0b"),
        ("Won", "#22c55e"),
        ("Lost", "#ef4444"),
    ]
}

/// Sorts by ordinal; ties fall back to creation time then id
pub fn sort_by_ordinal(columns: &mut [BoardColumn]) {
    columns.sort_by(|a, b| {
        a.ordinal
            .cmp(&b.ordinal)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Rewrites ordinals to 0..N-1 keeping relative order. Only columns whose
/// ordinal actually moves get a new `updated_at`.
pub fn normalize_ordinals(columns: &mut [BoardColumn], now: DateTime<Utc>) {
    sort_by_ordinal(columns);
    for (index, column) in columns.iter_mut().enumerate() {
        let ordinal = index as u32;
        if column.ordinal != ordinal {
            column.ordinal = ordinal;
            column.updated_at = Some(now);
        }
    }
}

pub fn next_ordinal(columns: &[BoardColumn]) -> u32 {
    columns.len() as u32
}

/// Swaps the ordinals of two columns. This is a two-element swap, not an
/// insert-and-shift: columns between the two keep their positions.
pub fn swap_ordinals(
    columns: &mut [BoardColumn],
    source_id: Uuid,
    target_id: Uuid,
    now: DateTime<Utc>,
) -> Result<()> {
    let source = columns
        .iter()
        .position(|c| c.id == source_id)
        .ok_or_else(|| ShopError::not_found(EntityKind::BoardColumn.to_string(), source_id))?;
    let target = columns
        .iter()
        .position(|c| c.id == target_id)
        .ok_or_else(|| ShopError::not_found(EntityKind::BoardColumn.to_string(), target_id))?;

    if source == target {
        return Ok(());
    }

    let source_ordinal = columns[source].ordinal;
    columns[source].ordinal = columns[target].ordinal;
    columns[target].ordinal = source_ordinal;
    columns[source].updated_at = Some(now);
    columns[target].updated_at = Some(now);
    Ok(())
}

/// Removes a column and re-normalizes the rest.
///
/// Returns `Ok(false)` when the id is unknown and `LastColumn` when it is the
/// only column left.
pub fn remove_and_normalize(
    columns: &mut Vec<BoardColumn>,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<bool> {
    let Some(index) = columns.iter().position(|c| c.id == id) else {
        return Ok(false);
    };
    if columns.len() == 1 {
        return Err(ShopError::LastColumn);
    }
    columns.remove(index);
    normalize_ordinals(columns, now);
    Ok(true)
}

/// True when ordinals are exactly 0..N-1 with no gaps or duplicates
pub fn ordinals_are_dense(columns: &[BoardColumn]) -> bool {
    let mut ordinals: Vec<u32> = columns.iter().map(|c| c.ordinal).collect();
    ordinals.sort_unstable();
    ordinals
        .iter()
        .enumerate()
        .all(|(index, ordinal)| *ordinal == index as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn column(title: &str, ordinal: u32) -> BoardColumn {
        BoardColumn::from_draft(
            Uuid::new_v4(),
            Utc::now(),
            NewColumn {
                title: title.to_string(),
                color: "#000000".to_string(),
                ordinal,
            },
        )
    }

    fn titles(columns: &[BoardColumn]) -> Vec<String> {
        let mut sorted = columns.to_vec();
        sort_by_ordinal(&mut sorted);
        sorted.into_iter().map(|c| c.title).collect()
    }

    #[test]
    fn test_remove_middle_column_renormalizes() {
        let mut columns = vec![column("A", 0), column("B", 1), column("C", 2)];
        let middle = columns[1].id;

        assert!(remove_and_normalize(&mut columns, middle, Utc::now()).unwrap());

        assert_eq!(columns.len(), 2);
        assert_eq!(titles(&columns), vec!["A", "C"]);
        let ordinals: Vec<u32> = columns.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1]);
    }

    #[test]
    fn test_remove_last_remaining_column_fails() {
        let mut columns = vec![column("Only", 0)];
        let id = columns[0].id;

        assert!(matches!(
            remove_and_normalize(&mut columns, id, Utc::now()),
            Err(ShopError::LastColumn)
        ));
        assert_eq!(columns.len(), 1);
    }

    #[test]
    fn test_remove_unknown_column_is_noop() {
        let mut columns = vec![column("A", 0), column("B", 1)];
        assert!(!remove_and_normalize(&mut columns, Uuid::new_v4(), Utc::now()).unwrap());
        assert_eq!(columns.len(), 2);
    }

    #[test]
    fn test_swap_is_not_a_shift() {
        let mut columns = vec![
            column("A", 0),
            column("B", 1),
            column("C", 2),
            column("D", 3),
        ];
        let a = columns[0].id;
        let d = columns[3].id;

        swap_ordinals(&mut columns, a, d, Utc::now()).unwrap();

        // An insert-and-shift would give B, C, D, A
        assert_eq!(titles(&columns), vec!["D", "B", "C", "A"]);
        assert!(ordinals_are_dense(&columns));
    }

    #[test]
    fn test_swap_unknown_column_fails() {
        let mut columns = vec![column("A", 0)];
        let a = columns[0].id;
        assert!(matches!(
            swap_ordinals(&mut columns, a, Uuid::new_v4(), Utc::now()),
            Err(ShopError::NotFound { .. })
        ));
    }

    #[test]
    fn test_normalize_closes_gaps_and_stamps_moved_only() {
        let mut columns = vec![column("A", 0), column("B", 5), column("C", 9)];
        let now = Utc::now();

        normalize_ordinals(&mut columns, now);

        assert_eq!(titles(&columns), vec!["A", "B", "C"]);
        assert!(ordinals_are_dense(&columns));
        assert!(columns[0].updated_at.is_none());
        assert_eq!(columns[1].updated_at, Some(now));
    }

    #[test]
    fn test_dense_check() {
        assert!(ordinals_are_dense(&[]));
        assert!(ordinals_are_dense(&[column("A", 1), column("B", 0)]));
        assert!(!ordinals_are_dense(&[column("A", 0), column("B", 2)]));
        assert!(!ordinals_are_dense(&[column("A", 0), column("B", 0)]));
    }

    proptest! {
        #[test]
        fn prop_ordinals_stay_dense(ops in proptest::collection::vec((any::<bool>(), 0usize..8), 1..40)) {
            let mut columns = vec![column("seed", 0)];
            let now = Utc::now();
            for (is_add, pick) in ops {
                if is_add {
                    let ordinal = next_ordinal(&columns);
                    columns.push(column("x", ordinal));
                } else {
                    let id = columns[pick % columns.len()].id;
                    let result = remove_and_normalize(&mut columns, id, now);
                    if columns.len() == 1 && result.is_err() {
                        prop_assert!(matches!(result, Err(ShopError::LastColumn)));
                    }
                }
                prop_assert!(ordinals_are_dense(&columns));
                prop_assert!(!columns.is_empty());
            }
        }
    }
}
