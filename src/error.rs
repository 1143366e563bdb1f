use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShopError>;

#[derive(Debug, Error)]
pub enum ShopError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Time conflict for {mechanic} between {start} and {end} (overlaps appointment {conflicting_id})")]
    TimeConflict {
        mechanic: String,
        start: String,
        end: String,
        conflicting_id: String,
    },

    #[error("Invalid time range: end {end} must be after start {start}")]
    InvalidTimeRange { start: String, end: String },

    #[error("Incomplete appointment: missing {0}")]
    IncompleteAppointment(String),

    #[error("Cannot remove the last remaining column")]
    LastColumn,

    #[error("Column {column} still has {count} dependent item(s); provide a fallback column")]
    HasDependents { column: String, count: usize },

    #[error("Invalid fallback column: {0}")]
    InvalidFallback(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Other(String),
}

impl ShopError {
    pub fn not_found(kind: impl Into<String>, id: impl ToString) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.to_string(),
        }
    }

    /// True for scheduling rejections the UI should explain rather than retry
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::TimeConflict { .. })
    }

    /// True when the caller can correct its input and try again.
    /// I/O, storage and serialization failures are hard failures.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::InvalidFormat(_)
                | Self::TimeConflict { .. }
                | Self::InvalidTimeRange { .. }
                | Self::IncompleteAppointment(_)
                | Self::LastColumn
                | Self::HasDependents { .. }
                | Self::InvalidFallback(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_is_distinct_from_hard_failures() {
        let conflict = ShopError::TimeConflict {
            mechanic: "Ana".to_string(),
            start: "14:30".to_string(),
            end: "15:30".to_string(),
            conflicting_id: "a1".to_string(),
        };
        assert!(conflict.is_conflict());
        assert!(conflict.is_recoverable());

        let io = ShopError::IoError(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert!(!io.is_conflict());
        assert!(!io.is_recoverable());

        assert!(!ShopError::StorageError("down".to_string()).is_recoverable());
    }

    #[test]
    fn test_not_found_message() {
        let err = ShopError::not_found("appointment", "abc");
        assert_eq!(err.to_string(), "appointment not found: abc");
    }
}
