//! Runtime configuration: storage namespace, data directory and the shop's
//! business hours used for slot generation.

use crate::{
    domain::EntityKind,
    error::{Result, ShopError},
};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Opening hours and slot granularity.
///
/// The reference configuration used by the dashboard is 08:00-18:00 with
/// 30 minute slots, which is what `Default` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessHours {
    pub start_hour: u32,
    pub end_hour: u32,
    pub interval_minutes: u32,
    /// Offset of the shop's wall clock from UTC, in minutes
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            start_hour: 8,
            end_hour: 18,
            interval_minutes: 30,
            utc_offset_minutes: 0,
        }
    }
}

impl BusinessHours {
    pub fn new(start_hour: u32, end_hour: u32, interval_minutes: u32) -> Self {
        Self {
            start_hour,
            end_hour,
            interval_minutes,
            utc_offset_minutes: 0,
        }
    }

    pub fn with_utc_offset(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.end_hour > 24 {
            return Err(ShopError::ConfigError(format!(
                "end_hour must be at most 24, got {}",
                self.end_hour
            )));
        }
        if self.start_hour >= self.end_hour {
            return Err(ShopError::ConfigError(format!(
                "start_hour ({}) must be before end_hour ({})",
                self.start_hour, self.end_hour
            )));
        }
        if self.interval_minutes == 0 {
            return Err(ShopError::ConfigError(
                "interval_minutes must be greater than zero".to_string(),
            ));
        }
        let open_minutes = (self.end_hour - self.start_hour) * 60;
        if self.interval_minutes > open_minutes {
            return Err(ShopError::ConfigError(format!(
                "interval_minutes ({}) exceeds the {} minutes the shop is open",
                self.interval_minutes, open_minutes
            )));
        }
        self.offset()?;
        Ok(())
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                ShopError::ConfigError(format!(
                    "utc_offset_minutes out of range: {}",
                    self.utc_offset_minutes
                ))
            })
    }

    /// Converts a wall-clock time on `day` into an instant.
    pub fn instant_at(&self, day: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>> {
        let offset = self.offset()?;
        offset
            .from_local_datetime(&day.and_time(time))
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ShopError::Other(format!("Ambiguous local time {} {}", day, time)))
    }

    /// Calendar date of an instant on the shop's wall clock.
    pub fn local_date(&self, instant: DateTime<Utc>) -> Result<NaiveDate> {
        Ok(instant.with_timezone(&self.offset()?).date_naive())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopConfig {
    /// Prefix for durable keys, e.g. "shopfloor" gives "shopfloor_appointments"
    pub namespace: String,
    /// Root directory for file-backed media
    pub data_dir: PathBuf,
    #[serde(default)]
    pub business_hours: BusinessHours,
}

impl Default for ShopConfig {
    /// Defaults with env var overrides for container deployment
    fn default() -> Self {
        Self {
            namespace: std::env::var("SHOPFLOOR_NAMESPACE")
                .unwrap_or_else(|_| "shopfloor".to_string()),
            data_dir: std::env::var("SHOPFLOOR_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            business_hours: BusinessHours::default(),
        }
    }
}

impl ShopConfig {
    /// Loads a JSON config file and validates it
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: ShopConfig = serde_json::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.namespace.trim().is_empty() {
            return Err(ShopError::ConfigError(
                "namespace must not be empty".to_string(),
            ));
        }
        self.business_hours.validate()
    }

    /// Durable key for an entity kind
    pub fn storage_key(&self, kind: EntityKind) -> String {
        format!("{}_{}", self.namespace, kind.storage_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_business_hours() {
        let hours = BusinessHours::default();
        assert_eq!(hours.start_hour, 8);
        assert_eq!(hours.end_hour, 18);
        assert_eq!(hours.interval_minutes, 30);
        assert!(hours.validate().is_ok());
    }

    #[test]
    fn test_invalid_business_hours() {
        assert!(BusinessHours::new(18, 8, 30).validate().is_err());
        assert!(BusinessHours::new(8, 8, 30).validate().is_err());
        assert!(BusinessHours::new(8, 25, 30).validate().is_err());
        assert!(BusinessHours::new(8, 18, 0).validate().is_err());
    }

    #[test]
    fn test_interval_longer_than_the_day_is_rejected() {
        assert!(BusinessHours::new(8, 18, 600).validate().is_ok());
        assert!(matches!(
            BusinessHours::new(8, 18, 601).validate(),
            Err(ShopError::ConfigError(_))
        ));
        assert!(matches!(
            BusinessHours::new(8, 18, u32::MAX).validate(),
            Err(ShopError::ConfigError(_))
        ));
    }

    #[test]
    fn test_out_of_range_offset_is_rejected() {
        for minutes in [i32::MAX / 10, i32::MIN, 24 * 60, -24 * 60] {
            assert!(matches!(
                BusinessHours::default().with_utc_offset(minutes).validate(),
                Err(ShopError::ConfigError(_))
            ));
        }
        assert!(BusinessHours::default().with_utc_offset(14 * 60).validate().is_ok());
    }

    #[test]
    fn test_instant_respects_offset() {
        let hours = BusinessHours::default().with_utc_offset(-180);
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();

        let instant = hours.instant_at(day, nine).unwrap();
        assert_eq!(instant.to_rfc3339(), "2024-03-04T12:00:00+00:00");
        assert_eq!(hours.local_date(instant).unwrap(), day);
    }

    #[test]
    fn test_storage_key() {
        let config = ShopConfig {
            namespace: "taller".to_string(),
            data_dir: PathBuf::from("."),
            business_hours: BusinessHours::default(),
        };
        assert_eq!(
            config.storage_key(EntityKind::Appointment),
            "taller_appointments"
        );
        assert_eq!(config.storage_key(EntityKind::BoardColumn), "taller_columns");
    }

    #[test]
    fn test_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"namespace":"taller","data_dir":"/tmp/taller","business_hours":{"start_hour":9,"end_hour":17,"interval_minutes":15}}"#,
        )
        .unwrap();

        let config = ShopConfig::from_file(&path).unwrap();
        assert_eq!(config.namespace, "taller");
        assert_eq!(config.business_hours.interval_minutes, 15);
        assert_eq!(config.business_hours.utc_offset_minutes, 0);
    }

    #[test]
    fn test_from_file_rejects_bad_hours() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"namespace":"taller","data_dir":".","business_hours":{"start_hour":19,"end_hour":17,"interval_minutes":15}}"#,
        )
        .unwrap();

        assert!(matches!(
            ShopConfig::from_file(&path),
            Err(ShopError::ConfigError(_))
        ));
    }
}
