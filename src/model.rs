//! Plain-data reminder types exchanged with MCP clients.
//!
//! Nothing here references the native store: backends decompose native
//! objects into these values before they leave the store worker.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RemindersError, Result};

/// Reminder priority levels, matching the Reminders app UI.
///
/// - `None` (0): no flag
/// - `High` (1): `!!!`
/// - `Medium` (5): `!!`
/// - `Low` (9): `!`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Priority {
    #[default]
    None,
    High,
    Medium,
    Low,
}

impl Priority {
    /// Map a raw native priority (0-9) to the nearest UI level.
    pub fn from_native(value: i64) -> Self {
        match value {
            1..=4 => Self::High,
            5 => Self::Medium,
            6..=9 => Self::Low,
            _ => Self::None,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Self::None => 0,
            Self::High => 1,
            Self::Medium => 5,
            Self::Low => 9,
        }
    }
}

impl From<Priority> for u8 {
    fn from(p: Priority) -> Self {
        p.as_u8()
    }
}

impl TryFrom<u8> for Priority {
    type Error = RemindersError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::High),
            5 => Ok(Self::Medium),
            9 => Ok(Self::Low),
            other => Err(RemindersError::InvalidInput(format!(
                "priority must be 0 (none), 1 (high), 5 (medium) or 9 (low), got {other}"
            ))),
        }
    }
}

/// When a location trigger fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Proximity {
    /// Fire on arrival.
    #[default]
    Enter,
    /// Fire on departure.
    Leave,
}

fn default_radius() -> f64 {
    LocationTrigger::DEFAULT_RADIUS
}

/// Geofence alarm attached to a reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationTrigger {
    /// Display name for the location (e.g. "Home").
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Geofence radius in meters.
    #[serde(default = "default_radius")]
    pub radius: f64,
    #[serde(default)]
    pub proximity: Proximity,
}

impl LocationTrigger {
    pub const DEFAULT_RADIUS: f64 = 100.0;
    pub const MAX_RADIUS: f64 = 10_000.0;

    /// Check coordinate ranges and radius bounds.
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(RemindersError::InvalidInput(format!(
                "latitude must be between -90 and 90, got {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(RemindersError::InvalidInput(format!(
                "longitude must be between -180 and 180, got {}",
                self.longitude
            )));
        }
        if !(self.radius > 0.0) {
            return Err(RemindersError::InvalidInput(
                "radius must be positive".to_owned(),
            ));
        }
        if self.radius > Self::MAX_RADIUS {
            return Err(RemindersError::InvalidInput(
                "radius cannot exceed 10,000 meters (10km)".to_owned(),
            ));
        }
        Ok(())
    }
}

/// A reminder list (a calendar in EventKit terms).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderList {
    pub id: String,
    pub title: String,
    /// Uppercase `#RRGGBB`, if the list has a color.
    pub color: Option<String>,
    /// Whether new reminders land here by default.
    pub is_default: bool,
}

/// A single reminder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    pub id: String,
    pub title: String,
    pub list_id: String,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub is_completed: bool,
    pub completion_date: Option<DateTime<Utc>>,
    /// Floating local date-time.
    pub due_date: Option<NaiveDateTime>,
    /// Floating local date-time.
    pub start_date: Option<NaiveDateTime>,
    pub priority: Priority,
    pub creation_date: Option<DateTime<Utc>>,
    pub last_modified_date: Option<DateTime<Utc>>,
    pub location: Option<LocationTrigger>,
}

/// Aggregate outcome of a best-effort batch operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub successes: usize,
    pub failures: usize,
    pub failed_ids: Vec<String>,
    pub errors: Vec<String>,
}

impl BatchResult {
    pub fn record_success(&mut self) {
        self.successes += 1;
    }

    pub fn record_failure(&mut self, id: impl Into<String>, error: &RemindersError) {
        self.failures += 1;
        self.failed_ids.push(id.into());
        self.errors.push(error.to_string());
    }

    pub fn total(&self) -> usize {
        self.successes + self.failures
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures == 0
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn priority_serializes_as_integer() {
        assert_eq!(serde_json::to_value(Priority::High).unwrap(), 1);
        assert_eq!(serde_json::to_value(Priority::Low).unwrap(), 9);
        let p: Priority = serde_json::from_value(serde_json::json!(5)).unwrap();
        assert_eq!(p, Priority::Medium);
    }

    #[test]
    fn priority_rejects_non_ui_values() {
        assert!(serde_json::from_value::<Priority>(serde_json::json!(3)).is_err());
        assert!(Priority::try_from(7).is_err());
    }

    #[test]
    fn native_priority_maps_by_range() {
        assert_eq!(Priority::from_native(0), Priority::None);
        assert_eq!(Priority::from_native(3), Priority::High);
        assert_eq!(Priority::from_native(5), Priority::Medium);
        assert_eq!(Priority::from_native(7), Priority::Low);
        assert_eq!(Priority::from_native(42), Priority::None);
    }

    #[test]
    fn location_defaults_apply() {
        let loc: LocationTrigger = serde_json::from_value(serde_json::json!({
            "title": "Home",
            "latitude": 37.33,
            "longitude": -122.03,
        }))
        .unwrap();
        assert_eq!(loc.radius, 100.0);
        assert_eq!(loc.proximity, Proximity::Enter);
        assert!(loc.validate().is_ok());
    }

    #[test]
    fn location_rejects_bad_coordinates() {
        let mut loc = LocationTrigger {
            title: "Nowhere".into(),
            latitude: 91.0,
            longitude: 0.0,
            radius: 100.0,
            proximity: Proximity::Leave,
        };
        assert!(loc.validate().is_err());
        loc.latitude = 0.0;
        loc.longitude = -181.0;
        assert!(loc.validate().is_err());
    }

    #[test]
    fn location_rejects_bad_radius() {
        let mut loc = LocationTrigger {
            title: "Office".into(),
            latitude: 0.0,
            longitude: 0.0,
            radius: 0.0,
            proximity: Proximity::Enter,
        };
        assert!(loc.validate().is_err());
        loc.radius = 10_001.0;
        assert!(loc.validate().is_err());
        loc.radius = 10_000.0;
        assert!(loc.validate().is_ok());
    }

    #[test]
    fn batch_result_accounting() {
        let mut result = BatchResult::default();
        result.record_success();
        result.record_failure("b", &RemindersError::reminder_not_found("b"));
        result.record_success();
        assert_eq!(result.total(), 3);
        assert!(!result.all_succeeded());
        assert_eq!(result.failed_ids, vec!["b"]);
        assert_eq!(result.errors, vec!["Reminder not found: b"]);
    }
}
