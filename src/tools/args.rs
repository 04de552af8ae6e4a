//! Tool argument types and their validation.
//!
//! Structural problems (missing required keys, wrong JSON types) fail in
//! deserialization. Domain checks (blank titles, bad colors, dates,
//! priorities and coordinates) happen in the `into_*` conversions and report
//! `InvalidInput`.

use serde::Deserialize;

use crate::backend::{ListPatch, NewReminder, ReminderPatch, ReminderQuery};
use crate::color::Rgb;
use crate::dates::{parse_local_datetime, parse_optional};
use crate::error::{RemindersError, Result};
use crate::model::{LocationTrigger, Priority};
use crate::patch::FieldUpdate;

fn default_true() -> bool {
    true
}

/// Trimmed, non-empty identifier.
pub fn require_id(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RemindersError::InvalidInput(format!(
            "{field} is required and cannot be empty"
        )));
    }
    Ok(trimmed.to_owned())
}

fn require_title(title: &str) -> Result<String> {
    require_id("title", title)
}

/// Blank optional strings count as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

/// Blank replacements clear the field.
fn blank_clears(update: FieldUpdate<String>) -> FieldUpdate<String> {
    match update {
        FieldUpdate::Set(value) if value.trim().is_empty() => FieldUpdate::Clear,
        other => other,
    }
}

fn parse_priority(raw: i64) -> Result<Priority> {
    u8::try_from(raw)
        .map_err(|_| {
            RemindersError::InvalidInput(format!(
                "priority must be 0 (none), 1 (high), 5 (medium) or 9 (low), got {raw}"
            ))
        })
        .and_then(Priority::try_from)
}

fn parse_color(color: Option<String>) -> Result<Option<Rgb>> {
    non_blank(color).map(|c| c.parse()).transpose()
}

fn validated(location: Option<LocationTrigger>) -> Result<Option<LocationTrigger>> {
    if let Some(location) = &location {
        location.validate()?;
    }
    Ok(location)
}

/// Page size: the caller's `limit`, else the configured default.
pub fn effective_limit(limit: Option<usize>, default: Option<usize>) -> Result<Option<usize>> {
    match limit {
        Some(0) => Err(RemindersError::InvalidInput(
            "limit must be at least 1".to_owned(),
        )),
        Some(limit) => Ok(Some(limit)),
        None => Ok(default),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListIdArgs {
    pub list_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderIdArgs {
    pub reminder_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateListArgs {
    pub title: String,
    pub color: Option<String>,
}

impl CreateListArgs {
    pub fn validate(self) -> Result<(String, Option<Rgb>)> {
        Ok((require_title(&self.title)?, parse_color(self.color)?))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateListArgs {
    pub list_id: String,
    pub title: Option<String>,
    pub color: Option<String>,
}

impl UpdateListArgs {
    pub fn into_patch(self) -> Result<(String, ListPatch)> {
        let list_id = require_id("list_id", &self.list_id)?;
        let title = self.title.as_deref().map(require_title).transpose()?;
        let color = parse_color(self.color)?;
        Ok((list_id, ListPatch { title, color }))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetRemindersArgs {
    pub list_id: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
    pub due_before: Option<String>,
    pub due_after: Option<String>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl GetRemindersArgs {
    pub fn query(&self) -> Result<ReminderQuery> {
        let query = ReminderQuery {
            list_id: non_blank(self.list_id.clone()),
            include_completed: self.include_completed,
            due_after: parse_optional("due_after", self.due_after.as_deref())?,
            due_before: parse_optional("due_before", self.due_before.as_deref())?,
        };
        if let (Some(after), Some(before)) = (query.due_after, query.due_before)
            && after > before
        {
            return Err(RemindersError::InvalidInput(
                "due_after must not be later than due_before".to_owned(),
            ));
        }
        Ok(query)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderArgs {
    pub title: String,
    pub list_id: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub due_date: Option<String>,
    pub start_date: Option<String>,
    #[serde(default)]
    pub priority: i64,
    pub location: Option<LocationTrigger>,
}

impl CreateReminderArgs {
    pub fn into_new_reminder(self) -> Result<NewReminder> {
        Ok(NewReminder {
            title: require_title(&self.title)?,
            list_id: non_blank(self.list_id),
            notes: non_blank(self.notes),
            url: non_blank(self.url),
            due_date: parse_optional("due_date", self.due_date.as_deref())?,
            start_date: parse_optional("start_date", self.start_date.as_deref())?,
            priority: parse_priority(self.priority)?,
            location: validated(self.location)?,
        })
    }
}

/// Update arguments. Absent keys keep the field, `null` clears it.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateReminderArgs {
    pub reminder_id: String,
    #[serde(default)]
    pub title: FieldUpdate<String>,
    #[serde(default)]
    pub notes: FieldUpdate<String>,
    #[serde(default)]
    pub url: FieldUpdate<String>,
    #[serde(default)]
    pub due_date: FieldUpdate<String>,
    #[serde(default)]
    pub start_date: FieldUpdate<String>,
    #[serde(default)]
    pub priority: FieldUpdate<i64>,
    #[serde(default)]
    pub location: FieldUpdate<LocationTrigger>,
    /// Same as `location: null`.
    #[serde(default)]
    pub clear_location: bool,
}

impl UpdateReminderArgs {
    pub fn into_patch(self) -> Result<(String, ReminderPatch)> {
        let reminder_id = require_id("reminder_id", &self.reminder_id)?;

        let title = match self.title {
            FieldUpdate::Keep => None,
            FieldUpdate::Clear => {
                return Err(RemindersError::InvalidInput(
                    "title cannot be cleared".to_owned(),
                ));
            }
            FieldUpdate::Set(title) => Some(require_title(&title)?),
        };

        let priority = match self.priority {
            FieldUpdate::Keep => None,
            FieldUpdate::Clear => Some(Priority::None),
            FieldUpdate::Set(raw) => Some(parse_priority(raw)?),
        };

        let location = if self.clear_location {
            FieldUpdate::Clear
        } else {
            self.location.try_map(|location| {
                location.validate()?;
                Ok::<_, RemindersError>(location)
            })?
        };

        let patch = ReminderPatch {
            title,
            notes: blank_clears(self.notes),
            url: blank_clears(self.url),
            due_date: self
                .due_date
                .try_map(|s| parse_local_datetime("due_date", &s))?,
            start_date: self
                .start_date
                .try_map(|s| parse_local_datetime("start_date", &s))?,
            priority,
            location,
        };
        Ok((reminder_id, patch))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteReminderArgs {
    pub reminder_id: String,
    #[serde(default = "default_true")]
    pub completed: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MoveReminderArgs {
    pub reminder_id: String,
    pub list_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReminderIdsArgs {
    pub reminder_ids: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddRemindersArgs {
    pub list_id: Option<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchRemindersArgs {
    pub query: String,
    pub list_id: Option<String>,
    #[serde(default)]
    pub include_completed: bool,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

impl SearchRemindersArgs {
    pub fn base_query(&self) -> ReminderQuery {
        ReminderQuery {
            list_id: non_blank(self.list_id.clone()),
            include_completed: self.include_completed,
            ..ReminderQuery::default()
        }
    }
}
