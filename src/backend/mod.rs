//! Reminder store backends.
//!
//! A backend is the synchronous, single-threaded face of a reminder store.
//! It is created on the store worker thread by a [`BackendConnector`] (which
//! also performs the permission handshake) and never leaves that thread, so
//! implementations may hold thread-affine native objects.
//!
//! Two implementations exist:
//! - [`eventkit::EventKitBackend`] on macOS, backed by `EKEventStore`
//! - [`memory::MemoryBackend`] everywhere, for tests and development

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::color::Rgb;
use crate::config::BackendKind;
use crate::error::{RemindersError, ResourceKind, Result};
use crate::model::{LocationTrigger, Priority, Reminder, ReminderList};
use crate::patch::FieldUpdate;

#[cfg(target_os = "macos")]
pub mod eventkit;
pub mod memory;

// ─── Requests ────────────────────────────────────────────────────────────────

/// Data for creating a new reminder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewReminder {
    pub title: String,
    /// Target list; `None` means the store's default list.
    pub list_id: Option<String>,
    pub notes: Option<String>,
    pub url: Option<String>,
    pub due_date: Option<NaiveDateTime>,
    pub start_date: Option<NaiveDateTime>,
    pub priority: Priority,
    pub location: Option<LocationTrigger>,
}

impl NewReminder {
    /// Title-only reminder, as used by quick-add.
    pub fn titled(title: impl Into<String>, list_id: Option<String>) -> Self {
        Self {
            title: title.into(),
            list_id,
            ..Self::default()
        }
    }
}

/// Partial update of a reminder. Untouched fields stay as they are.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderPatch {
    pub title: Option<String>,
    pub notes: FieldUpdate<String>,
    pub url: FieldUpdate<String>,
    pub due_date: FieldUpdate<NaiveDateTime>,
    pub start_date: FieldUpdate<NaiveDateTime>,
    pub priority: Option<Priority>,
    /// `Clear` drops every location alarm; `Set` replaces them.
    pub location: FieldUpdate<LocationTrigger>,
}

/// Partial update of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListPatch {
    pub title: Option<String>,
    pub color: Option<Rgb>,
}

/// Filter for fetching reminders.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReminderQuery {
    pub list_id: Option<String>,
    pub include_completed: bool,
    /// Inclusive lower bound on the due date.
    pub due_after: Option<NaiveDateTime>,
    /// Exclusive upper bound on the due date.
    pub due_before: Option<NaiveDateTime>,
}

impl ReminderQuery {
    pub fn has_due_range(&self) -> bool {
        self.due_after.is_some() || self.due_before.is_some()
    }

    /// Whether `reminder` passes every filter.
    ///
    /// With a due bound set, reminders without a due date never match.
    pub fn matches(&self, reminder: &Reminder) -> bool {
        if let Some(list_id) = &self.list_id
            && &reminder.list_id != list_id
        {
            return false;
        }
        if !self.include_completed && reminder.is_completed {
            return false;
        }
        if !self.has_due_range() {
            return true;
        }
        let Some(due) = reminder.due_date else {
            return false;
        };
        self.due_after.is_none_or(|after| due >= after)
            && self.due_before.is_none_or(|before| due < before)
    }
}

// ─── Backend traits ──────────────────────────────────────────────────────────

/// Synchronous access to one reminder store.
///
/// All methods take and return plain data. Identifiers for reminders are
/// resolved with [`resolve`]: local identifier first, then external.
pub trait ReminderBackend {
    fn lists(&mut self) -> Result<Vec<ReminderList>>;

    fn list(&mut self, list_id: &str) -> Result<ReminderList>;

    fn create_list(&mut self, title: &str, color: Option<Rgb>) -> Result<ReminderList>;

    fn update_list(&mut self, list_id: &str, patch: &ListPatch) -> Result<ReminderList>;

    fn delete_list(&mut self, list_id: &str) -> Result<()>;

    /// Reminders matching `query`, oldest first.
    fn reminders(&mut self, query: &ReminderQuery) -> Result<Vec<Reminder>>;

    fn reminder(&mut self, reminder_id: &str) -> Result<Reminder>;

    fn create_reminder(&mut self, new: &NewReminder) -> Result<Reminder>;

    fn update_reminder(&mut self, reminder_id: &str, patch: &ReminderPatch) -> Result<Reminder>;

    fn set_completed(&mut self, reminder_id: &str, completed: bool) -> Result<Reminder>;

    fn delete_reminder(&mut self, reminder_id: &str) -> Result<()>;

    fn move_reminder(&mut self, reminder_id: &str, list_id: &str) -> Result<Reminder>;
}

/// Opens a backend on the calling thread.
///
/// `connect` runs the permission handshake and blocks for at most `timeout`
/// waiting for the user to answer.
pub trait BackendConnector: Send + Sync + 'static {
    fn connect(&self, timeout: Duration) -> Result<Box<dyn ReminderBackend>>;
}

/// Connector for the configured backend kind.
pub fn connector_for(kind: BackendKind) -> Arc<dyn BackendConnector> {
    match kind {
        BackendKind::Memory => Arc::new(memory::MemoryConnector::granted()),
        BackendKind::EventKit => native_connector(),
    }
}

#[cfg(target_os = "macos")]
fn native_connector() -> Arc<dyn BackendConnector> {
    Arc::new(eventkit::EventKitConnector)
}

#[cfg(not(target_os = "macos"))]
fn native_connector() -> Arc<dyn BackendConnector> {
    Arc::new(UnavailableConnector)
}

/// Stand-in for platforms without EventKit.
#[cfg(not(target_os = "macos"))]
struct UnavailableConnector;

#[cfg(not(target_os = "macos"))]
impl BackendConnector for UnavailableConnector {
    fn connect(&self, _timeout: Duration) -> Result<Box<dyn ReminderBackend>> {
        Err(RemindersError::native(
            "EventKit is only available on macOS; use the memory backend on this platform",
        ))
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────────────

/// Look an entity up by local identifier, then by external identifier.
pub fn resolve<T>(
    kind: ResourceKind,
    id: &str,
    by_local: impl FnOnce(&str) -> Option<T>,
    by_external: impl FnOnce(&str) -> Option<T>,
) -> Result<T> {
    if let Some(found) = by_local(id) {
        return Ok(found);
    }
    by_external(id).ok_or_else(|| RemindersError::NotFound {
        kind,
        id: id.to_owned(),
    })
}

/// Order reminders by creation date, then identifier.
pub fn sort_reminders(reminders: &mut [Reminder]) {
    reminders.sort_by(|a, b| {
        a.creation_date
            .cmp(&b.creation_date)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Account type hosting reminder lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Local,
    CalDav,
    Exchange,
    Subscribed,
    Other,
}

/// One account as seen when picking where a new list should live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceInfo {
    pub id: String,
    pub kind: SourceKind,
    /// Whether the source already hosts a reminder list that accepts changes.
    pub has_writable_list: bool,
}

/// Pick the source for a new list.
///
/// Preference: the default list's source (pass its id only when that list
/// is writable), then CalDAV, then Local, then anything with a writable list.
pub fn choose_writable_source<'a>(
    default_source: Option<&str>,
    sources: &'a [SourceInfo],
) -> Result<&'a SourceInfo> {
    if let Some(default_id) = default_source
        && let Some(source) = sources.iter().find(|s| s.id == default_id)
    {
        return Ok(source);
    }

    let writable = |kind: Option<SourceKind>| {
        sources
            .iter()
            .find(|s| s.has_writable_list && kind.is_none_or(|k| s.kind == k))
    };

    writable(Some(SourceKind::CalDav))
        .or_else(|| writable(Some(SourceKind::Local)))
        .or_else(|| writable(None))
        .ok_or(RemindersError::NoWritableSource)
}
