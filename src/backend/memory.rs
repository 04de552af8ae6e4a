//! In-memory reminder store.
//!
//! Behaves like the native store for everything the tools can observe:
//! lists with a default, local and external reminder identifiers, source
//! selection for new lists, and a permission handshake answered from a
//! callback thread. [`MemoryConnector`] decides how that handshake ends.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::access::completion::{PermissionResponder, permission_request};
use crate::color::Rgb;
use crate::error::{RemindersError, ResourceKind, Result};
use crate::model::{Reminder, ReminderList};

use super::{
    BackendConnector, ListPatch, NewReminder, ReminderBackend, ReminderPatch, ReminderQuery,
    SourceInfo, SourceKind, choose_writable_source, resolve, sort_reminders,
};

/// Title of the list every fresh store starts with.
pub const DEFAULT_LIST_TITLE: &str = "Reminders";

/// How the simulated permission prompt is answered.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionScenario {
    Granted,
    Denied,
    /// The prompt completes with a native error.
    Fails(RemindersError),
    /// The prompt is never answered.
    NeverResponds,
}

/// Opens [`MemoryBackend`]s after a simulated permission prompt.
///
/// Each successful `connect` yields an empty store holding one default list.
pub struct MemoryConnector {
    scenario: Mutex<PermissionScenario>,
    response_delay: Duration,
    sources: Vec<SourceInfo>,
    handshakes: AtomicUsize,
    /// Prompts left unanswered by `NeverResponds`.
    unanswered: Mutex<Vec<PermissionResponder>>,
}

impl std::fmt::Debug for MemoryConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryConnector")
            .field("response_delay", &self.response_delay)
            .field("handshakes", &self.handshakes())
            .finish_non_exhaustive()
    }
}

impl MemoryConnector {
    pub fn new(scenario: PermissionScenario) -> Self {
        Self {
            scenario: Mutex::new(scenario),
            response_delay: Duration::ZERO,
            sources: vec![SourceInfo {
                id: "local".to_owned(),
                kind: SourceKind::Local,
                has_writable_list: true,
            }],
            handshakes: AtomicUsize::new(0),
            unanswered: Mutex::new(Vec::new()),
        }
    }

    pub fn granted() -> Self {
        Self::new(PermissionScenario::Granted)
    }

    /// Delay before the prompt is answered.
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    /// Replace the accounts new stores report.
    pub fn with_sources(mut self, sources: Vec<SourceInfo>) -> Self {
        self.sources = sources;
        self
    }

    /// Change the answer for subsequent handshakes.
    pub fn set_scenario(&self, scenario: PermissionScenario) {
        *self.scenario.lock().unwrap_or_else(|e| e.into_inner()) = scenario;
    }

    /// Number of handshakes started so far.
    pub fn handshakes(&self) -> usize {
        self.handshakes.load(Ordering::SeqCst)
    }
}

impl BackendConnector for MemoryConnector {
    fn connect(&self, timeout: Duration) -> Result<Box<dyn ReminderBackend>> {
        self.handshakes.fetch_add(1, Ordering::SeqCst);
        // A new handshake supersedes any prompt left hanging by the last one.
        self.unanswered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        let scenario = self
            .scenario
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let (responder, request) = permission_request();
        let (granted, error) = match scenario {
            PermissionScenario::Granted => (true, None),
            PermissionScenario::Denied => (false, None),
            PermissionScenario::Fails(error) => (false, Some(error)),
            PermissionScenario::NeverResponds => {
                self.unanswered
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(responder);
                request.wait(timeout)?;
                return Err(RemindersError::native("unanswered prompt was answered"));
            }
        };

        let delay = self.response_delay;
        std::thread::spawn(move || {
            if !delay.is_zero() {
                std::thread::sleep(delay);
            }
            responder.respond(granted, error);
        });

        request.wait(timeout)?;
        Ok(Box::new(MemoryBackend::new(self.sources.clone())))
    }
}

#[derive(Debug, Clone)]
struct StoredList {
    id: String,
    title: String,
    color: Option<Rgb>,
    source_id: String,
}

#[derive(Debug, Clone)]
struct StoredReminder {
    local_id: String,
    reminder: Reminder,
}

/// Reminder store held entirely in memory.
#[derive(Debug)]
pub struct MemoryBackend {
    sources: Vec<SourceInfo>,
    lists: Vec<StoredList>,
    reminders: Vec<StoredReminder>,
    default_list: Option<String>,
    last_stamp: Option<DateTime<Utc>>,
}

impl MemoryBackend {
    /// Fresh store. Gets a default list when some source accepts one.
    pub fn new(sources: Vec<SourceInfo>) -> Self {
        let mut backend = Self {
            sources,
            lists: Vec::new(),
            reminders: Vec::new(),
            default_list: None,
            last_stamp: None,
        };
        if let Ok(list) = backend.create_list(DEFAULT_LIST_TITLE, None) {
            backend.default_list = Some(list.id);
        }
        backend
    }

    /// Strictly increasing timestamps so creation order survives sorting.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next
    }

    fn list_view(&self, list: &StoredList) -> ReminderList {
        ReminderList {
            id: list.id.clone(),
            title: list.title.clone(),
            color: list.color.map(Rgb::to_hex),
            is_default: self.default_list.as_deref() == Some(list.id.as_str()),
        }
    }

    fn list_index(&self, list_id: &str) -> Result<usize> {
        self.lists
            .iter()
            .position(|l| l.id == list_id)
            .ok_or_else(|| RemindersError::list_not_found(list_id))
    }

    fn reminder_index(&self, reminder_id: &str) -> Result<usize> {
        resolve(
            ResourceKind::Reminder,
            reminder_id,
            |id| self.reminders.iter().position(|r| r.local_id == id),
            |id| self.reminders.iter().position(|r| r.reminder.id == id),
        )
    }

    fn default_writable_source(&self) -> Option<&str> {
        let default_id = self.default_list.as_deref()?;
        self.lists
            .iter()
            .find(|l| l.id == default_id)
            .map(|l| l.source_id.as_str())
    }

    fn save(&mut self, index: usize) -> Reminder {
        let stamp = self.stamp();
        let stored = &mut self.reminders[index];
        stored.reminder.last_modified_date = Some(stamp);
        stored.reminder.clone()
    }
}

impl ReminderBackend for MemoryBackend {
    fn lists(&mut self) -> Result<Vec<ReminderList>> {
        Ok(self.lists.iter().map(|l| self.list_view(l)).collect())
    }

    fn list(&mut self, list_id: &str) -> Result<ReminderList> {
        let index = self.list_index(list_id)?;
        Ok(self.list_view(&self.lists[index]))
    }

    fn create_list(&mut self, title: &str, color: Option<Rgb>) -> Result<ReminderList> {
        let source_id = choose_writable_source(self.default_writable_source(), &self.sources)?
            .id
            .clone();
        let list = StoredList {
            id: uuid::Uuid::new_v4().to_string().to_uppercase(),
            title: title.to_owned(),
            color,
            source_id,
        };
        let view = self.list_view(&list);
        self.lists.push(list);
        Ok(view)
    }

    fn update_list(&mut self, list_id: &str, patch: &ListPatch) -> Result<ReminderList> {
        let index = self.list_index(list_id)?;
        let list = &mut self.lists[index];
        if let Some(title) = &patch.title {
            list.title = title.clone();
        }
        if let Some(color) = patch.color {
            list.color = Some(color);
        }
        Ok(self.list_view(&self.lists[index]))
    }

    fn delete_list(&mut self, list_id: &str) -> Result<()> {
        let index = self.list_index(list_id)?;
        let removed = self.lists.remove(index);
        self.reminders.retain(|r| r.reminder.list_id != removed.id);
        if self.default_list.as_deref() == Some(removed.id.as_str()) {
            self.default_list = self.lists.first().map(|l| l.id.clone());
        }
        Ok(())
    }

    fn reminders(&mut self, query: &ReminderQuery) -> Result<Vec<Reminder>> {
        if let Some(list_id) = &query.list_id {
            self.list_index(list_id)?;
        }
        let mut found: Vec<Reminder> = self
            .reminders
            .iter()
            .map(|r| &r.reminder)
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        sort_reminders(&mut found);
        Ok(found)
    }

    fn reminder(&mut self, reminder_id: &str) -> Result<Reminder> {
        let index = self.reminder_index(reminder_id)?;
        Ok(self.reminders[index].reminder.clone())
    }

    fn create_reminder(&mut self, new: &NewReminder) -> Result<Reminder> {
        let list_id = match &new.list_id {
            Some(list_id) => self.lists[self.list_index(list_id)?].id.clone(),
            None => self
                .default_list
                .clone()
                .ok_or(RemindersError::NoWritableSource)?,
        };

        let stamp = self.stamp();
        let reminder = Reminder {
            id: uuid::Uuid::new_v4().to_string().to_uppercase(),
            title: new.title.clone(),
            list_id,
            notes: new.notes.clone(),
            url: new.url.clone(),
            is_completed: false,
            completion_date: None,
            due_date: new.due_date,
            start_date: new.start_date,
            priority: new.priority,
            creation_date: Some(stamp),
            last_modified_date: Some(stamp),
            location: new.location.clone(),
        };
        self.reminders.push(StoredReminder {
            local_id: uuid::Uuid::new_v4().to_string(),
            reminder: reminder.clone(),
        });
        Ok(reminder)
    }

    fn update_reminder(&mut self, reminder_id: &str, patch: &ReminderPatch) -> Result<Reminder> {
        let index = self.reminder_index(reminder_id)?;
        let reminder = &mut self.reminders[index].reminder;

        if let Some(title) = &patch.title {
            reminder.title = title.clone();
        }
        patch.notes.clone().apply_to(&mut reminder.notes);
        patch.url.clone().apply_to(&mut reminder.url);
        patch.due_date.clone().apply_to(&mut reminder.due_date);
        patch.start_date.clone().apply_to(&mut reminder.start_date);
        if let Some(priority) = patch.priority {
            reminder.priority = priority;
        }
        patch.location.clone().apply_to(&mut reminder.location);

        Ok(self.save(index))
    }

    fn set_completed(&mut self, reminder_id: &str, completed: bool) -> Result<Reminder> {
        let index = self.reminder_index(reminder_id)?;
        let already = self.reminders[index].reminder.is_completed;
        if completed && !already {
            let stamp = self.stamp();
            self.reminders[index].reminder.completion_date = Some(stamp);
        } else if !completed {
            self.reminders[index].reminder.completion_date = None;
        }
        self.reminders[index].reminder.is_completed = completed;
        Ok(self.save(index))
    }

    fn delete_reminder(&mut self, reminder_id: &str) -> Result<()> {
        let index = self.reminder_index(reminder_id)?;
        self.reminders.remove(index);
        Ok(())
    }

    fn move_reminder(&mut self, reminder_id: &str, list_id: &str) -> Result<Reminder> {
        let index = self.reminder_index(reminder_id)?;
        let target = self.lists[self.list_index(list_id)?].id.clone();
        self.reminders[index].reminder.list_id = target;
        Ok(self.save(index))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use chrono::NaiveDate;

    use super::*;
    use crate::model::{LocationTrigger, Priority, Proximity};
    use crate::patch::FieldUpdate;

    fn store() -> MemoryBackend {
        MemoryBackend::new(vec![SourceInfo {
            id: "local".into(),
            kind: SourceKind::Local,
            has_writable_list: true,
        }])
    }

    #[test]
    fn fresh_store_has_default_list() {
        let mut store = store();
        let lists = store.lists().unwrap();
        assert_eq!(lists.len(), 1);
        assert_eq!(lists[0].title, DEFAULT_LIST_TITLE);
        assert!(lists[0].is_default);
    }

    #[test]
    fn no_writable_source_means_no_default_list() {
        let mut store = MemoryBackend::new(Vec::new());
        assert!(store.lists().unwrap().is_empty());
        let err = store
            .create_reminder(&NewReminder::titled("milk", None))
            .unwrap_err();
        assert_eq!(err, RemindersError::NoWritableSource);
        assert_eq!(
            store.create_list("Groceries", None).unwrap_err(),
            RemindersError::NoWritableSource
        );
    }

    #[test]
    fn reminder_resolves_by_local_and_external_id() {
        let mut store = store();
        let created = store
            .create_reminder(&NewReminder::titled("milk", None))
            .unwrap();
        let local = store.reminders[0].local_id.clone();
        assert_eq!(store.reminder(&created.id).unwrap().title, "milk");
        assert_eq!(store.reminder(&local).unwrap().id, created.id);
    }

    #[test]
    fn update_applies_tri_state_fields() {
        let mut store = store();
        let due = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let created = store
            .create_reminder(&NewReminder {
                title: "call".into(),
                notes: Some("old".into()),
                due_date: Some(due),
                location: Some(LocationTrigger {
                    title: "Home".into(),
                    latitude: 1.0,
                    longitude: 2.0,
                    radius: 100.0,
                    proximity: Proximity::Enter,
                }),
                ..NewReminder::default()
            })
            .unwrap();

        let updated = store
            .update_reminder(
                &created.id,
                &ReminderPatch {
                    notes: FieldUpdate::Clear,
                    priority: Some(Priority::High),
                    location: FieldUpdate::Clear,
                    ..ReminderPatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.notes, None);
        assert_eq!(updated.due_date, Some(due));
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.location, None);
        assert_eq!(updated.title, "call");
    }

    #[test]
    fn completion_is_idempotent() {
        let mut store = store();
        let created = store
            .create_reminder(&NewReminder::titled("milk", None))
            .unwrap();
        let first = store.set_completed(&created.id, true).unwrap();
        let second = store.set_completed(&created.id, true).unwrap();
        assert!(second.is_completed);
        assert_eq!(first.completion_date, second.completion_date);
        let reopened = store.set_completed(&created.id, false).unwrap();
        assert!(reopened.completion_date.is_none());
    }

    #[test]
    fn deleting_a_list_drops_its_reminders() {
        let mut store = store();
        let list = store.create_list("Errands", None).unwrap();
        store
            .create_reminder(&NewReminder::titled("post office", Some(list.id.clone())))
            .unwrap();
        store.delete_list(&list.id).unwrap();
        let all = store
            .reminders(&ReminderQuery {
                include_completed: true,
                ..ReminderQuery::default()
            })
            .unwrap();
        assert!(all.is_empty());
    }

    #[test]
    fn reminders_come_back_in_creation_order() {
        let mut store = store();
        for title in ["a", "b", "c", "d"] {
            store
                .create_reminder(&NewReminder::titled(title, None))
                .unwrap();
        }
        let titles: Vec<String> = store
            .reminders(&ReminderQuery::default())
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn move_to_missing_list_fails() {
        let mut store = store();
        let created = store
            .create_reminder(&NewReminder::titled("milk", None))
            .unwrap();
        let err = store.move_reminder(&created.id, "nope").unwrap_err();
        assert_eq!(err, RemindersError::list_not_found("nope"));
    }

    #[test]
    fn denied_scenario_reports_access_denied() {
        let connector = MemoryConnector::new(PermissionScenario::Denied);
        let err = connector.connect(Duration::from_secs(1)).err().unwrap();
        assert_eq!(err, RemindersError::AccessDenied);
        assert_eq!(connector.handshakes(), 1);
    }

    #[test]
    fn unanswered_scenario_times_out() {
        let connector = MemoryConnector::new(PermissionScenario::NeverResponds);
        let err = connector.connect(Duration::from_millis(20)).err().unwrap();
        assert_eq!(err.code(), "PERMISSION_TIMEOUT");
    }

    #[test]
    fn repeated_unanswered_prompts_do_not_accumulate() {
        let connector = MemoryConnector::new(PermissionScenario::NeverResponds);
        for _ in 0..3 {
            assert!(connector.connect(Duration::from_millis(5)).is_err());
        }
        assert_eq!(connector.handshakes(), 3);
        assert_eq!(connector.unanswered.lock().unwrap().len(), 1);

        connector.set_scenario(PermissionScenario::Granted);
        assert!(connector.connect(Duration::from_secs(1)).is_ok());
        assert!(connector.unanswered.lock().unwrap().is_empty());
    }
}
