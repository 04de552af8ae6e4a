//! EventKit reminder store (macOS only).
//!
//! The store, predicates and saved objects live on the store worker thread.
//! Fetched reminders are the exception: EventKit hands them to the fetch
//! completion block on its own queue, and they are converted into
//! [`crate::model`] values right there. No native object outlives the call
//! that produced it.

use std::sync::Mutex;
use std::time::Duration;

use block2::RcBlock;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use objc2::rc::Retained;
use objc2::runtime::Bool;
use objc2_app_kit::{NSColor, NSColorSpace};
use objc2_core_location::CLLocation;
use objc2_event_kit::{
    EKAlarm, EKAlarmProximity, EKCalendar, EKEntityType, EKEventStore, EKReminder, EKSource,
    EKSourceType, EKStructuredLocation,
};
use objc2_foundation::{NSArray, NSDate, NSDateComponents, NSError, NSString, NSURL};

use crate::access::completion::{
    PermissionResponder, WaitError, completion, permission_request,
};
use crate::color::Rgb;
use crate::dates::local_timestamp;
use crate::error::{RemindersError, ResourceKind, Result};
use crate::model::{LocationTrigger, Priority, Proximity, Reminder, ReminderList};
use crate::patch::FieldUpdate;

use super::{
    BackendConnector, ListPatch, NewReminder, ReminderBackend, ReminderPatch, ReminderQuery,
    SourceInfo, SourceKind, choose_writable_source, resolve, sort_reminders,
};

/// Completion block for the access prompt. Only the first answer counts.
fn access_handler(responder: PermissionResponder) -> RcBlock<dyn Fn(Bool, *mut NSError)> {
    let responder = Mutex::new(Some(responder));
    RcBlock::new(move |granted: Bool, error: *mut NSError| {
        // SAFETY: EventKit passes either null or a valid NSError.
        let error = unsafe { error.as_ref() }.map(|e| native_error("Access request failed", e));
        if let Some(responder) = responder.lock().unwrap_or_else(|e| e.into_inner()).take() {
            responder.respond(granted.as_bool(), error);
        }
    })
}

/// `NSDateComponentUndefined`.
const UNDEFINED_COMPONENT: isize = isize::MAX;

/// Connects to the user's reminders through `EKEventStore`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventKitConnector;

impl BackendConnector for EventKitConnector {
    fn connect(&self, timeout: Duration) -> Result<Box<dyn ReminderBackend>> {
        Ok(Box::new(EventKitBackend::open(timeout)?))
    }
}

/// Reminder store backed by one `EKEventStore`.
pub struct EventKitBackend {
    store: Retained<EKEventStore>,
    timeout: Duration,
}

impl EventKitBackend {
    /// Create the event store and request full access to reminders.
    ///
    /// Blocks until the user answers the prompt or `timeout` passes.
    pub fn open(timeout: Duration) -> Result<Self> {
        // SAFETY: plain allocation of an event store on the current thread.
        let store = unsafe { EKEventStore::new() };

        let (responder, request) = permission_request();
        let handler = access_handler(responder);

        // SAFETY: EventKit copies the block before returning, and `handler`
        // stays alive until `request.wait` returns.
        unsafe { store.requestFullAccessToRemindersWithCompletion(RcBlock::as_ptr(&handler)) };
        request.wait(timeout)?;

        tracing::debug!("reminders access granted");
        Ok(Self { store, timeout })
    }

    fn default_calendar(&self) -> Option<Retained<EKCalendar>> {
        // SAFETY: read-only store query.
        unsafe { self.store.defaultCalendarForNewReminders() }
    }

    fn default_calendar_id(&self) -> Option<String> {
        self.default_calendar()
            .map(|c| unsafe { c.calendarIdentifier() }.to_string())
    }

    fn find_calendar(&self, list_id: &str) -> Result<Retained<EKCalendar>> {
        // SAFETY: read-only store query.
        unsafe { self.store.calendarWithIdentifier(&NSString::from_str(list_id)) }
            .ok_or_else(|| RemindersError::list_not_found(list_id))
    }

    fn find_reminder(&self, reminder_id: &str) -> Result<Retained<EKReminder>> {
        let ns_id = NSString::from_str(reminder_id);
        // SAFETY: read-only store lookups; results are checked by downcast.
        resolve(
            ResourceKind::Reminder,
            reminder_id,
            |_| {
                unsafe { self.store.calendarItemWithIdentifier(&ns_id) }
                    .and_then(|item| item.downcast::<EKReminder>().ok())
            },
            |_| {
                unsafe { self.store.calendarItemsWithExternalIdentifier(&ns_id) }
                    .iter()
                    .find_map(|item| item.downcast::<EKReminder>().ok())
            },
        )
    }

    fn list_view(&self, calendar: &EKCalendar) -> ReminderList {
        let id = unsafe { calendar.calendarIdentifier() }.to_string();
        let is_default = self.default_calendar_id().as_deref() == Some(id.as_str());
        ReminderList {
            id,
            title: unsafe { calendar.title() }.to_string(),
            color: calendar_color(calendar).map(Rgb::to_hex),
            is_default,
        }
    }

    fn writable_source(&self) -> Result<Retained<EKSource>> {
        // SAFETY: read-only store and source queries.
        let sources = unsafe { self.store.sources() };
        let infos: Vec<SourceInfo> = sources.iter().map(|s| source_info(&s)).collect();

        let default_source = self
            .default_calendar()
            .filter(|c| unsafe { c.allowsContentModifications() })
            .and_then(|c| unsafe { c.source() })
            .map(|s| unsafe { s.sourceIdentifier() }.to_string());

        let chosen = choose_writable_source(default_source.as_deref(), &infos)?;
        sources
            .iter()
            .find(|s| unsafe { s.sourceIdentifier() }.to_string() == chosen.id)
            .ok_or(RemindersError::NoWritableSource)
    }

    fn save_reminder(&self, reminder: &EKReminder, context: String) -> Result<Reminder> {
        // SAFETY: the reminder belongs to this store.
        unsafe { self.store.saveReminder_commit_error(reminder, true) }
            .map_err(|e| native_error(&context, &e))?;
        Ok(reminder_view(reminder))
    }

    fn save_calendar(&self, calendar: &EKCalendar, context: String) -> Result<()> {
        // SAFETY: the calendar belongs to this store.
        unsafe { self.store.saveCalendar_commit_error(calendar, true) }
            .map_err(|e| native_error(&context, &e))
    }

    /// Run a predicate fetch and wait for its completion callback.
    fn fetch(&self, query: &ReminderQuery) -> Result<Vec<Reminder>> {
        let calendars = match &query.list_id {
            Some(list_id) => Some(NSArray::from_retained_slice(&[
                self.find_calendar(list_id)?
            ])),
            None => None,
        };

        // SAFETY: predicate construction only reads its arguments.
        let predicate = unsafe {
            if query.include_completed {
                self.store
                    .predicateForRemindersInCalendars(calendars.as_deref())
            } else {
                let start = query.due_after.map(ns_date);
                let end = query.due_before.map(ns_date);
                self.store
                    .predicateForIncompleteRemindersWithDueDateStarting_ending_calendars(
                        start.as_deref(),
                        end.as_deref(),
                        calendars.as_deref(),
                    )
            }
        };

        let (notifier, done) = completion::<Vec<Reminder>>();
        let notifier = Mutex::new(Some(notifier));
        let handler = RcBlock::new(move |found: *mut NSArray<EKReminder>| {
            // SAFETY: EventKit passes either null or a valid array.
            let reminders = unsafe { found.as_ref() }
                .map(|array| array.iter().map(|r| reminder_view(&r)).collect())
                .unwrap_or_default();
            if let Some(notifier) = notifier.lock().unwrap_or_else(|e| e.into_inner()).take() {
                notifier.notify(reminders);
            }
        });

        // SAFETY: the block is retained by EventKit until it fires.
        unsafe {
            self.store
                .fetchRemindersMatchingPredicate_completion(&predicate, &handler)
        };

        let mut reminders = done.wait(self.timeout).map_err(|e| match e {
            WaitError::TimedOut => RemindersError::Timeout(format!(
                "Fetch reminders timed out after {}s",
                self.timeout.as_secs_f64()
            )),
            WaitError::Abandoned => RemindersError::native("reminder fetch was cancelled"),
        })?;

        reminders.retain(|r| query.matches(r));
        sort_reminders(&mut reminders);
        Ok(reminders)
    }
}

impl ReminderBackend for EventKitBackend {
    fn lists(&mut self) -> Result<Vec<ReminderList>> {
        // SAFETY: read-only store query.
        let calendars = unsafe { self.store.calendarsForEntityType(EKEntityType::Reminder) };
        Ok(calendars.iter().map(|c| self.list_view(&c)).collect())
    }

    fn list(&mut self, list_id: &str) -> Result<ReminderList> {
        let calendar = self.find_calendar(list_id)?;
        Ok(self.list_view(&calendar))
    }

    fn create_list(&mut self, title: &str, color: Option<Rgb>) -> Result<ReminderList> {
        let source = self.writable_source()?;

        // SAFETY: new calendar owned by this store; setters take valid objects.
        let calendar = unsafe {
            let calendar =
                EKCalendar::calendarForEntityType_eventStore(EKEntityType::Reminder, &self.store);
            calendar.setTitle(&NSString::from_str(title));
            calendar.setSource(Some(&source));
            if let Some(color) = color {
                calendar.setColor(Some(&ns_color(color)));
            }
            calendar
        };

        self.save_calendar(&calendar, format!("Failed to create list: {title}"))?;
        tracing::debug!(title, "created reminder list");
        Ok(self.list_view(&calendar))
    }

    fn update_list(&mut self, list_id: &str, patch: &ListPatch) -> Result<ReminderList> {
        let calendar = self.find_calendar(list_id)?;

        // SAFETY: setters on a calendar owned by this store.
        unsafe {
            if let Some(title) = &patch.title {
                calendar.setTitle(&NSString::from_str(title));
            }
            if let Some(color) = patch.color {
                calendar.setColor(Some(&ns_color(color)));
            }
        }

        self.save_calendar(&calendar, format!("Failed to update list: {list_id}"))?;
        Ok(self.list_view(&calendar))
    }

    fn delete_list(&mut self, list_id: &str) -> Result<()> {
        let calendar = self.find_calendar(list_id)?;
        // SAFETY: the calendar belongs to this store.
        unsafe { self.store.removeCalendar_commit_error(&calendar, true) }
            .map_err(|e| native_error(&format!("Failed to delete list: {list_id}"), &e))
    }

    fn reminders(&mut self, query: &ReminderQuery) -> Result<Vec<Reminder>> {
        self.fetch(query)
    }

    fn reminder(&mut self, reminder_id: &str) -> Result<Reminder> {
        Ok(reminder_view(&self.find_reminder(reminder_id)?))
    }

    fn create_reminder(&mut self, new: &NewReminder) -> Result<Reminder> {
        let calendar = match &new.list_id {
            Some(list_id) => self.find_calendar(list_id)?,
            None => self
                .default_calendar()
                .ok_or(RemindersError::NoWritableSource)?,
        };
        let url = new.url.as_deref().map(ns_url).transpose()?;

        // SAFETY: new reminder owned by this store; setters take valid objects.
        let reminder = unsafe {
            let reminder = EKReminder::reminderWithEventStore(&self.store);
            reminder.setTitle(Some(&NSString::from_str(&new.title)));
            reminder.setCalendar(Some(&calendar));
            if let Some(notes) = &new.notes {
                reminder.setNotes(Some(&NSString::from_str(notes)));
            }
            reminder.setURL(url.as_deref());
            if let Some(due) = new.due_date {
                reminder.setDueDateComponents(Some(&date_components(due)));
            }
            if let Some(start) = new.start_date {
                reminder.setStartDateComponents(Some(&date_components(start)));
            }
            reminder.setPriority(usize::from(new.priority.as_u8()));
            if let Some(location) = &new.location {
                reminder.addAlarm(&location_alarm(location));
            }
            reminder
        };

        let created =
            self.save_reminder(&reminder, format!("Failed to create reminder: {}", new.title))?;
        tracing::debug!(id = %created.id, "created reminder");
        Ok(created)
    }

    fn update_reminder(&mut self, reminder_id: &str, patch: &ReminderPatch) -> Result<Reminder> {
        let reminder = self.find_reminder(reminder_id)?;
        let url = match &patch.url {
            FieldUpdate::Set(url) => Some(ns_url(url)?),
            FieldUpdate::Keep | FieldUpdate::Clear => None,
        };

        // SAFETY: setters on a reminder owned by this store.
        unsafe {
            if let Some(title) = &patch.title {
                reminder.setTitle(Some(&NSString::from_str(title)));
            }
            match &patch.notes {
                FieldUpdate::Keep => {}
                FieldUpdate::Clear => reminder.setNotes(None),
                FieldUpdate::Set(notes) => reminder.setNotes(Some(&NSString::from_str(notes))),
            }
            if !patch.url.is_keep() {
                reminder.setURL(url.as_deref());
            }
            match patch.due_date {
                FieldUpdate::Keep => {}
                FieldUpdate::Clear => reminder.setDueDateComponents(None),
                FieldUpdate::Set(due) => {
                    reminder.setDueDateComponents(Some(&date_components(due)));
                }
            }
            match patch.start_date {
                FieldUpdate::Keep => {}
                FieldUpdate::Clear => reminder.setStartDateComponents(None),
                FieldUpdate::Set(start) => {
                    reminder.setStartDateComponents(Some(&date_components(start)));
                }
            }
            if let Some(priority) = patch.priority {
                reminder.setPriority(usize::from(priority.as_u8()));
            }
            match &patch.location {
                FieldUpdate::Keep => {}
                FieldUpdate::Clear => remove_location_alarms(&reminder),
                FieldUpdate::Set(location) => {
                    remove_location_alarms(&reminder);
                    reminder.addAlarm(&location_alarm(location));
                }
            }
        }

        self.save_reminder(&reminder, format!("Failed to update reminder: {reminder_id}"))
    }

    fn set_completed(&mut self, reminder_id: &str, completed: bool) -> Result<Reminder> {
        let reminder = self.find_reminder(reminder_id)?;
        // SAFETY: setter on a reminder owned by this store.
        unsafe { reminder.setCompleted(completed) };
        self.save_reminder(&reminder, format!("Failed to update reminder: {reminder_id}"))
    }

    fn delete_reminder(&mut self, reminder_id: &str) -> Result<()> {
        let reminder = self.find_reminder(reminder_id)?;
        // SAFETY: the reminder belongs to this store.
        unsafe { self.store.removeReminder_commit_error(&reminder, true) }
            .map_err(|e| native_error(&format!("Failed to delete reminder: {reminder_id}"), &e))
    }

    fn move_reminder(&mut self, reminder_id: &str, list_id: &str) -> Result<Reminder> {
        let reminder = self.find_reminder(reminder_id)?;
        let calendar = self.find_calendar(list_id)?;
        // SAFETY: both objects belong to this store.
        unsafe { reminder.setCalendar(Some(&calendar)) };
        self.save_reminder(&reminder, format!("Failed to move reminder: {reminder_id}"))
    }
}

// ─── Conversions ─────────────────────────────────────────────────────────────
//
// SAFETY (applies to this section): getters and setters on EventKit and
// Foundation objects owned by the store worker thread.

fn native_error(context: &str, error: &NSError) -> RemindersError {
    let description = error.localizedDescription().to_string();
    RemindersError::Native {
        message: format!("{context}: {description}"),
        domain: Some(error.domain().to_string()),
        code: Some(error.code() as i64),
    }
}

fn source_info(source: &EKSource) -> SourceInfo {
    let kind = match unsafe { source.sourceType() } {
        EKSourceType::Local => SourceKind::Local,
        EKSourceType::CalDAV => SourceKind::CalDav,
        EKSourceType::Exchange => SourceKind::Exchange,
        EKSourceType::Subscribed => SourceKind::Subscribed,
        _ => SourceKind::Other,
    };
    let has_writable_list = unsafe { source.calendarsForEntityType(EKEntityType::Reminder) }
        .iter()
        .any(|c| unsafe { c.allowsContentModifications() });
    SourceInfo {
        id: unsafe { source.sourceIdentifier() }.to_string(),
        kind,
        has_writable_list,
    }
}

fn calendar_color(calendar: &EKCalendar) -> Option<Rgb> {
    let color = unsafe { calendar.color() };
    let srgb = unsafe { color.colorUsingColorSpace(&NSColorSpace::sRGBColorSpace()) }?;
    Some(Rgb::from_unit(
        unsafe { srgb.redComponent() },
        unsafe { srgb.greenComponent() },
        unsafe { srgb.blueComponent() },
    ))
}

fn ns_color(color: Rgb) -> Retained<NSColor> {
    let (r, g, b) = color.to_unit();
    unsafe { NSColor::colorWithSRGBRed_green_blue_alpha(r, g, b, 1.0) }
}

fn ns_url(url: &str) -> Result<Retained<NSURL>> {
    unsafe { NSURL::URLWithString(&NSString::from_str(url)) }
        .ok_or_else(|| RemindersError::InvalidInput(format!("url is not a valid URL: {url:?}")))
}

fn ns_date(dt: NaiveDateTime) -> Retained<NSDate> {
    unsafe { NSDate::dateWithTimeIntervalSince1970(local_timestamp(dt)) }
}

fn utc_date(date: Option<Retained<NSDate>>) -> Option<DateTime<Utc>> {
    let seconds = unsafe { date?.timeIntervalSince1970() };
    DateTime::from_timestamp_micros((seconds * 1_000_000.0).round() as i64)
}

fn date_components(dt: NaiveDateTime) -> Retained<NSDateComponents> {
    unsafe {
        let components = NSDateComponents::new();
        components.setYear(dt.year() as isize);
        components.setMonth(dt.month() as isize);
        components.setDay(dt.day() as isize);
        components.setHour(dt.hour() as isize);
        components.setMinute(dt.minute() as isize);
        components.setSecond(dt.second() as isize);
        components
    }
}

/// Calendar components back to wall-clock time. Missing time parts are zero.
fn naive_from_components(components: Option<Retained<NSDateComponents>>) -> Option<NaiveDateTime> {
    let c = components?;
    let (year, month, day) = unsafe { (c.year(), c.month(), c.day()) };
    if [year, month, day].contains(&UNDEFINED_COMPONENT) {
        return None;
    }
    let part = |v: isize| if v == UNDEFINED_COMPONENT { 0 } else { v as u32 };
    let (hour, minute, second) = unsafe { (part(c.hour()), part(c.minute()), part(c.second())) };
    NaiveDate::from_ymd_opt(year as i32, month as u32, day as u32)?
        .and_hms_opt(hour, minute, second)
}

fn location_alarm(location: &LocationTrigger) -> Retained<EKAlarm> {
    unsafe {
        let geo = CLLocation::initWithLatitude_longitude(
            CLLocation::alloc(),
            location.latitude,
            location.longitude,
        );
        let structured =
            EKStructuredLocation::locationWithTitle(&NSString::from_str(&location.title));
        structured.setGeoLocation(Some(&geo));
        structured.setRadius(location.radius);

        let alarm = EKAlarm::new();
        alarm.setStructuredLocation(Some(&structured));
        alarm.setProximity(match location.proximity {
            Proximity::Enter => EKAlarmProximity::Enter,
            Proximity::Leave => EKAlarmProximity::Leave,
        });
        alarm
    }
}

fn remove_location_alarms(reminder: &EKReminder) {
    let Some(alarms) = (unsafe { reminder.alarms() }) else {
        return;
    };
    for alarm in alarms.iter() {
        if unsafe { alarm.structuredLocation() }.is_some() {
            unsafe { reminder.removeAlarm(&alarm) };
        }
    }
}

fn location_of(reminder: &EKReminder) -> Option<LocationTrigger> {
    let alarms = unsafe { reminder.alarms() }?;
    alarms.iter().find_map(|alarm| {
        let proximity = match unsafe { alarm.proximity() } {
            EKAlarmProximity::Enter => Proximity::Enter,
            EKAlarmProximity::Leave => Proximity::Leave,
            _ => return None,
        };
        let structured = unsafe { alarm.structuredLocation() }?;
        let geo = unsafe { structured.geoLocation() }?;
        let coordinate = unsafe { geo.coordinate() };
        let radius = unsafe { structured.radius() };
        Some(LocationTrigger {
            title: unsafe { structured.title() }
                .map(|t| t.to_string())
                .unwrap_or_else(|| "Location".to_owned()),
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            radius: if radius > 0.0 { radius } else { LocationTrigger::DEFAULT_RADIUS },
            proximity,
        })
    })
}

fn reminder_view(reminder: &EKReminder) -> Reminder {
    unsafe {
        let id = reminder
            .calendarItemExternalIdentifier()
            .unwrap_or_else(|| reminder.calendarItemIdentifier())
            .to_string();
        Reminder {
            id,
            title: reminder.title().to_string(),
            list_id: reminder
                .calendar()
                .map(|c| c.calendarIdentifier().to_string())
                .unwrap_or_default(),
            notes: reminder.notes().map(|n| n.to_string()),
            url: reminder
                .URL()
                .and_then(|u| u.absoluteString())
                .map(|s| s.to_string()),
            is_completed: reminder.isCompleted(),
            completion_date: utc_date(reminder.completionDate()),
            due_date: naive_from_components(reminder.dueDateComponents()),
            start_date: naive_from_components(reminder.startDateComponents()),
            priority: Priority::from_native(reminder.priority() as i64),
            creation_date: utc_date(reminder.creationDate()),
            last_modified_date: utc_date(reminder.lastModifiedDate()),
            location: location_of(reminder),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use objc2_event_kit::EKEventStoreRequestAccessCompletionHandler;

    use super::*;

    #[test]
    fn access_handler_fits_the_request_signature_and_answers_once() {
        let (responder, request) = permission_request();
        let handler = access_handler(responder);
        let raw: EKEventStoreRequestAccessCompletionHandler = RcBlock::as_ptr(&handler);
        assert!(!raw.is_null());

        handler.call((Bool::YES, std::ptr::null_mut()));
        handler.call((Bool::NO, std::ptr::null_mut()));
        assert!(request.wait(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn access_handler_reports_denial() {
        let (responder, request) = permission_request();
        let handler = access_handler(responder);
        handler.call((Bool::NO, std::ptr::null_mut()));
        let err = request.wait(Duration::from_secs(1)).unwrap_err();
        assert_eq!(err, RemindersError::AccessDenied);
    }
}
