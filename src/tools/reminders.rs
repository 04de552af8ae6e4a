//! Reminder CRUD tools.
//!
//! Read tools ([`GetRemindersTool`], [`GetReminderTool`]) work in every mode;
//! the rest require `ToolMode::Full`. Every store call goes through
//! [`StoreAccess::run`].

use std::sync::Arc;

use serde_json::json;

use crate::access::StoreAccess;
use crate::pagination::paginate;

use super::args::{
    CompleteReminderArgs, CreateReminderArgs, GetRemindersArgs, MoveReminderArgs,
    ReminderIdArgs, UpdateReminderArgs, effective_limit, require_id,
};
use super::types::{Tool, ToolError, ToolMode, parse_args, to_value};

/// JSON schema shared by tools that accept a location trigger.
pub(crate) fn location_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "description": "Geofence alarm: fires when arriving at or leaving a place",
        "required": ["title", "latitude", "longitude"],
        "properties": {
            "title": { "type": "string", "description": "Place name, e.g. 'Home'" },
            "latitude": { "type": "number", "minimum": -90, "maximum": 90 },
            "longitude": { "type": "number", "minimum": -180, "maximum": 180 },
            "radius": {
                "type": "number",
                "description": "Geofence radius in meters (default 100, max 10000)",
                "exclusiveMinimum": 0,
                "maximum": 10000
            },
            "proximity": {
                "type": "string",
                "enum": ["enter", "leave"],
                "description": "Fire on arrival (enter, default) or departure (leave)"
            }
        }
    })
}

fn priority_schema() -> serde_json::Value {
    json!({
        "type": "integer",
        "enum": [0, 1, 5, 9],
        "description": "0 = none, 1 = high, 5 = medium, 9 = low"
    })
}

// ─── GetRemindersTool ────────────────────────────────────────────────────────

/// Lists reminders with filters and pagination.
///
/// # Arguments (JSON)
///
/// - `list_id` (string, optional)
/// - `include_completed` (bool, default false)
/// - `due_after` / `due_before` (ISO-8601, optional): `due_after <= due < due_before`
/// - `limit` (integer, optional), `offset` (integer, default 0)
pub struct GetRemindersTool {
    store: Arc<StoreAccess>,
    default_limit: Option<usize>,
}

impl GetRemindersTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self {
            store,
            default_limit: None,
        }
    }

    /// Page size used when the caller passes no `limit`.
    pub fn with_default_limit(mut self, limit: Option<usize>) -> Self {
        self.default_limit = limit;
        self
    }
}

#[async_trait::async_trait]
impl Tool for GetRemindersTool {
    fn name(&self) -> &str {
        "get_reminders"
    }

    fn description(&self) -> &str {
        "Get reminders, optionally filtered by list, completion state and due \
         date range. Results are ordered by creation date and paginated with \
         limit/offset; the response includes total, has_more and next_offset."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "list_id": {
                    "type": "string",
                    "description": "Only reminders from this list"
                },
                "include_completed": {
                    "type": "boolean",
                    "description": "Include completed reminders (default false)"
                },
                "due_after": {
                    "type": "string",
                    "description": "Only reminders due at or after this ISO-8601 date/time"
                },
                "due_before": {
                    "type": "string",
                    "description": "Only reminders due before this ISO-8601 date/time"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of reminders to return"
                },
                "offset": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Number of reminders to skip (default 0)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: GetRemindersArgs = parse_args(args)?;
        let query = args.query()?;
        let limit = effective_limit(args.limit, self.default_limit)?;

        let reminders = self.store.run(move |backend| backend.reminders(&query)).await?;
        let page = paginate(reminders, args.offset, limit);
        tracing::debug!(total = page.total, returned = page.items.len(), "fetched reminders");
        Ok(page.to_json("reminders"))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── GetReminderTool ─────────────────────────────────────────────────────────

/// Fetches one reminder by local or external identifier.
pub struct GetReminderTool {
    store: Arc<StoreAccess>,
}

impl GetReminderTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for GetReminderTool {
    fn name(&self) -> &str {
        "get_reminder"
    }

    fn description(&self) -> &str {
        "Get a single reminder with all its details by id."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["reminder_id"],
            "properties": {
                "reminder_id": {
                    "type": "string",
                    "description": "Reminder identifier"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReminderIdArgs = parse_args(args)?;
        let reminder_id = require_id("reminder_id", &args.reminder_id)?;
        let reminder = self
            .store
            .run(move |backend| backend.reminder(&reminder_id))
            .await?;
        to_value(&reminder)
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── CreateReminderTool ──────────────────────────────────────────────────────

/// Creates a reminder, in the default list unless `list_id` is given.
pub struct CreateReminderTool {
    store: Arc<StoreAccess>,
}

impl CreateReminderTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CreateReminderTool {
    fn name(&self) -> &str {
        "create_reminder"
    }

    fn description(&self) -> &str {
        "Create a new reminder. Requires a title; uses the default list unless \
         list_id is given. Dates use ISO-8601 (e.g. '2026-03-01T09:00'). \
         Priority is 0 (none), 1 (high), 5 (medium) or 9 (low). An optional \
         location adds a geofence alarm."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": { "type": "string", "description": "Reminder title" },
                "list_id": {
                    "type": "string",
                    "description": "Target list (default list if omitted)"
                },
                "notes": { "type": "string", "description": "Free-form notes" },
                "url": { "type": "string", "description": "URL to attach" },
                "due_date": { "type": "string", "description": "Due date/time, ISO-8601" },
                "start_date": { "type": "string", "description": "Start date/time, ISO-8601" },
                "priority": priority_schema(),
                "location": location_schema()
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let new = parse_args::<CreateReminderArgs>(args)?.into_new_reminder()?;
        let reminder = self
            .store
            .run(move |backend| backend.create_reminder(&new))
            .await?;
        tracing::info!(reminder_id = %reminder.id, "reminder created");
        to_value(&reminder)
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── UpdateReminderTool ──────────────────────────────────────────────────────

/// Partially updates a reminder.
///
/// Omitted keys are untouched, `null` clears a field, a value sets it.
/// `title` cannot be cleared; `priority: null` resets to none.
pub struct UpdateReminderTool {
    store: Arc<StoreAccess>,
}

impl UpdateReminderTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateReminderTool {
    fn name(&self) -> &str {
        "update_reminder"
    }

    fn description(&self) -> &str {
        "Update fields of an existing reminder. Omitted fields stay unchanged; \
         pass null to clear notes, url, due_date, start_date, priority or \
         location. Blank notes or url also clear them. Set clear_location to \
         remove location alarms."
    }

    fn schema(&self) -> serde_json::Value {
        let nullable_string = |description: &str| {
            json!({ "type": ["string", "null"], "description": description })
        };
        let mut location = location_schema();
        location["type"] = json!(["object", "null"]);
        let mut priority = priority_schema();
        priority["type"] = json!(["integer", "null"]);
        priority["enum"] = json!([0, 1, 5, 9, null]);

        json!({
            "type": "object",
            "required": ["reminder_id"],
            "properties": {
                "reminder_id": { "type": "string", "description": "Reminder identifier" },
                "title": { "type": "string", "description": "New title (cannot be null)" },
                "notes": nullable_string("New notes, or null to clear"),
                "url": nullable_string("New URL, or null to clear"),
                "due_date": nullable_string("New due date (ISO-8601), or null to clear"),
                "start_date": nullable_string("New start date (ISO-8601), or null to clear"),
                "priority": priority,
                "location": location,
                "clear_location": {
                    "type": "boolean",
                    "description": "Remove any location alarm (same as location: null)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let (reminder_id, patch) = parse_args::<UpdateReminderArgs>(args)?.into_patch()?;
        let reminder = self
            .store
            .run(move |backend| backend.update_reminder(&reminder_id, &patch))
            .await?;
        to_value(&reminder)
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── CompleteReminderTool ────────────────────────────────────────────────────

/// Marks a reminder complete (default) or reopens it.
pub struct CompleteReminderTool {
    store: Arc<StoreAccess>,
}

impl CompleteReminderTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CompleteReminderTool {
    fn name(&self) -> &str {
        "complete_reminder"
    }

    fn description(&self) -> &str {
        "Mark a reminder as completed, or pass completed=false to reopen it. \
         Completing an already completed reminder is a no-op."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["reminder_id"],
            "properties": {
                "reminder_id": { "type": "string", "description": "Reminder identifier" },
                "completed": {
                    "type": "boolean",
                    "description": "true to complete (default), false to reopen"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: CompleteReminderArgs = parse_args(args)?;
        let reminder_id = require_id("reminder_id", &args.reminder_id)?;
        let completed = args.completed;
        let reminder = self
            .store
            .run(move |backend| backend.set_completed(&reminder_id, completed))
            .await?;
        to_value(&reminder)
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── DeleteReminderTool ──────────────────────────────────────────────────────

pub struct DeleteReminderTool {
    store: Arc<StoreAccess>,
}

impl DeleteReminderTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteReminderTool {
    fn name(&self) -> &str {
        "delete_reminder"
    }

    fn description(&self) -> &str {
        "Delete a reminder. This cannot be undone."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["reminder_id"],
            "properties": {
                "reminder_id": { "type": "string", "description": "Reminder identifier" }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReminderIdArgs = parse_args(args)?;
        let reminder_id = require_id("reminder_id", &args.reminder_id)?;
        let target = reminder_id.clone();
        self.store
            .run(move |backend| backend.delete_reminder(&target))
            .await?;
        Ok(json!({ "deleted": true, "reminder_id": reminder_id }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── MoveReminderTool ────────────────────────────────────────────────────────

pub struct MoveReminderTool {
    store: Arc<StoreAccess>,
}

impl MoveReminderTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for MoveReminderTool {
    fn name(&self) -> &str {
        "move_reminder"
    }

    fn description(&self) -> &str {
        "Move a reminder to a different list."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["reminder_id", "list_id"],
            "properties": {
                "reminder_id": { "type": "string", "description": "Reminder identifier" },
                "list_id": { "type": "string", "description": "Destination list identifier" }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: MoveReminderArgs = parse_args(args)?;
        let reminder_id = require_id("reminder_id", &args.reminder_id)?;
        let list_id = require_id("list_id", &args.list_id)?;
        let reminder = self
            .store
            .run(move |backend| backend.move_reminder(&reminder_id, &list_id))
            .await?;
        to_value(&reminder)
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}
