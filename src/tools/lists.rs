//! Reminder list tools.
//!
//! - [`ListReminderListsTool`]: all lists (read-only)
//! - [`GetReminderListTool`]: one list (read-only)
//! - [`CreateReminderListTool`], [`UpdateReminderListTool`],
//!   [`DeleteReminderListTool`]: mutations, Full mode only

use std::sync::Arc;

use serde_json::json;

use crate::access::StoreAccess;

use super::args::{CreateListArgs, ListIdArgs, UpdateListArgs, require_id};
use super::types::{Tool, ToolError, ToolMode, parse_args, to_value};

// ─── ListReminderListsTool ───────────────────────────────────────────────────

/// Lists every reminder list. No arguments.
pub struct ListReminderListsTool {
    store: Arc<StoreAccess>,
}

impl ListReminderListsTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for ListReminderListsTool {
    fn name(&self) -> &str {
        "list_reminder_lists"
    }

    fn description(&self) -> &str {
        "List all reminder lists in the user's Reminders app. \
         Returns each list's id, title, color (#RRGGBB) and whether it is \
         the default list for new reminders."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let lists = self.store.run(|backend| backend.lists()).await?;
        Ok(json!({ "lists": lists }))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── GetReminderListTool ─────────────────────────────────────────────────────

/// Fetches one list by identifier.
pub struct GetReminderListTool {
    store: Arc<StoreAccess>,
}

impl GetReminderListTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for GetReminderListTool {
    fn name(&self) -> &str {
        "get_reminder_list"
    }

    fn description(&self) -> &str {
        "Get a specific reminder list by its id (from list_reminder_lists)."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["list_id"],
            "properties": {
                "list_id": {
                    "type": "string",
                    "description": "List identifier (from list_reminder_lists)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ListIdArgs = parse_args(args)?;
        let list_id = require_id("list_id", &args.list_id)?;
        let list = self.store.run(move |backend| backend.list(&list_id)).await?;
        to_value(&list)
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}

// ─── CreateReminderListTool ──────────────────────────────────────────────────

/// Creates a list in the best writable account.
///
/// # Arguments (JSON)
///
/// - `title` (string, required)
/// - `color` (string, optional): `#RGB` or `#RRGGBB`
pub struct CreateReminderListTool {
    store: Arc<StoreAccess>,
}

impl CreateReminderListTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CreateReminderListTool {
    fn name(&self) -> &str {
        "create_reminder_list"
    }

    fn description(&self) -> &str {
        "Create a new reminder list with an optional hex color (e.g. '#FF5733'). \
         The list is created in the default list's account when possible, \
         otherwise in iCloud, then On My Mac."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["title"],
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Name of the new list"
                },
                "color": {
                    "type": "string",
                    "description": "Hex color, '#RGB' or '#RRGGBB' (the '#' is optional)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let (title, color) = parse_args::<CreateListArgs>(args)?.validate()?;
        let list = self
            .store
            .run(move |backend| backend.create_list(&title, color))
            .await?;
        tracing::info!(list_id = %list.id, "reminder list created");
        to_value(&list)
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── UpdateReminderListTool ──────────────────────────────────────────────────

/// Renames and/or recolors a list. Omitted fields are left alone.
pub struct UpdateReminderListTool {
    store: Arc<StoreAccess>,
}

impl UpdateReminderListTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for UpdateReminderListTool {
    fn name(&self) -> &str {
        "update_reminder_list"
    }

    fn description(&self) -> &str {
        "Update a reminder list's title and/or color. Omitted fields are unchanged."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["list_id"],
            "properties": {
                "list_id": {
                    "type": "string",
                    "description": "List identifier (from list_reminder_lists)"
                },
                "title": {
                    "type": "string",
                    "description": "New name"
                },
                "color": {
                    "type": "string",
                    "description": "New hex color, '#RGB' or '#RRGGBB'"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let (list_id, patch) = parse_args::<UpdateListArgs>(args)?.into_patch()?;
        let list = self
            .store
            .run(move |backend| backend.update_list(&list_id, &patch))
            .await?;
        to_value(&list)
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── DeleteReminderListTool ──────────────────────────────────────────────────

/// Deletes a list together with all of its reminders.
pub struct DeleteReminderListTool {
    store: Arc<StoreAccess>,
}

impl DeleteReminderListTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteReminderListTool {
    fn name(&self) -> &str {
        "delete_reminder_list"
    }

    fn description(&self) -> &str {
        "Delete a reminder list and every reminder in it. This cannot be undone."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["list_id"],
            "properties": {
                "list_id": {
                    "type": "string",
                    "description": "List identifier (from list_reminder_lists)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ListIdArgs = parse_args(args)?;
        let list_id = require_id("list_id", &args.list_id)?;
        let target = list_id.clone();
        self.store
            .run(move |backend| backend.delete_list(&target))
            .await?;
        tracing::info!(%list_id, "reminder list deleted");
        Ok(json!({ "deleted": true, "list_id": list_id }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}
