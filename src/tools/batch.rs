//! Best-effort batch tools.
//!
//! Items are processed one at a time, each as its own store call. A failing
//! item is recorded and the loop moves on; nothing is rolled back.

use std::sync::Arc;

use serde_json::json;

use crate::access::StoreAccess;
use crate::backend::NewReminder;
use crate::model::BatchResult;

use super::args::{AddRemindersArgs, ReminderIdsArgs, require_id};
use super::types::{Tool, ToolError, ToolMode, parse_args};

fn ids_schema(action: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "required": ["reminder_ids"],
        "properties": {
            "reminder_ids": {
                "type": "array",
                "items": { "type": "string" },
                "description": format!("Identifiers of the reminders to {action}")
            }
        }
    })
}

fn batch_json(result: &BatchResult) -> serde_json::Value {
    json!({
        "successes": result.successes,
        "failures": result.failures,
        "failed_ids": result.failed_ids,
        "errors": result.errors,
        "total": result.total(),
        "all_succeeded": result.all_succeeded(),
    })
}

// ─── CompleteRemindersTool ───────────────────────────────────────────────────

pub struct CompleteRemindersTool {
    store: Arc<StoreAccess>,
}

impl CompleteRemindersTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for CompleteRemindersTool {
    fn name(&self) -> &str {
        "complete_reminders"
    }

    fn description(&self) -> &str {
        "Mark several reminders as completed. Each id is processed \
         independently; failures are reported per id and do not stop the batch."
    }

    fn schema(&self) -> serde_json::Value {
        ids_schema("complete")
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReminderIdsArgs = parse_args(args)?;
        let mut result = BatchResult::default();

        for id in args.reminder_ids {
            let outcome = match require_id("reminder_id", &id) {
                Ok(target) => {
                    self.store
                        .run(move |backend| backend.set_completed(&target, true))
                        .await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(_) => result.record_success(),
                Err(e) => {
                    tracing::warn!(reminder_id = %id, error = %e, "batch complete failed");
                    result.record_failure(id, &e);
                }
            }
        }

        Ok(batch_json(&result))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── DeleteRemindersTool ─────────────────────────────────────────────────────

pub struct DeleteRemindersTool {
    store: Arc<StoreAccess>,
}

impl DeleteRemindersTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for DeleteRemindersTool {
    fn name(&self) -> &str {
        "delete_reminders"
    }

    fn description(&self) -> &str {
        "Delete several reminders. Each id is processed independently; \
         failures are reported per id. This cannot be undone."
    }

    fn schema(&self) -> serde_json::Value {
        ids_schema("delete")
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ReminderIdsArgs = parse_args(args)?;
        let mut result = BatchResult::default();

        for id in args.reminder_ids {
            let outcome = match require_id("reminder_id", &id) {
                Ok(target) => {
                    self.store
                        .run(move |backend| backend.delete_reminder(&target))
                        .await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(()) => result.record_success(),
                Err(e) => {
                    tracing::warn!(reminder_id = %id, error = %e, "batch delete failed");
                    result.record_failure(id, &e);
                }
            }
        }

        Ok(batch_json(&result))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}

// ─── AddRemindersTool ────────────────────────────────────────────────────────

/// Quick-adds title-only reminders, e.g. a shopping list.
pub struct AddRemindersTool {
    store: Arc<StoreAccess>,
}

impl AddRemindersTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Tool for AddRemindersTool {
    fn name(&self) -> &str {
        "add_reminders"
    }

    fn description(&self) -> &str {
        "Quickly add several reminders by title, all in the same list \
         (the default list unless list_id is given). Returns the created \
         reminders and the titles that could not be added."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["items"],
            "properties": {
                "list_id": {
                    "type": "string",
                    "description": "Target list (default list if omitted)"
                },
                "items": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Titles of the reminders to create"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: AddRemindersArgs = parse_args(args)?;
        let list_id = args.list_id.filter(|id| !id.trim().is_empty());

        let mut created = Vec::with_capacity(args.items.len());
        let mut result = BatchResult::default();

        for title in args.items {
            let outcome = match require_id("title", &title) {
                Ok(clean) => {
                    let new = NewReminder::titled(clean, list_id.clone());
                    self.store
                        .run(move |backend| backend.create_reminder(&new))
                        .await
                }
                Err(e) => Err(e),
            };
            match outcome {
                Ok(reminder) => {
                    result.record_success();
                    created.push(reminder);
                }
                Err(e) => {
                    tracing::warn!(%title, error = %e, "batch add failed");
                    result.record_failure(title, &e);
                }
            }
        }

        Ok(json!({
            "reminders": created,
            "successes": result.successes,
            "failures": result.failures,
            "failed_items": result.failed_ids,
            "errors": result.errors,
        }))
    }

    fn allowed_in_mode(&self, mode: ToolMode) -> bool {
        matches!(mode, ToolMode::Full)
    }
}
