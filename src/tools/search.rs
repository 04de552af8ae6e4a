//! Text search over reminder titles and notes.

use std::sync::Arc;

use serde_json::json;

use crate::access::StoreAccess;
use crate::model::Reminder;
use crate::pagination::paginate;

use super::args::{SearchRemindersArgs, effective_limit};
use super::types::{Tool, ToolError, ToolMode, parse_args};

/// Case-insensitive substring match on title or notes.
///
/// `needle` must already be lowercased.
fn matches_text(reminder: &Reminder, needle: &str) -> bool {
    reminder.title.to_lowercase().contains(needle)
        || reminder
            .notes
            .as_deref()
            .is_some_and(|notes| notes.to_lowercase().contains(needle))
}

/// Searches reminders whose title or notes contain `query`.
///
/// The store cannot filter by text, so matching happens after the
/// list/completion fetch. Narrow with `list_id` on large stores.
pub struct SearchRemindersTool {
    store: Arc<StoreAccess>,
    default_limit: Option<usize>,
}

impl SearchRemindersTool {
    pub fn new(store: Arc<StoreAccess>) -> Self {
        Self {
            store,
            default_limit: None,
        }
    }

    pub fn with_default_limit(mut self, limit: Option<usize>) -> Self {
        self.default_limit = limit;
        self
    }
}

#[async_trait::async_trait]
impl Tool for SearchRemindersTool {
    fn name(&self) -> &str {
        "search_reminders"
    }

    fn description(&self) -> &str {
        "Search reminders whose title or notes contain the query text \
         (case-insensitive). Optionally restrict to one list and include \
         completed reminders. Paginated like get_reminders."
    }

    fn schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "required": ["query"],
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to look for in titles and notes"
                },
                "list_id": {
                    "type": "string",
                    "description": "Only search this list"
                },
                "include_completed": {
                    "type": "boolean",
                    "description": "Include completed reminders (default false)"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of reminders to return"
                },
                "offset": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Number of matches to skip (default 0)"
                }
            }
        })
    }

    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: SearchRemindersArgs = parse_args(args)?;
        let limit = effective_limit(args.limit, self.default_limit)?;
        let query = args.base_query();
        let needle = args.query.trim().to_lowercase();

        let reminders = self.store.run(move |backend| backend.reminders(&query)).await?;
        let matching: Vec<Reminder> = reminders
            .into_iter()
            .filter(|r| matches_text(r, &needle))
            .collect();

        tracing::debug!(matches = matching.len(), "search complete");
        Ok(paginate(matching, args.offset, limit).to_json("reminders"))
    }

    fn allowed_in_mode(&self, _mode: ToolMode) -> bool {
        true // read-only
    }
}
