//! MCP tools over the reminder store.
//!
//! # Tools
//!
//! - **lists**: `list_reminder_lists`, `get_reminder_list`,
//!   `create_reminder_list`, `update_reminder_list`, `delete_reminder_list`
//! - **reminders**: `get_reminders`, `get_reminder`, `create_reminder`,
//!   `update_reminder`, `complete_reminder`, `delete_reminder`, `move_reminder`
//! - **batch**: `complete_reminders`, `delete_reminders`, `add_reminders`
//! - **search**: `search_reminders`
//!
//! # Mode Gating
//!
//! - `ReadOnly`: list, get and search tools only
//! - `Full`: everything

pub mod args;
pub mod batch;
pub mod lists;
pub mod registry;
pub mod reminders;
pub mod search;
pub mod types;

use std::sync::Arc;

use crate::access::StoreAccess;

pub use batch::{AddRemindersTool, CompleteRemindersTool, DeleteRemindersTool};
pub use lists::{
    CreateReminderListTool, DeleteReminderListTool, GetReminderListTool, ListReminderListsTool,
    UpdateReminderListTool,
};
pub use registry::ToolRegistry;
pub use reminders::{
    CompleteReminderTool, CreateReminderTool, DeleteReminderTool, GetReminderTool,
    GetRemindersTool, MoveReminderTool, UpdateReminderTool,
};
pub use search::SearchRemindersTool;
pub use types::{Tool, ToolError, ToolMode};

/// Registry with every reminder tool, all sharing one `StoreAccess`.
///
/// `default_limit` is the page size for `get_reminders` and
/// `search_reminders` when the caller passes none.
pub fn build_registry(
    store: Arc<StoreAccess>,
    mode: ToolMode,
    default_limit: Option<usize>,
) -> ToolRegistry {
    let mut registry = ToolRegistry::new(mode);

    registry.register(Arc::new(ListReminderListsTool::new(Arc::clone(&store))));
    registry.register(Arc::new(GetReminderListTool::new(Arc::clone(&store))));
    registry.register(Arc::new(CreateReminderListTool::new(Arc::clone(&store))));
    registry.register(Arc::new(UpdateReminderListTool::new(Arc::clone(&store))));
    registry.register(Arc::new(DeleteReminderListTool::new(Arc::clone(&store))));

    registry.register(Arc::new(
        GetRemindersTool::new(Arc::clone(&store)).with_default_limit(default_limit),
    ));
    registry.register(Arc::new(GetReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(CreateReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(UpdateReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(CompleteReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(DeleteReminderTool::new(Arc::clone(&store))));
    registry.register(Arc::new(MoveReminderTool::new(Arc::clone(&store))));

    registry.register(Arc::new(CompleteRemindersTool::new(Arc::clone(&store))));
    registry.register(Arc::new(DeleteRemindersTool::new(Arc::clone(&store))));
    registry.register(Arc::new(AddRemindersTool::new(Arc::clone(&store))));

    registry.register(Arc::new(
        SearchRemindersTool::new(store).with_default_limit(default_limit),
    ));

    tracing::debug!(
        ?mode,
        tools = registry.list_available().len(),
        "tool registry built"
    );
    registry
}
