//! reminders-mcp: the macOS Reminders app as MCP tools.
//!
//! # Architecture
//!
//! - **Access**: [`access::StoreAccess`] opens the store once (permission
//!   handshake included) and runs every operation on a single dedicated
//!   thread, one at a time
//! - **Backends**: EventKit on macOS, or an in-memory store for development
//!   and tests, both behind [`backend::ReminderBackend`]
//! - **Tools**: one [`tools::Tool`] per MCP tool, gathered in a
//!   [`tools::ToolRegistry`] with read-only gating
//! - **Server**: [`server::RemindersServer`] adapts the registry to rmcp over
//!   stdio

pub mod access;
pub mod backend;
pub mod color;
pub mod config;
pub mod dates;
pub mod error;
pub mod logging;
pub mod model;
pub mod pagination;
pub mod patch;
pub mod server;
pub mod tools;

pub use access::StoreAccess;
pub use config::{BackendKind, ServerConfig};
pub use error::{RemindersError, Result};
pub use model::{BatchResult, LocationTrigger, Priority, Proximity, Reminder, ReminderList};
pub use server::RemindersServer;
pub use tools::{ToolMode, ToolRegistry, build_registry};
