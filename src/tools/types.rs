//! Core tool types.
//!
//! Defines the [`Tool`] trait every MCP tool implements, the [`ToolMode`]
//! gate, and [`ToolError`] separating malformed calls from store failures.

use serde::de::DeserializeOwned;

use crate::error::RemindersError;

/// Which tools a registry exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToolMode {
    /// Only tools that never modify the store.
    ReadOnly,
    /// Everything.
    #[default]
    Full,
}

/// Why a tool call failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolError {
    /// The arguments do not fit the tool's schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// The store (or a domain validation) rejected the call.
    #[error(transparent)]
    Reminders(#[from] RemindersError),
}

/// Deserialize tool arguments. A missing argument object counts as `{}`.
pub fn parse_args<T: DeserializeOwned>(args: serde_json::Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        serde_json::Value::Object(serde_json::Map::new())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

/// Serialize a tool result.
pub fn to_value<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, ToolError> {
    serde_json::to_value(value).map_err(|e| {
        ToolError::Reminders(RemindersError::native(format!(
            "failed to encode result: {e}"
        )))
    })
}

/// Core trait for MCP tools.
///
/// All tools must be `Send + Sync` for use in async contexts.
/// The trait provides metadata (name, description, schema) and
/// an execution method that accepts JSON arguments.
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    /// Returns the tool name (e.g. "get_reminders").
    fn name(&self) -> &str;

    /// Returns a human-readable description of what the tool does.
    fn description(&self) -> &str;

    /// Returns the JSON Schema for the tool's arguments.
    fn schema(&self) -> serde_json::Value;

    /// Execute the tool with the given JSON arguments.
    ///
    /// # Errors
    ///
    /// `InvalidArguments` when `args` does not match the schema, otherwise
    /// the store error.
    async fn execute(&self, args: serde_json::Value) -> Result<serde_json::Value, ToolError>;

    /// Whether this tool is allowed in the given mode.
    ///
    /// Read tools return true for both modes.
    /// Mutation tools only allow `ToolMode::Full`.
    fn allowed_in_mode(&self, mode: ToolMode) -> bool;
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Args {
        #[serde(default)]
        limit: Option<usize>,
    }

    #[test]
    fn null_args_are_empty_object() {
        let args: Args = parse_args(serde_json::Value::Null).unwrap();
        assert_eq!(args.limit, None);
    }

    #[test]
    fn wrong_type_is_invalid_arguments() {
        let err = parse_args::<Args>(serde_json::json!({"limit": "ten"})).unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[test]
    fn store_errors_convert() {
        let err: ToolError = RemindersError::AccessDenied.into();
        assert_eq!(err, ToolError::Reminders(RemindersError::AccessDenied));
    }
}
