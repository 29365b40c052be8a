//! Structured error types for tool responses.

use crate::px2agent::Px2Error;
use rmcp::ErrorData;
use serde::Serialize;
use serde_json::json;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    UnknownTool,

    // Delegate errors
    ProjectError,

    // Internal errors
    InternalError,
}

impl ErrorCode {
    /// Validation errors are rejected at the protocol level, before a tool runs.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue | ErrorCode::UnknownTool
        )
    }
}

/// Structured error for tool responses.
#[derive(Debug, Serialize)]
pub struct ToolError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ToolError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, format!("{}: {}", field, reason)).with_field(field)
    }

    pub fn unknown_tool(name: &str) -> Self {
        Self::new(ErrorCode::UnknownTool, format!("Unknown tool: {}", name))
    }

    pub fn project(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ProjectError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }

    /// JSON body used for `is_error` tool results.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| json!({ "error": self.to_string() }).to_string())
    }
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ToolError {}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ToolError>() {
            Ok(tool_err) => tool_err,
            Err(err) => ToolError::internal(err),
        }
    }
}

impl From<Px2Error> for ToolError {
    fn from(err: Px2Error) -> Self {
        ToolError::project(err)
    }
}

impl From<ToolError> for ErrorData {
    fn from(err: ToolError) -> Self {
        let data = serde_json::to_value(&err).ok();
        if err.code.is_validation() {
            ErrorData::invalid_params(err.message, data)
        } else {
            ErrorData::internal_error(err.message, data)
        }
    }
}

/// Result type for tool operations.
pub type ToolResult<T> = std::result::Result<T, ToolError>;
