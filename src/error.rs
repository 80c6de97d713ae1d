//! Error types for the bridge.
//!
//! Every fallible operation in the crate returns [`BridgeError`]. Route
//! handlers wrap it in [`ApiError`], which logs the detail and answers the
//! caller with a fixed body.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Body returned to callers for any internal failure.
pub const UNDEFINED_ERROR: &str = "Undefined error";

/// Bridge error type.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the assistant service.
    #[error("HTTP error: {0}")]
    Remote(#[from] reqwest::Error),

    /// The assistant service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error body returned by the service.
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local filesystem or process error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The model requested a function that is not registered for this run.
    #[error("Function requested by the model does not exist: {name}")]
    UnknownTool {
        /// Function name sent by the model.
        name: String,
    },

    /// The model sent arguments that do not decode for the requested tool.
    #[error("Invalid arguments for tool {name}: {reason}")]
    ToolArguments {
        /// Function name sent by the model.
        name: String,
        /// Decoder message.
        reason: String,
    },

    /// Lookup of a user or file that was never recorded.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed multipart body.
    #[error("Multipart error: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),

    /// Required form field absent.
    #[error("Missing form field: {0}")]
    MissingField(&'static str),
}

impl BridgeError {
    /// Whether the failure is a local contract violation by the remote model.
    #[must_use]
    pub fn is_tool_contract_violation(&self) -> bool {
        matches!(self, Self::UnknownTool { .. } | Self::ToolArguments { .. })
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Route-boundary error. Detail goes to the log, never to the caller.
#[derive(Debug)]
pub struct ApiError(pub BridgeError);

impl From<BridgeError> for ApiError {
    fn from(err: BridgeError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            BridgeError::MissingField(_) | BridgeError::Multipart(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if self.0.is_tool_contract_violation() {
            tracing::error!(
                name: "tool.contract_violation",
                error = %self.0,
                "Aborting request on unknown tool"
            );
        } else {
            tracing::error!(error = %self.0, status = status.as_u16(), "Request failed");
        }

        let detail = match &self.0 {
            BridgeError::MissingField(field) => format!("Missing form field: {field}"),
            BridgeError::Multipart(_) => "Invalid multipart body".to_string(),
            _ => UNDEFINED_ERROR.to_string(),
        };

        (status, Json(serde_json::json!({ "detail": detail }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_errors_hide_detail() {
        let resp = ApiError(BridgeError::NotFound("user alice".into())).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_missing_field_is_unprocessable() {
        let resp = ApiError(BridgeError::MissingField("user_id")).into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_tool_contract_violation() {
        let err = BridgeError::UnknownTool {
            name: "drop_tables".into(),
        };
        assert!(err.is_tool_contract_violation());
        assert!(!BridgeError::NotFound("x".into()).is_tool_contract_violation());
    }
}
