//! Error types for the MCP server.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("API error: {0}")]
    Api(#[from] capsule_care_client::CapsuleCareError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<String> for McpError {
    fn from(err: String) -> Self {
        McpError::Internal(err)
    }
}

impl From<McpError> for String {
    fn from(err: McpError) -> Self {
        err.to_string()
    }
}

/// Result type alias for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

#[cfg(test)]
mod tests {
    use super::*;
    use capsule_care_client::CapsuleCareError;

    #[test]
    fn client_errors_keep_their_message() {
        let err: McpError = CapsuleCareError::NotFound("medication 7".into()).into();
        let text: String = err.into();
        assert!(text.starts_with("API error:"));
        assert!(text.contains("medication 7"));
    }

    #[test]
    fn plain_strings_become_internal_errors() {
        let err = McpError::from("boom".to_string());
        assert!(matches!(err, McpError::Internal(ref m) if m == "boom"));
    }
}
