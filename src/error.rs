use thiserror::Error;

/// Failures talking to the recruitment backend.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced a response (connect, timeout, TLS).
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error(
        "request failed with status {status}{}",
        .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    Status { status: u16, message: Option<String> },

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error("invalid API base URL '{0}'")]
    InvalidBase(String),
}

impl ClientError {
    /// The human-readable message the backend attached to an error response.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref().filter(|m| !m.trim().is_empty()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display_includes_message() {
        let err = ClientError::Status {
            status: 409,
            message: Some("Already applied".to_string()),
        };
        assert_eq!(err.to_string(), "request failed with status 409: Already applied");
        assert_eq!(err.backend_message(), Some("Already applied"));
    }

    #[test]
    fn test_status_without_message() {
        let err = ClientError::Status {
            status: 500,
            message: None,
        };
        assert_eq!(err.to_string(), "request failed with status 500");
        assert_eq!(err.backend_message(), None);
    }

    #[test]
    fn test_blank_backend_message_ignored() {
        let err = ClientError::Status {
            status: 400,
            message: Some("  ".to_string()),
        };
        assert_eq!(err.backend_message(), None);
    }
}
