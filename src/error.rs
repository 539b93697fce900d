// Error types for the reporter core and its collaborators

use std::time::Duration;

/// Failure reported by a [`crate::client::ReportingClient`] operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("reporting service rejected the request: {0}")]
    Rejected(String),
    #[error("failed to write report operation: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode report operation: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("reporting client is closed")]
    Closed,
}

/// Faults the reporter can hit while projecting host events.
///
/// None of these ever reach the host test run: the controller logs them and
/// moves on to the next event.
#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    /// An end event arrived with no matching open report item.
    #[error("no open report item to close")]
    StackUnderflow,

    #[error("{operation} did not settle within {waited:?}; continuing without it")]
    RemoteOperationTimeout { operation: String, waited: Duration },

    #[error("{operation} failed: {source}")]
    RemoteOperationFailure {
        operation: String,
        #[source]
        source: ClientError,
    },

    #[error("internal fault while handling {event}: {message}")]
    InternalHandlerFault { event: String, message: String },
}

impl ReporterError {
    pub fn fault(event: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InternalHandlerFault {
            event: event.into(),
            message: message.into(),
        }
    }

    /// Timeouts are expected under a slow service and only warrant a warning.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::RemoteOperationTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_names_operation() {
        let err = ReporterError::RemoteOperationTimeout {
            operation: "start item".to_string(),
            waited: Duration::from_millis(250),
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("start item"));
        assert!(err.to_string().contains("250ms"));
    }

    #[test]
    fn test_failure_keeps_client_source() {
        let err = ReporterError::RemoteOperationFailure {
            operation: "finish item".to_string(),
            source: ClientError::Rejected("item not found".to_string()),
        };
        assert!(!err.is_timeout());
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(
            source.as_deref(),
            Some("reporting service rejected the request: item not found")
        );
    }
}
