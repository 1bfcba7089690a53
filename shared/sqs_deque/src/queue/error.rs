use aws_sdk_sqs::error::{ProvideErrorMetadata, SdkError};
use thiserror::Error;

use crate::queue::types::Operation;

/// Error codes SQS uses to report a queue that does not exist
const NON_EXISTENT_QUEUE_CODES: [&str; 2] =
    ["AWS.SimpleQueueService.NonExistentQueue", "QueueDoesNotExist"];

/// Result type alias for deque operations
pub type DequeResult<T> = Result<T, DequeError>;

/// Error types for deque operations
#[derive(Error, Debug)]
pub enum DequeError {
    /// The queue name does not resolve to an existing queue
    #[error("Queue {0} does not exist.")]
    QueueNotFound(String),

    /// No message was available when popping
    #[error("pop from an empty queue {0}")]
    EmptyQueue(String),

    /// The operation has no meaning for a remote queue
    #[error("Operation `{0}` is not supported by a remote queue")]
    NotSupported(Operation),

    /// Any other failure reported by SQS
    #[error("SQS request failed: {0}")]
    Remote(#[from] RemoteError),

    /// Error serializing a value to JSON
    #[error("Failed to serialize message: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A received message or attribute could not be decoded
    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

impl DequeError {
    /// Checks if this error represents an upstream (5xx) error
    #[must_use]
    pub fn is_upstream_error(&self) -> bool {
        match self {
            Self::Remote(remote) => remote.status.is_some_and(|status| status >= 500),
            _ => false,
        }
    }
}

/// A failure reported by the remote queue service, with its code and message intact
#[derive(Error, Debug)]
#[error(
    "{}: {}",
    .code.as_deref().unwrap_or("Unknown"),
    .message.as_deref().unwrap_or("no error message")
)]
pub struct RemoteError {
    /// Service error code, e.g. `AWS.SimpleQueueService.PurgeQueueInProgress`
    pub code: Option<String>,
    /// Human readable error message from the service
    pub message: Option<String>,
    /// HTTP status of the raw response, when one was received
    pub status: Option<u16>,
    /// Underlying SDK error
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl RemoteError {
    /// Creates an error from a service code and message
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: Some(message.into()),
            status: None,
            source: None,
        }
    }

    /// Creates an error for a request that could not be built or a response missing required data
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: Some(message.into()),
            status: None,
            source: None,
        }
    }

    /// Sets the HTTP status of the error
    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Checks if SQS reported that the queue does not exist
    #[must_use]
    pub fn is_non_existent_queue(&self) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| NON_EXISTENT_QUEUE_CODES.contains(&code))
    }
}

impl<E> From<SdkError<E>> for RemoteError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    fn from(err: SdkError<E>) -> Self {
        let status = err.raw_response().map(|raw| raw.status().as_u16());
        Self {
            code: err.code().map(ToString::to_string),
            message: err.message().map(ToString::to_string),
            status,
            source: Some(Box::new(err)),
        }
    }
}

/// Maps a raw remote error onto the deque error taxonomy
///
/// A missing queue becomes [`DequeError::QueueNotFound`]; every other error is
/// passed through unchanged as [`DequeError::Remote`].
#[must_use]
pub fn map_remote_error(queue_name: &str, error: RemoteError) -> DequeError {
    if error.is_non_existent_queue() {
        DequeError::QueueNotFound(queue_name.to_string())
    } else {
        DequeError::Remote(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_existent_queue_maps_to_queue_not_found() {
        for code in NON_EXISTENT_QUEUE_CODES {
            let error = map_remote_error("orders", RemoteError::new(code, "gone"));
            assert!(matches!(error, DequeError::QueueNotFound(ref name) if name == "orders"));
            assert_eq!(error.to_string(), "Queue orders does not exist.");
        }
    }

    #[test]
    fn test_other_errors_pass_through() {
        let error = map_remote_error(
            "orders",
            RemoteError::new("AWS.SimpleQueueService.PurgeQueueInProgress", "slow down"),
        );
        match error {
            DequeError::Remote(remote) => {
                assert_eq!(
                    remote.code.as_deref(),
                    Some("AWS.SimpleQueueService.PurgeQueueInProgress")
                );
                assert_eq!(remote.message.as_deref(), Some("slow down"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_upstream_error_detection() {
        let server = DequeError::Remote(RemoteError::new("InternalError", "boom").with_status(503));
        let client = DequeError::Remote(RemoteError::new("InvalidParameterValue", "bad").with_status(400));
        let unknown = DequeError::Remote(RemoteError::malformed("no status"));

        assert!(server.is_upstream_error());
        assert!(!client.is_upstream_error());
        assert!(!unknown.is_upstream_error());
        assert!(!DequeError::EmptyQueue("q".to_string()).is_upstream_error());
    }

    #[test]
    fn test_remote_error_display() {
        assert_eq!(
            RemoteError::new("AccessDenied", "not allowed").to_string(),
            "AccessDenied: not allowed"
        );
        assert_eq!(
            RemoteError::malformed("missing queue url").to_string(),
            "Unknown: missing queue url"
        );
    }
}
