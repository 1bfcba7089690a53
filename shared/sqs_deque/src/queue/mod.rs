//! Queue operations backed by AWS SQS
//!
//! This module maps collection operations onto the SQS request/response model,
//! handling both standard and FIFO queues.

#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

/// SQS API seam and its AWS SDK implementation
pub mod client;
/// Error types for queue operations
pub mod error;
/// In-memory SQS used by tests
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
/// The deque adapter over a remote queue
pub mod sqs_deque;
/// Message envelope and wire types
pub mod types;

pub use client::{SqsApi, SqsApiClient};
pub use error::{map_remote_error, DequeError, DequeResult, RemoteError};
pub use sqs_deque::SqsDeque;
pub use types::{Envelope, Operation, OutgoingMessage, PayloadKind, ReceivedMessage, MAX_BATCH_SIZE};
