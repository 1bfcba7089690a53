//! List-like access to AWS SQS queues
//!
//! This crate exposes a remote SQS queue as a double-ended collection: values are
//! appended as messages and popped back by receiving and acknowledging them.

pub mod queue;

pub use queue::{DequeError, DequeResult, SqsDeque};
