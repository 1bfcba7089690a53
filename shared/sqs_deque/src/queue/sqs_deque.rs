//! Deque adapter over a single SQS queue
//!
//! [`SqsDeque`] resolves a queue by name once, detects whether it is a FIFO
//! queue and then translates collection operations into SQS calls.

use std::sync::Arc;

use aws_sdk_sqs::types::QueueAttributeName;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::queue::{
    client::{SqsApi, SqsApiClient},
    error::{map_remote_error, DequeError, DequeResult, RemoteError},
    types::{Envelope, Operation, OutgoingMessage, FIFO_SUFFIX, MAX_BATCH_SIZE},
};

/// A remote SQS queue seen as a double-ended collection
///
/// Only the operations with a meaningful SQS mapping do remote work; the rest
/// fail with [`DequeError::NotSupported`]. Whether the queue is FIFO is read
/// once when the deque is opened.
pub struct SqsDeque {
    api: Arc<dyn SqsApi>,
    name: String,
    queue_url: String,
    fifo: bool,
    message_group_id: String,
}

impl std::fmt::Debug for SqsDeque {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqsDeque")
            .field("name", &self.name)
            .field("queue_url", &self.queue_url)
            .field("fifo", &self.fifo)
            .finish_non_exhaustive()
    }
}

impl SqsDeque {
    /// Opens the queue called `name`
    ///
    /// # Arguments
    ///
    /// * `api` - SQS API used for every remote call
    /// * `name` - Queue name
    /// * `create_if_missing` - Create the queue when it does not exist
    ///
    /// # Errors
    ///
    /// Returns `DequeError::QueueNotFound` if the queue does not exist and
    /// `create_if_missing` is false, or `DequeError::Remote` for any other failure
    #[instrument(skip(api, name), fields(queue = %name.as_ref()))]
    pub async fn open(
        api: Arc<dyn SqsApi>,
        name: impl AsRef<str> + Send,
        create_if_missing: bool,
    ) -> DequeResult<Self> {
        let name = name.as_ref().to_string();

        let queue_url = match api.get_queue_url(&name).await {
            Ok(url) => url,
            Err(error) if error.is_non_existent_queue() && create_if_missing => {
                let url = api
                    .create_queue(&name, name.ends_with(FIFO_SUFFIX))
                    .await
                    .map_err(|e| map_remote_error(&name, e))?;
                info!("Created queue {} at {}", name, url);
                url
            }
            Err(error) => return Err(map_remote_error(&name, error)),
        };

        let attributes = api
            .get_queue_attributes(&queue_url, &[QueueAttributeName::All])
            .await
            .map_err(|e| map_remote_error(&name, e))?;
        let fifo = attributes
            .get(&QueueAttributeName::FifoQueue)
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        info!("Opened queue {} (fifo: {})", name, fifo);

        Ok(Self {
            api,
            name,
            queue_url,
            fifo,
            message_group_id: Uuid::new_v4().to_string(),
        })
    }

    /// Opens a queue using an SDK client built from `config`
    ///
    /// # Errors
    ///
    /// Same as [`SqsDeque::open`]
    pub async fn connect(
        config: &aws_config::SdkConfig,
        name: impl AsRef<str> + Send,
        create_if_missing: bool,
    ) -> DequeResult<Self> {
        Self::open(
            Arc::new(SqsApiClient::from_conf(config)),
            name,
            create_if_missing,
        )
        .await
    }

    /// Queue name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved queue URL
    #[must_use]
    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }

    /// Whether the queue was a FIFO queue when opened
    #[must_use]
    pub const fn is_fifo(&self) -> bool {
        self.fifo
    }

    /// Message group ID attached to every send, FIFO queues only
    #[must_use]
    pub fn message_group_id(&self) -> Option<&str> {
        self.fifo.then_some(self.message_group_id.as_str())
    }

    /// Always `None`: a remote queue has no client-side bound
    #[must_use]
    pub const fn maxlen(&self) -> Option<usize> {
        None
    }

    /// Appends a value as one message
    ///
    /// # Errors
    ///
    /// Returns `DequeError::Serialization` if the value cannot be encoded, or the
    /// mapped remote error if the send fails
    pub async fn append<T: Serialize + Sync + ?Sized>(&self, value: &T) -> DequeResult<()> {
        let message = self.outgoing(value)?;
        debug!("Sending message to queue {}", self.name);

        self.api
            .send_message(&self.queue_url, message)
            .await
            .map_err(|e| self.remote_error(e))
    }

    /// Appends every value, sending batches of at most [`MAX_BATCH_SIZE`]
    ///
    /// All values are encoded before anything is sent. The first failing batch
    /// stops the operation; later batches are not sent.
    ///
    /// # Errors
    ///
    /// Returns `DequeError::Serialization` if any value cannot be encoded, or the
    /// mapped remote error of the first failing batch
    pub async fn extend<I>(&self, values: I) -> DequeResult<()>
    where
        I: IntoIterator + Send,
        I::Item: Serialize,
    {
        let entries = values
            .into_iter()
            .map(|value| self.outgoing(&value))
            .collect::<DequeResult<Vec<_>>>()?;

        for batch in entries.chunks(MAX_BATCH_SIZE) {
            debug!(
                "Sending batch of {} messages to queue {}",
                batch.len(),
                self.name
            );
            self.api
                .send_message_batch(&self.queue_url, batch.to_vec())
                .await
                .map_err(|e| self.remote_error(e))?;
        }

        Ok(())
    }

    /// Receives one message, acknowledges it and returns its value
    ///
    /// # Errors
    ///
    /// Returns `DequeError::EmptyQueue` if no message was available,
    /// `DequeError::InvalidMessage` if the body cannot be decoded into `T`
    /// (the message is then left on the queue), or the mapped remote error
    pub async fn pop<T: DeserializeOwned + Send>(&self) -> DequeResult<T> {
        let message = self
            .api
            .receive_message(&self.queue_url)
            .await
            .map_err(|e| self.remote_error(e))?
            .ok_or_else(|| DequeError::EmptyQueue(self.name.clone()))?;

        let body = message.body.as_deref().ok_or_else(|| {
            DequeError::InvalidMessage(format!("message from {} has no body", self.name))
        })?;
        let data = Envelope::decode_data(body)
            .and_then(serde_json::from_value::<T>)
            .map_err(|e| DequeError::InvalidMessage(e.to_string()))?;

        self.api
            .delete_message(&self.queue_url, &message.receipt_handle)
            .await
            .map_err(|e| self.remote_error(e))?;

        debug!(
            "Popped message {} from queue {}",
            message.message_id.as_deref().unwrap_or("<unknown>"),
            self.name
        );
        Ok(data)
    }

    /// Same as [`SqsDeque::pop`]; the queue is consumed from a single end
    ///
    /// # Errors
    ///
    /// See [`SqsDeque::pop`]
    pub async fn popleft<T: DeserializeOwned + Send>(&self) -> DequeResult<T> {
        self.pop().await
    }

    /// Approximate number of visible messages
    ///
    /// # Errors
    ///
    /// Returns `DequeError::InvalidMessage` if SQS returns a non-numeric count,
    /// or the mapped remote error
    pub async fn len(&self) -> DequeResult<usize> {
        let attributes = self
            .api
            .get_queue_attributes(
                &self.queue_url,
                &[QueueAttributeName::ApproximateNumberOfMessages],
            )
            .await
            .map_err(|e| self.remote_error(e))?;

        attributes
            .get(&QueueAttributeName::ApproximateNumberOfMessages)
            .map_or(Ok(0), |count| {
                count.parse().map_err(|_| {
                    DequeError::InvalidMessage(format!("invalid approximate message count: {count}"))
                })
            })
    }

    /// Whether the approximate message count is zero
    ///
    /// # Errors
    ///
    /// See [`SqsDeque::len`]
    pub async fn is_empty(&self) -> DequeResult<bool> {
        Ok(self.len().await? == 0)
    }

    /// Purges the queue; SQS removes the messages asynchronously
    ///
    /// # Errors
    ///
    /// Returns the mapped remote error, e.g. when a purge is already in progress
    pub async fn clear(&self) -> DequeResult<()> {
        info!("Purging queue {}", self.name);
        self.api
            .purge_queue(&self.queue_url)
            .await
            .map_err(|e| self.remote_error(e))
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn append_left<T: Serialize + ?Sized>(&self, _value: &T) -> DequeResult<()> {
        self.unsupported(Operation::AppendLeft)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn extend_left<I: IntoIterator>(&self, _values: I) -> DequeResult<()> {
        self.unsupported(Operation::ExtendLeft)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn insert<T: Serialize + ?Sized>(&self, _index: usize, _value: &T) -> DequeResult<()> {
        self.unsupported(Operation::Insert)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn remove<T: Serialize + ?Sized>(&self, _value: &T) -> DequeResult<()> {
        self.unsupported(Operation::Remove)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn get<T: DeserializeOwned>(&self, _index: usize) -> DequeResult<T> {
        self.unsupported(Operation::Get)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn index<T: Serialize + ?Sized>(&self, _value: &T) -> DequeResult<usize> {
        self.unsupported(Operation::Index)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn count<T: Serialize + ?Sized>(&self, _value: &T) -> DequeResult<usize> {
        self.unsupported(Operation::Count)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn contains<T: Serialize + ?Sized>(&self, _value: &T) -> DequeResult<bool> {
        self.unsupported(Operation::Contains)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn rotate(&self, _steps: isize) -> DequeResult<()> {
        self.unsupported(Operation::Rotate)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn reverse(&self) -> DequeResult<()> {
        self.unsupported(Operation::Reverse)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn try_clone(&self) -> DequeResult<Self> {
        self.unsupported(Operation::Copy)
    }

    /// Not supported
    ///
    /// # Errors
    ///
    /// Always returns `DequeError::NotSupported`
    pub fn equals(&self, _other: &Self) -> DequeResult<bool> {
        self.unsupported(Operation::Equals)
    }

    fn unsupported<T>(&self, operation: Operation) -> DequeResult<T> {
        debug!("Rejected `{}` on queue {}", operation, self.name);
        Err(DequeError::NotSupported(operation))
    }

    fn outgoing<T: Serialize + ?Sized>(&self, value: &T) -> DequeResult<OutgoingMessage> {
        let body = Envelope::wrap(value)?.encode()?;
        let (message_group_id, deduplication_id) = if self.fifo {
            (
                Some(self.message_group_id.clone()),
                Some(Uuid::new_v4().to_string()),
            )
        } else {
            (None, None)
        };

        Ok(OutgoingMessage {
            id: Uuid::new_v4().to_string(),
            body,
            message_group_id,
            deduplication_id,
        })
    }

    fn remote_error(&self, error: RemoteError) -> DequeError {
        map_remote_error(&self.name, error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::mock::InMemorySqs;
    use serde_json::{json, Value};

    async fn open_mock(fifo: bool) -> (Arc<InMemorySqs>, SqsDeque) {
        let name = if fifo { "unit.fifo" } else { "unit" };
        let sqs = Arc::new(InMemorySqs::new().with_queue(name, fifo));
        let deque = SqsDeque::open(sqs.clone(), name, false).await.unwrap();
        (sqs, deque)
    }

    #[tokio::test]
    async fn test_standard_queue_sends_without_fifo_ids() {
        let (sqs, deque) = open_mock(false).await;
        assert!(!deque.is_fifo());
        assert_eq!(deque.message_group_id(), None);

        deque.append(&json!({"k": 1})).await.unwrap();

        let sent = sqs.sent_messages();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message_group_id, None);
        assert_eq!(sent[0].deduplication_id, None);
        assert_eq!(
            serde_json::from_str::<Value>(&sent[0].body).unwrap(),
            json!({"type": "object", "data": {"k": 1}})
        );
    }

    #[tokio::test]
    async fn test_fifo_flag_is_read_once() {
        let (sqs, deque) = open_mock(true).await;
        assert!(deque.is_fifo());

        deque.append(&1).await.unwrap();
        deque.append(&2).await.unwrap();

        let attribute_reads = sqs
            .calls()
            .into_iter()
            .filter(|call| matches!(call, crate::queue::mock::Call::GetQueueAttributes))
            .count();
        assert_eq!(attribute_reads, 1);
    }

    #[tokio::test]
    async fn test_undecodable_message_is_not_deleted() {
        let (sqs, deque) = open_mock(false).await;
        sqs.push_raw("unit", Some("not json"));

        let error = deque.pop::<Value>().await.unwrap_err();
        assert!(matches!(error, DequeError::InvalidMessage(_)));
        assert_eq!(sqs.in_flight_count("unit"), 1);
    }

    fn assert_send<F: Send>(_: &F) {}

    #[tokio::test]
    async fn test_operation_futures_are_send() {
        let (_sqs, deque) = open_mock(true).await;

        let item = json!([1]);
        let append = deque.append(&item);
        assert_send(&append);
        append.await.unwrap();

        let extend = deque.extend(vec![2, 3]);
        assert_send(&extend);
        extend.await.unwrap();

        let pop = deque.pop::<Value>();
        assert_send(&pop);
        assert_eq!(pop.await.unwrap(), json!([1]));

        let sqs: Arc<dyn SqsApi> = Arc::new(InMemorySqs::new().with_queue("send", false));
        let open = SqsDeque::open(sqs, "send", false);
        assert_send(&open);
        open.await.unwrap();
    }

    #[tokio::test]
    async fn test_maxlen_is_unbounded() {
        let (_sqs, deque) = open_mock(false).await;
        assert_eq!(deque.maxlen(), None);
    }
}
